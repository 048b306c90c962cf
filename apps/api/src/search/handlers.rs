use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::errors::AppError;
use crate::models::Topic;
use crate::notify::{dispatch, NotificationKind};
use crate::search::SearchAnswer;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub question: String,
    #[serde(default, alias = "category")]
    pub topic: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// POST /api/search
/// An explicit topic wins; otherwise the conversation's selected topic is
/// treated as the user's choice; otherwise the question is classified.
pub async fn handle_search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchAnswer>, AppError> {
    let question = req.question.trim();
    if question.is_empty() {
        return Err(AppError::validation(
            "質問を入力してください",
            vec!["question".to_string()],
        ));
    }

    let explicit = req
        .topic
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .map(|t| t.parse::<Topic>().map_err(|_| AppError::InvalidCategory(t.to_string())))
        .transpose()?;

    let selected = req
        .conversation_id
        .as_deref()
        .and_then(|id| state.flow.selected_topic(id));

    let answer = state.search.search(question, explicit.or(selected)).await?;
    // Only answered questions count as interactions.
    if let Some(id) = req.conversation_id.as_deref() {
        state.flow.record_question(id);
    }
    info!(
        "Answered '{question}' from {:?} (topic {}, confidence {:.2})",
        answer.provenance, answer.topic, answer.confidence
    );

    dispatch(
        &state.notifier,
        NotificationKind::SearchInteraction,
        json!({
            "conversation_id": req.conversation_id,
            "question": question,
            "topic": answer.topic,
            "confidence": format!("{:.2}", answer.confidence),
            "ai_generated": answer.ai_generated,
        }),
    );

    Ok(Json(answer))
}
