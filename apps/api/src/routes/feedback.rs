use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::errors::AppError;
use crate::notify::{dispatch, NotificationKind};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Positive,
    Negative,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
    pub rating: String,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub status: &'static str,
    pub rating: Rating,
}

/// POST /api/feedback
/// Only negative feedback reaches the operators.
pub async fn handle_feedback(
    State(state): State<AppState>,
    Json(req): Json<FeedbackRequest>,
) -> Result<Json<FeedbackResponse>, AppError> {
    let rating = match req.rating.trim().to_lowercase().as_str() {
        "positive" => Rating::Positive,
        "negative" => Rating::Negative,
        _ => {
            return Err(AppError::validation(
                "rating は positive または negative を指定してください",
                vec!["rating".to_string()],
            ))
        }
    };
    info!(
        "Feedback {rating:?} for conversation {}",
        req.conversation_id.as_deref().unwrap_or("-")
    );

    if rating == Rating::Negative {
        dispatch(
            &state.notifier,
            NotificationKind::NegativeFeedback,
            json!({
                "conversation_id": req.conversation_id,
                "question": req.question,
                "answer": req.answer,
                "comment": req.comment,
            }),
        );
    }

    Ok(Json(FeedbackResponse {
        status: "received",
        rating,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::test_state;
    use std::time::Duration;

    fn feedback(rating: &str) -> FeedbackRequest {
        FeedbackRequest {
            conversation_id: Some("c1".into()),
            question: Some("料金は？".into()),
            answer: Some("月額制です".into()),
            rating: rating.into(),
            comment: None,
        }
    }

    #[tokio::test]
    async fn test_unknown_rating_is_rejected() {
        let (state, _) = test_state(Vec::new());
        let err = handle_feedback(State(state), Json(feedback("meh")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_only_negative_feedback_notifies() {
        let (state, recorder) = test_state(Vec::new());
        handle_feedback(State(state.clone()), Json(feedback("positive")))
            .await
            .unwrap();
        let Json(response) = handle_feedback(State(state), Json(feedback("Negative")))
            .await
            .unwrap();
        assert_eq!(response.rating, Rating::Negative);

        tokio::time::sleep(Duration::from_millis(20)).await;
        let sent = recorder.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, NotificationKind::NegativeFeedback);
    }
}
