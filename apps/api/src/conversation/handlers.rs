use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::conversation::flow::{
    CategorySelection, FaqAnswer, InquiryFormPrompt, InquiryReceipt, Welcome,
};
use crate::conversation::InquiryForm;
use crate::errors::AppError;
use crate::notify::{dispatch, NotificationKind};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Requests
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct WelcomeQuery {
    pub conversation_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub conversation_id: String,
    pub category_id: String,
}

#[derive(Debug, Deserialize)]
pub struct FaqRequest {
    pub conversation_id: String,
    pub faq_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ConversationRef {
    pub conversation_id: String,
}

#[derive(Debug, Deserialize)]
pub struct InquiryRequest {
    pub conversation_id: String,
    #[serde(default)]
    pub form_data: InquiryForm,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/conversation/welcome
pub async fn handle_welcome(
    State(state): State<AppState>,
    Query(params): Query<WelcomeQuery>,
) -> Json<Welcome> {
    if let Some(id) = params.conversation_id.as_deref() {
        state.flow.begin(id);
    }
    Json(state.flow.welcome())
}

/// POST /api/conversation/category
pub async fn handle_select_category(
    State(state): State<AppState>,
    Json(req): Json<CategoryRequest>,
) -> Result<Json<CategorySelection>, AppError> {
    let selection = state
        .flow
        .select_category(&req.conversation_id, &req.category_id)
        .await?;
    Ok(Json(selection))
}

/// POST /api/conversation/faq
pub async fn handle_select_faq(
    State(state): State<AppState>,
    Json(req): Json<FaqRequest>,
) -> Result<Json<FaqAnswer>, AppError> {
    let answer = state.flow.select_faq(&req.conversation_id, &req.faq_id).await?;

    dispatch(
        &state.notifier,
        NotificationKind::FaqSelection,
        json!({
            "conversation_id": req.conversation_id,
            "faq_id": answer.faq_id,
            "question": answer.question,
            "category": answer.category,
        }),
    );

    Ok(Json(answer))
}

/// POST /api/conversation/inquiry/open
pub async fn handle_open_inquiry(
    State(state): State<AppState>,
    Json(req): Json<ConversationRef>,
) -> Json<InquiryFormPrompt> {
    Json(state.flow.open_inquiry_form(&req.conversation_id))
}

/// POST /api/conversation/inquiry
pub async fn handle_submit_inquiry(
    State(state): State<AppState>,
    Json(req): Json<InquiryRequest>,
) -> Result<Json<InquiryReceipt>, AppError> {
    let form = req.form_data.clone();
    let receipt = state.flow.submit_inquiry(&req.conversation_id, req.form_data)?;

    dispatch(
        &state.notifier,
        NotificationKind::InquirySubmission,
        json!({
            "inquiry_id": receipt.inquiry_id,
            "name": form.name,
            "company": form.company,
            "email": form.email,
            "message": form.message,
        }),
    );

    Ok(Json(receipt))
}
