use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::conversation::FlowError;
use crate::dataset::DataSourceError;
use crate::search::SearchError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Data source error: {0}")]
    DataSource(#[from] DataSourceError),

    #[error("No matching answer for '{0}'")]
    NoMatchFound(String),

    #[error("Invalid category: {0}")]
    InvalidCategory(String),

    #[error("FAQ not found: {0}")]
    FaqNotFound(String),

    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        fields: Vec<String>,
    },
}

impl AppError {
    pub fn validation(message: impl Into<String>, fields: Vec<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            fields,
        }
    }
}

impl From<SearchError> for AppError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::DataSource(e) => AppError::DataSource(e),
            SearchError::NoMatchFound { query } => AppError::NoMatchFound(query),
        }
    }
}

impl From<FlowError> for AppError {
    fn from(e: FlowError) -> Self {
        match e {
            FlowError::DataSource(e) => AppError::DataSource(e),
            FlowError::InvalidCategory(c) => AppError::InvalidCategory(c),
            FlowError::FaqNotFound(id) => AppError::FaqNotFound(id),
            FlowError::Validation { fields } => {
                AppError::validation("必須項目が未入力、または形式が正しくありません", fields)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut fields: Option<Vec<String>> = None;
        let (status, code, message) = match self {
            AppError::DataSource(e) => {
                tracing::error!("Data source error: {e}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "DATA_SOURCE_ERROR",
                    "Q&Aデータを取得できませんでした。しばらく待ってから再度お試しください。"
                        .to_string(),
                )
            }
            AppError::NoMatchFound(_) => (
                StatusCode::NOT_FOUND,
                "NO_MATCH_FOUND",
                "該当する回答が見つかりませんでした。より具体的なキーワードでお試しください。"
                    .to_string(),
            ),
            AppError::InvalidCategory(c) => (
                StatusCode::BAD_REQUEST,
                "INVALID_CATEGORY",
                format!("無効なカテゴリーID: {c}"),
            ),
            AppError::FaqNotFound(id) => (
                StatusCode::NOT_FOUND,
                "FAQ_NOT_FOUND",
                format!("FAQ ID {id} が見つかりません"),
            ),
            AppError::ConversationNotFound(id) => (
                StatusCode::NOT_FOUND,
                "CONVERSATION_NOT_FOUND",
                format!("会話 {id} が見つかりません"),
            ),
            AppError::Validation { message, fields: f } => {
                fields = Some(f);
                (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", message)
            }
        };

        let mut error = json!({
            "code": code,
            "message": message
        });
        if let Some(fields) = fields {
            error["fields"] = json!(fields);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
