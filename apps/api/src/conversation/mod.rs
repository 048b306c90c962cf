// Menu-driven conversation flow.
// One `ConversationContext` per conversation id, held in memory and swept
// once idle.

pub mod flow;
pub mod handlers;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dataset::DataSourceError;
use crate::models::Topic;

pub use flow::ConversationFlowEngine;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("data source error: {0}")]
    DataSource(#[from] DataSourceError),

    #[error("invalid category '{0}'")]
    InvalidCategory(String),

    #[error("FAQ '{0}' not found")]
    FaqNotFound(String),

    #[error("invalid inquiry fields: {fields:?}")]
    Validation { fields: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    Initial,
    CategorySelection,
    FaqOrQuestion,
    InquiryForm,
    Completed,
}

/// Inquiry form payload. Absent fields deserialize as empty and fail validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InquiryForm {
    pub name: String,
    pub company: String,
    pub email: String,
    #[serde(alias = "inquiry")]
    pub message: String,
}

impl InquiryForm {
    /// Names of every missing or invalid field, in form order.
    pub fn invalid_fields(&self) -> Vec<String> {
        let mut invalid = Vec::new();
        for (field, value) in [
            ("name", &self.name),
            ("company", &self.company),
            ("email", &self.email),
            ("message", &self.message),
        ] {
            let value = value.trim();
            let bad = if field == "email" {
                !(value.contains('@') && value.contains('.'))
            } else {
                value.is_empty()
            };
            if bad {
                invalid.push(field.to_string());
            }
        }
        invalid
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationContext {
    pub conversation_id: String,
    pub state: ConversationState,
    pub selected_topic: Option<Topic>,
    pub interaction_count: u32,
    pub inquiry: Option<InquiryForm>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationContext {
    pub fn new(conversation_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            conversation_id: conversation_id.to_string(),
            state: ConversationState::Initial,
            selected_topic: None,
            interaction_count: 0,
            inquiry: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, company: &str, email: &str, message: &str) -> InquiryForm {
        InquiryForm {
            name: name.into(),
            company: company.into(),
            email: email.into(),
            message: message.into(),
        }
    }

    #[test]
    fn test_valid_form_has_no_invalid_fields() {
        assert!(form("山田", "ACME", "yamada@acme.jp", "資料希望").invalid_fields().is_empty());
    }

    #[test]
    fn test_email_without_at_always_listed() {
        for f in [
            form("山田", "ACME", "yamada.acme.jp", "資料希望"),
            form("", "", "yamada.acme.jp", ""),
        ] {
            assert!(f.invalid_fields().contains(&"email".to_string()));
        }
    }

    #[test]
    fn test_all_missing_fields_listed() {
        let fields = form(" ", "", "", "").invalid_fields();
        assert_eq!(fields, vec!["name", "company", "email", "message"]);
    }

    #[test]
    fn test_inquiry_alias_for_message() {
        let f: InquiryForm =
            serde_json::from_str(r#"{"name":"a","company":"b","email":"a@b.c","inquiry":"hi"}"#)
                .unwrap();
        assert_eq!(f.message, "hi");
        assert!(f.invalid_fields().is_empty());
    }
}
