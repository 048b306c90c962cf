//! Operator notifications (chat-webhook or log only), sent fire-and-forget.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    SearchInteraction,
    FaqSelection,
    InquirySubmission,
    NegativeFeedback,
    DataSourceChange,
}

impl NotificationKind {
    fn headline(self) -> &'static str {
        match self {
            NotificationKind::SearchInteraction => "💬 検索",
            NotificationKind::FaqSelection => "📋 FAQ選択",
            NotificationKind::InquirySubmission => "🔥 新しいお問い合わせ",
            NotificationKind::NegativeFeedback => "⚠️ ネガティブフィードバック",
            NotificationKind::DataSourceChange => "📊 データソース変更",
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook rejected the message (status {0})")]
    Rejected(u16),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, kind: NotificationKind, payload: &Value) -> Result<(), NotifyError>;
}

/// Spawns the notification and returns immediately; failures are only logged.
pub fn dispatch(notifier: &Arc<dyn Notifier>, kind: NotificationKind, payload: Value) {
    let notifier = Arc::clone(notifier);
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(kind, &payload).await {
            warn!("Notification {kind:?} failed: {e}");
        }
    });
}

/// Headline plus one `key: value` line per payload field, long values cut.
pub fn render(kind: NotificationKind, payload: &Value) -> String {
    let mut text = kind.headline().to_string();
    if let Some(fields) = payload.as_object() {
        for (key, value) in fields {
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Null => continue,
                other => other.to_string(),
            };
            let short: String = value.chars().take(100).collect();
            let ellipsis = if short.len() < value.len() { "…" } else { "" };
            text.push_str(&format!("\n{key}: {short}{ellipsis}"));
        }
    }
    text
}

/// Posts `{"text": ...}` to a chat webhook.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(WEBHOOK_TIMEOUT).build()?,
            url,
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, kind: NotificationKind, payload: &Value) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "text": render(kind, payload) }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(NotifyError::Rejected(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Used when no webhook is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, kind: NotificationKind, payload: &Value) -> Result<(), NotifyError> {
        info!(kind = ?kind, "{}", render(kind, payload).replace('\n', " | "));
        Ok(())
    }
}
