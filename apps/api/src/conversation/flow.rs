use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::{info, warn};

use crate::conversation::{ConversationContext, ConversationState, FlowError, InquiryForm};
use crate::dataset::DatasetCache;
use crate::models::{DatasetSnapshot, Topic};
use crate::outcome::Outcome;

const WELCOME_MESSAGE: &str = "こんにちは！PIP-Makerについてお答えできる範囲でお答えします。\n興味があることを以下から選んでください。";
const FAQ_PROMPT: &str = "よくあるご質問から選択するか、直接ご質問をご入力ください。";
const INQUIRY_FORM_MESSAGE: &str = "以下のフォームにご記入ください。担当者よりご連絡いたします。";
const INQUIRY_THANKS: &str = "お問合せありがとうございました！担当者からお返事いたしますので、少々お待ちください。";
const ESTIMATED_RESPONSE_TIME: &str = "1営業日以内";

// ────────────────────────────────────────────────────────────────────────────
// Response payloads
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct CategoryOption {
    pub id: Topic,
    pub name: String,
    pub description: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Welcome {
    pub message: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub categories: Vec<CategoryOption>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryInfo {
    pub id: Topic,
    pub name: &'static str,
    pub description: &'static str,
    pub emoji: &'static str,
}

impl From<Topic> for CategoryInfo {
    fn from(topic: Topic) -> Self {
        Self {
            id: topic,
            name: topic.name(),
            description: topic.description(),
            emoji: topic.emoji(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FaqEntry {
    pub id: String,
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategorySelection {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub category: CategoryInfo,
    pub faqs: Vec<FaqEntry>,
    pub show_inquiry_button: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FaqAnswer {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub faq_id: String,
    pub question: String,
    pub source: Option<String>,
    pub category: String,
    pub show_inquiry_button: bool,
    pub show_more_questions: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FormField {
    pub name: &'static str,
    pub label: &'static str,
    pub required: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct InquiryFormPrompt {
    pub message: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub fields: Vec<FormField>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InquiryReceipt {
    pub message: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub inquiry_id: String,
    pub estimated_response_time: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategorySummary {
    pub id: Topic,
    pub name: &'static str,
    pub emoji: &'static str,
    pub faq_count: usize,
}

// ────────────────────────────────────────────────────────────────────────────
// Engine
// ────────────────────────────────────────────────────────────────────────────

/// Per-conversation state machine:
/// INITIAL → CATEGORY_SELECTION → FAQ_OR_QUESTION ⟲ → INQUIRY_FORM → COMPLETED.
///
/// Contexts are created lazily on first touch. Every mutation holds the
/// conversation's map entry, so concurrent requests for one conversation
/// apply one after another.
pub struct ConversationFlowEngine {
    contexts: DashMap<String, ConversationContext>,
    dataset: Arc<DatasetCache>,
}

impl ConversationFlowEngine {
    pub fn new(dataset: Arc<DatasetCache>) -> Self {
        Self {
            contexts: DashMap::new(),
            dataset,
        }
    }

    /// The fixed topic menu. Does not touch any conversation.
    pub fn welcome(&self) -> Welcome {
        Welcome {
            message: WELCOME_MESSAGE,
            kind: "category_selection",
            categories: Topic::ALL
                .into_iter()
                .map(|t| CategoryOption {
                    id: t,
                    name: format!("{} {}", t.emoji(), t.name()),
                    description: t.description(),
                })
                .collect(),
        }
    }

    /// Marks the conversation as looking at the topic menu.
    pub fn begin(&self, conversation_id: &str) {
        self.update(conversation_id, |ctx| {
            ctx.state = ConversationState::CategorySelection;
        });
    }

    pub async fn select_category(
        &self,
        conversation_id: &str,
        category_id: &str,
    ) -> Result<CategorySelection, FlowError> {
        let topic: Topic = category_id
            .parse()
            .map_err(|_| FlowError::InvalidCategory(category_id.to_string()))?;

        // The menu still works without FAQs when the dataset is down.
        let faqs = match self.dataset.get().await {
            Outcome::Ok(snapshot) | Outcome::Degraded { value: snapshot, .. } => {
                faq_entries(&snapshot, topic)
            }
            Outcome::Failed(e) => {
                warn!("FAQ lookup for '{topic}' failed, showing none: {e}");
                Vec::new()
            }
        };
        info!("Category {topic} selected ({} FAQs), conversation {conversation_id}", faqs.len());

        self.update(conversation_id, |ctx| {
            ctx.selected_topic = Some(topic);
            ctx.state = ConversationState::FaqOrQuestion;
            ctx.interaction_count += 1;
        });

        Ok(CategorySelection {
            message: format!("{}\n\n{FAQ_PROMPT}", topic.description()),
            kind: "faq_selection",
            category: topic.into(),
            faqs,
            show_inquiry_button: true,
        })
    }

    /// Looks the FAQ up across the whole dataset. Unknown ids leave the
    /// conversation untouched.
    pub async fn select_faq(
        &self,
        conversation_id: &str,
        faq_id: &str,
    ) -> Result<FaqAnswer, FlowError> {
        let snapshot = self.dataset.get().await.into_result()?;
        let record = snapshot
            .faq_by_id(faq_id)
            .ok_or_else(|| FlowError::FaqNotFound(faq_id.to_string()))?;

        self.update(conversation_id, |ctx| ctx.interaction_count += 1);
        info!("FAQ {faq_id} selected, conversation {conversation_id}");

        Ok(FaqAnswer {
            message: record.answer.clone(),
            kind: "faq_answer",
            faq_id: faq_id.to_string(),
            question: record.question.clone(),
            source: (!record.source.is_empty()).then(|| record.source.clone()),
            category: record.category.clone(),
            show_inquiry_button: true,
            show_more_questions: true,
        })
    }

    pub fn open_inquiry_form(&self, conversation_id: &str) -> InquiryFormPrompt {
        self.update(conversation_id, |ctx| {
            ctx.state = ConversationState::InquiryForm;
        });

        InquiryFormPrompt {
            message: INQUIRY_FORM_MESSAGE,
            kind: "inquiry_form",
            fields: vec![
                FormField {
                    name: "name",
                    label: "お名前",
                    required: true,
                },
                FormField {
                    name: "company",
                    label: "会社名",
                    required: true,
                },
                FormField {
                    name: "email",
                    label: "メールアドレス",
                    required: true,
                },
                FormField {
                    name: "message",
                    label: "お問い合わせ内容",
                    required: true,
                },
            ],
        }
    }

    /// Validates before touching the conversation, so a rejected form leaves
    /// the state unchanged.
    pub fn submit_inquiry(
        &self,
        conversation_id: &str,
        form: InquiryForm,
    ) -> Result<InquiryReceipt, FlowError> {
        self.submit_inquiry_at(conversation_id, form, Utc::now())
    }

    fn submit_inquiry_at(
        &self,
        conversation_id: &str,
        form: InquiryForm,
        now: DateTime<Utc>,
    ) -> Result<InquiryReceipt, FlowError> {
        let fields = form.invalid_fields();
        if !fields.is_empty() {
            return Err(FlowError::Validation { fields });
        }

        let inquiry_id = format!("INQ_{conversation_id}_{}", now.timestamp());
        info!(
            "Inquiry {inquiry_id} received from {} ({})",
            form.name, form.company
        );

        self.update_at(conversation_id, now, |ctx| {
            ctx.inquiry = Some(form);
            ctx.state = ConversationState::Completed;
        });

        Ok(InquiryReceipt {
            message: INQUIRY_THANKS,
            kind: "inquiry_completed",
            inquiry_id,
            estimated_response_time: ESTIMATED_RESPONSE_TIME,
        })
    }

    /// Counts a free-text question asked inside the conversation and returns
    /// the topic it is scoped to, if one was selected.
    pub fn record_question(&self, conversation_id: &str) -> Option<Topic> {
        self.update(conversation_id, |ctx| {
            ctx.state = ConversationState::FaqOrQuestion;
            ctx.interaction_count += 1;
            ctx.selected_topic
        })
    }

    /// Topic chosen earlier in the conversation. Read-only; never creates a context.
    pub fn selected_topic(&self, conversation_id: &str) -> Option<Topic> {
        self.contexts
            .get(conversation_id)
            .and_then(|ctx| ctx.selected_topic)
    }

    pub fn get_context(&self, conversation_id: &str) -> Option<ConversationContext> {
        self.contexts.get(conversation_id).map(|c| c.clone())
    }

    pub fn active_conversations(&self) -> usize {
        self.contexts.len()
    }

    /// Drops contexts not updated within `max_idle`. Returns how many went.
    pub fn sweep_idle(&self, max_idle: Duration) -> usize {
        self.sweep_idle_at(Utc::now() - max_idle)
    }

    fn sweep_idle_at(&self, cutoff: DateTime<Utc>) -> usize {
        let before = self.contexts.len();
        self.contexts.retain(|_, ctx| ctx.updated_at >= cutoff);
        let removed = before.saturating_sub(self.contexts.len());
        if removed > 0 {
            info!("Swept {removed} idle conversation contexts");
        }
        removed
    }

    /// FAQ counts per topic, in menu order.
    pub async fn category_summary(&self) -> Result<Vec<CategorySummary>, FlowError> {
        let snapshot = self.dataset.get().await.into_result()?;
        Ok(Topic::ALL
            .into_iter()
            .map(|t| CategorySummary {
                id: t,
                name: t.name(),
                emoji: t.emoji(),
                faq_count: snapshot.faqs_in(t).len(),
            })
            .collect())
    }

    fn update<R>(&self, conversation_id: &str, f: impl FnOnce(&mut ConversationContext) -> R) -> R {
        self.update_at(conversation_id, Utc::now(), f)
    }

    fn update_at<R>(
        &self,
        conversation_id: &str,
        now: DateTime<Utc>,
        f: impl FnOnce(&mut ConversationContext) -> R,
    ) -> R {
        let mut entry = self
            .contexts
            .entry(conversation_id.to_string())
            .or_insert_with(|| ConversationContext::new(conversation_id, now));
        let result = f(&mut entry);
        entry.updated_at = now;
        result
    }
}

fn faq_entries(snapshot: &DatasetSnapshot, topic: Topic) -> Vec<FaqEntry> {
    snapshot
        .faqs_in(topic)
        .into_iter()
        .filter(|r| !r.question.is_empty())
        .filter_map(|r| {
            Some(FaqEntry {
                id: r.faq_id.clone()?,
                question: r.question.clone(),
                answer: r.answer.clone(),
            })
        })
        .collect()
}
