use async_trait::async_trait;
use serde::Deserialize;

use crate::llm_client::prompts::{ANSWER_PROMPT_TEMPLATE, CLASSIFY_PROMPT_TEMPLATE, JSON_ONLY_SYSTEM};
use crate::llm_client::{AiServiceError, CallOptions, LlmClient, UsageStats};

/// Topic guess reported by the model. `topic` is the raw label; the
/// classifier decides whether it names a known topic.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AiIntent {
    #[serde(alias = "category")]
    pub topic: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub specific_intent: Option<String>,
}

/// One retrieved record handed to the model as grounding.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerContext {
    pub question: String,
    pub answer: String,
    pub source: String,
    pub confidence: f64,
}

/// The AI capabilities the search pipeline can use. Errors are always
/// recoverable: callers fall back to the non-AI result.
#[async_trait]
pub trait AiBackend: Send + Sync {
    async fn classify_intent(&self, question: &str) -> Result<AiIntent, AiServiceError>;

    async fn compose_answer(
        &self,
        question: &str,
        contexts: &[AnswerContext],
        system_prompt: &str,
    ) -> Result<String, AiServiceError>;

    fn usage(&self) -> Option<UsageStats> {
        None
    }
}

#[async_trait]
impl AiBackend for LlmClient {
    async fn classify_intent(&self, question: &str) -> Result<AiIntent, AiServiceError> {
        let prompt = CLASSIFY_PROMPT_TEMPLATE.replace("{question}", question);
        self.call_json(&prompt, JSON_ONLY_SYSTEM, CallOptions::CLASSIFY)
            .await
    }

    async fn compose_answer(
        &self,
        question: &str,
        contexts: &[AnswerContext],
        system_prompt: &str,
    ) -> Result<String, AiServiceError> {
        let prompt = ANSWER_PROMPT_TEMPLATE
            .replace("{question}", question)
            .replace("{contexts}", &format_contexts(contexts));
        self.call_text(&prompt, system_prompt, CallOptions::ANSWER)
            .await
    }

    fn usage(&self) -> Option<UsageStats> {
        Some(self.gate().stats())
    }
}

fn format_contexts(contexts: &[AnswerContext]) -> String {
    contexts
        .iter()
        .enumerate()
        .map(|(i, ctx)| {
            format!(
                "【関連情報{}】\n質問: {}\nソース: {}\n回答: {}\n信頼度: {:.2}",
                i + 1,
                ctx.question,
                if ctx.source.is_empty() { "Unknown" } else { &ctx.source },
                ctx.answer,
                ctx.confidence
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
