//! Intent Classification: maps a free-text question to a `Topic`.
//!
//! Rule-based keyword scoring is always available. When an `AiBackend` is
//! configured it is asked first, and its answer is kept only when it names a
//! known topic with confidence above `AI_ACCEPT_CONFIDENCE`. Classification
//! never fails: every AI problem degrades to the rule-based result.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::llm_client::AiBackend;
use crate::models::Topic;
use crate::outcome::Outcome;

/// AI classifications at or below this confidence are discarded.
pub const AI_ACCEPT_CONFIDENCE: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMethod {
    RuleBased,
    Ai,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentResult {
    pub topic: Topic,
    pub confidence: f64,
    pub keywords: Vec<String>,
    pub specific_intent: String,
    pub method: ClassificationMethod,
}

pub struct IntentClassifier {
    ai: Option<Arc<dyn AiBackend>>,
}

impl IntentClassifier {
    pub fn new(ai: Option<Arc<dyn AiBackend>>) -> Self {
        Self { ai }
    }

    /// Classifies `question`. `Degraded` means an AI backend exists but its
    /// answer was unusable, so the rule-based result was returned instead.
    pub async fn classify(&self, question: &str) -> Outcome<IntentResult, std::convert::Infallible> {
        let Some(ai) = &self.ai else {
            return Outcome::Ok(classify_by_rules(question));
        };

        let reason = match ai.classify_intent(question).await {
            Ok(intent) => match Topic::parse_label(&intent.topic) {
                Some(topic) if intent.confidence > AI_ACCEPT_CONFIDENCE => {
                    let lowered = question.to_lowercase();
                    return Outcome::Ok(IntentResult {
                        topic,
                        confidence: intent.confidence.clamp(0.0, 1.0),
                        keywords: intent.keywords,
                        specific_intent: intent
                            .specific_intent
                            .filter(|s| !s.trim().is_empty())
                            .unwrap_or_else(|| infer_specific_intent(&lowered, topic)),
                        method: ClassificationMethod::Ai,
                    });
                }
                Some(_) => {
                    info!(
                        "AI intent confidence too low ({:.2}), using keyword rules",
                        intent.confidence
                    );
                    format!("low AI confidence {:.2}", intent.confidence)
                }
                None => format!("AI returned unknown topic '{}'", intent.topic),
            },
            Err(e) => {
                warn!("AI intent classification failed: {e}");
                format!("AI classification failed: {e}")
            }
        };

        Outcome::degraded(classify_by_rules(question), reason)
    }
}

/// Keyword scoring: per topic, matched keywords over keyword-set size. The
/// first topic with the strictly highest score wins; no match at all is `Other`.
pub fn classify_by_rules(question: &str) -> IntentResult {
    let lowered = question.to_lowercase();

    let mut best_topic = Topic::Other;
    let mut best_score = 0.0_f64;
    let mut best_keywords: Vec<String> = Vec::new();

    for topic in Topic::ALL {
        let keywords = topic.keywords();
        let matched: Vec<String> = keywords
            .iter()
            .filter(|kw| lowered.contains(*kw))
            .map(|kw| kw.to_string())
            .collect();
        let score = matched.len() as f64 / keywords.len() as f64;
        if score > best_score {
            best_score = score;
            best_topic = topic;
            best_keywords = matched;
        }
    }

    IntentResult {
        topic: best_topic,
        confidence: (best_score * 2.0).min(1.0),
        keywords: best_keywords,
        specific_intent: infer_specific_intent(&lowered, best_topic),
        method: ClassificationMethod::RuleBased,
    }
}

fn infer_specific_intent(lowered: &str, topic: Topic) -> String {
    topic
        .intent_patterns()
        .iter()
        .find(|(pattern, _)| lowered.contains(pattern))
        .map(|(_, intent)| intent.to_string())
        .unwrap_or_else(|| format!("{topic}_general"))
}
