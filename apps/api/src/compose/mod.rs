//! AI Answer Composition: augments a weak lexical match with a model-written
//! answer grounded only in the top retrieved records.
//!
//! The composed answer's confidence is a local heuristic (`self_score`), not a
//! second model call.

pub mod prompts;

use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use crate::llm_client::{AiBackend, AiServiceError, AnswerContext};
use crate::models::Topic;
use crate::search::lexical::LexicalMatch;

#[derive(Debug, Clone, PartialEq)]
pub struct ComposedAnswer {
    pub answer: String,
    pub confidence: f64,
    /// Source text of every context handed to the model.
    pub sources: Vec<String>,
}

pub struct AiAnswerComposer {
    ai: Arc<dyn AiBackend>,
    context_limit: usize,
}

impl AiAnswerComposer {
    pub fn new(ai: Arc<dyn AiBackend>, context_limit: usize) -> Self {
        Self { ai, context_limit }
    }

    /// `ranked` must already be ordered best-first.
    pub async fn compose(
        &self,
        question: &str,
        topic: Topic,
        ranked: &[LexicalMatch<'_>],
    ) -> Result<ComposedAnswer, AiServiceError> {
        let contexts: Vec<AnswerContext> = ranked
            .iter()
            .take(self.context_limit)
            .map(|m| AnswerContext {
                question: m.record.question.clone(),
                answer: m.record.answer.clone(),
                source: m.record.source.clone(),
                confidence: m.score,
            })
            .collect();

        let answer = self
            .ai
            .compose_answer(question, &contexts, &prompts::system_prompt(topic))
            .await?;
        let confidence = self_score(question, &answer, &contexts);

        info!(
            "AI answer composed: {} chars from {} contexts, confidence {:.2}",
            answer.chars().count(),
            contexts.len(),
            confidence
        );

        Ok(ComposedAnswer {
            answer,
            confidence,
            sources: contexts.into_iter().map(|c| c.source).collect(),
        })
    }
}

/// Heuristic quality score in `[0.5, 1.0]`.
///
/// Base 0.5; +0.1 for 50..=500 chars; +0.2 scaled by the share of question
/// words present in the answer's words; +0.2 if any of the first ten words of
/// any context answer occurs in the answer text.
pub fn self_score(question: &str, answer: &str, contexts: &[AnswerContext]) -> f64 {
    let mut score = 0.5;

    let length = answer.chars().count();
    if (50..=500).contains(&length) {
        score += 0.1;
    }

    let answer_lower = answer.to_lowercase();
    let question_lower = question.to_lowercase();
    let question_words: HashSet<&str> = question_lower.split_whitespace().collect();
    let answer_words: HashSet<&str> = answer_lower.split_whitespace().collect();
    if !question_words.is_empty() {
        let overlap = question_words.intersection(&answer_words).count();
        score += 0.2 * overlap as f64 / question_words.len() as f64;
    }

    let uses_context = contexts.iter().any(|ctx| {
        ctx.answer
            .to_lowercase()
            .split_whitespace()
            .take(10)
            .any(|word| answer_lower.contains(word))
    });
    if uses_context {
        score += 0.2;
    }

    f64::min(score, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::fixtures::record;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    fn context(answer: &str) -> AnswerContext {
        AnswerContext {
            question: "q".into(),
            answer: answer.into(),
            source: "s".into(),
            confidence: 0.3,
        }
    }

    #[test]
    fn test_self_score_baseline() {
        assert_eq!(self_score("what", "short", &[]), 0.5);
    }

    #[test]
    fn test_self_score_all_bonuses_capped() {
        let answer = format!("plan pricing {}", "x".repeat(60));
        let score = self_score("plan pricing", &answer, &[context("pricing details")]);
        assert_eq!(score, 1.0);
    }

    #[test]
    fn test_self_score_partial_overlap() {
        // 1 of 2 question words present: +0.1
        let score = self_score("plan cost", "plan", &[]);
        assert!((score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_self_score_context_only_checks_first_ten_words() {
        let long_context = format!("{} needle", "w ".repeat(10));
        assert_eq!(self_score("zz", "needle", &[context(&long_context)]), 0.5);
    }

    /// Records the prompt it was given and echoes a fixed answer.
    struct Recorder {
        seen: Mutex<Option<(usize, String)>>,
    }

    #[async_trait]
    impl AiBackend for Recorder {
        async fn classify_intent(
            &self,
            _question: &str,
        ) -> Result<crate::llm_client::AiIntent, AiServiceError> {
            Err(AiServiceError::EmptyContent)
        }

        async fn compose_answer(
            &self,
            _question: &str,
            contexts: &[AnswerContext],
            system_prompt: &str,
        ) -> Result<String, AiServiceError> {
            *self.seen.lock() = Some((contexts.len(), system_prompt.to_string()));
            Ok("月額制のプランがあります".to_string())
        }
    }

    #[tokio::test]
    async fn test_compose_limits_contexts_and_uses_topic_persona() {
        let backend = Arc::new(Recorder {
            seen: Mutex::new(None),
        });
        let composer = AiAnswerComposer::new(backend.clone(), 2);

        let records: Vec<_> = (0..4)
            .map(|i| record(&format!("q{i}"), "月額制", "pricing"))
            .collect();
        let ranked: Vec<LexicalMatch> = records
            .iter()
            .map(|r| LexicalMatch {
                record: r,
                score: 0.3,
            })
            .collect();

        let composed = composer
            .compose("料金は？", Topic::Pricing, &ranked)
            .await
            .unwrap();

        let (count, prompt) = backend.seen.lock().clone().unwrap();
        assert_eq!(count, 2);
        assert!(prompt.contains("料金・ライセンスの専門家"));
        assert_eq!(composed.sources.len(), 2);
        // Context answer "月額制" occurs in the composed answer.
        assert!((composed.confidence - 0.7).abs() < 1e-9);
    }
}
