//! The canonical search pipeline.
//!
//! 1. Read the dataset snapshot (stale snapshot is acceptable).
//! 2. Resolve the topic: user-supplied (intent confidence 1.0) or classified.
//! 3. Rank within the topic, falling back to the whole dataset.
//! 4. If the blended confidence is under the AI threshold and a backend is
//!    configured, compose an answer from the top candidates.
//! 5. Attach citations.
//!
//! Every fallback taken is listed in `SearchAnswer::fallbacks`.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::citations::{CitationService, FormattedCitations};
use crate::compose::AiAnswerComposer;
use crate::config::SearchConfig;
use crate::dataset::DatasetCache;
use crate::intent::{ClassificationMethod, IntentClassifier};
use crate::llm_client::AiBackend;
use crate::models::{QaRecord, Topic};
use crate::outcome::Outcome;
use crate::search::ranker::{CategoryAwareRanker, Provenance};
use crate::search::SearchError;

/// Placeholder for matched rows whose answer cell is blank.
const MISSING_ANSWER: &str = "申し訳ございませんが、この質問に対する回答が登録されていません。お問い合わせフォームからご連絡ください。";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicSource {
    /// Given in the request or selected earlier in the conversation.
    User,
    Classified(ClassificationMethod),
}

#[derive(Debug, Clone, Serialize)]
pub struct IntentSummary {
    pub confidence: f64,
    pub source: TopicSource,
    pub specific_intent: Option<String>,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchAnswer {
    pub answer: String,
    pub confidence: f64,
    pub topic: Topic,
    pub citations: FormattedCitations,
    pub ai_generated: bool,
    pub provenance: Provenance,
    /// Question of the matched dataset row.
    pub question: String,
    /// Raw lexical similarity of the matched row, before boost and blend.
    pub similarity: f64,
    /// Whether the matched row got the same-topic boost.
    pub category_boosted: bool,
    pub intent: IntentSummary,
    pub fallbacks: Vec<String>,
}

pub struct SearchEngine {
    dataset: Arc<DatasetCache>,
    classifier: IntentClassifier,
    ranker: CategoryAwareRanker,
    composer: Option<AiAnswerComposer>,
    citations: CitationService,
    ai_generation_threshold: f64,
}

impl SearchEngine {
    pub fn new(
        config: &SearchConfig,
        dataset: Arc<DatasetCache>,
        ai: Option<Arc<dyn AiBackend>>,
        citations: CitationService,
    ) -> Self {
        Self {
            dataset,
            classifier: IntentClassifier::new(ai.clone()),
            ranker: CategoryAwareRanker::new(config),
            composer: ai.map(|ai| AiAnswerComposer::new(ai, config.ai_context_limit)),
            citations,
            ai_generation_threshold: config.ai_generation_threshold,
        }
    }

    pub fn ai_enabled(&self) -> bool {
        self.composer.is_some()
    }

    /// Answers `question`. `topic` is the user's choice, if any.
    pub async fn search(
        &self,
        question: &str,
        topic: Option<Topic>,
    ) -> Result<SearchAnswer, SearchError> {
        let mut fallbacks = Vec::new();

        let snapshot = match self.dataset.get().await {
            Outcome::Ok(s) => s,
            Outcome::Degraded { value, reason } => {
                fallbacks.push(reason);
                value
            }
            Outcome::Failed(e) => return Err(e.into()),
        };

        let (topic, intent) = match topic {
            Some(topic) => (
                topic,
                IntentSummary {
                    confidence: 1.0,
                    source: TopicSource::User,
                    specific_intent: None,
                    keywords: Vec::new(),
                },
            ),
            None => {
                let classified = self.classifier.classify(question).await;
                if let Some(reason) = classified.reason() {
                    fallbacks.push(reason.to_string());
                }
                let result = classified.into_result().unwrap_or_else(|never| match never {});
                info!(
                    "Intent classified as {} ({:.2}, {:?})",
                    result.topic, result.confidence, result.method
                );
                (
                    result.topic,
                    IntentSummary {
                        confidence: result.confidence,
                        source: TopicSource::Classified(result.method),
                        specific_intent: Some(result.specific_intent),
                        keywords: result.keywords,
                    },
                )
            }
        };

        let ranking = match self.ranker.rank(question, &snapshot, topic, intent.confidence) {
            Outcome::Ok(r) => r,
            Outcome::Degraded { value, reason } => {
                fallbacks.push(reason);
                value
            }
            Outcome::Failed(e) => {
                info!("No match for '{question}' (topic {topic})");
                return Err(e);
            }
        };

        let mut answer = if ranking.best.answer.trim().is_empty() {
            MISSING_ANSWER.to_string()
        } else {
            ranking.best.answer.clone()
        };
        let mut confidence = ranking.confidence;
        let mut provenance = ranking.provenance;
        let mut cited: Vec<&QaRecord> = vec![ranking.best];

        if let Some(composer) = &self.composer {
            if confidence < self.ai_generation_threshold {
                match composer.compose(question, topic, &ranking.candidates).await {
                    Ok(composed) => {
                        answer = composed.answer;
                        confidence = composed.confidence;
                        provenance = Provenance::Ai;
                        cited = ranking
                            .candidates
                            .iter()
                            .take(composed.sources.len())
                            .map(|m| m.record)
                            .collect();
                    }
                    Err(e) => {
                        warn!("AI composition failed, keeping lexical answer: {e}");
                        fallbacks.push(format!("AI composition failed: {e}"));
                    }
                }
            }
        }

        let citations = self.citations.cite(&cited, question, topic).await;

        Ok(SearchAnswer {
            answer,
            confidence: confidence.clamp(0.0, 1.0),
            topic,
            citations,
            ai_generated: provenance == Provenance::Ai,
            provenance,
            question: ranking.best.question.clone(),
            similarity: ranking.raw_score,
            category_boosted: ranking.boosted,
            intent,
            fallbacks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citations::verify::tests::CountingProbe;
    use crate::citations::UrlVerifier;
    use crate::dataset::{DataSource, DataSourceError};
    use crate::llm_client::{AiIntent, AiServiceError, AnswerContext};
    use crate::models::record::fixtures::record;
    use async_trait::async_trait;
    use std::time::Duration;

    struct Rows(Vec<QaRecord>);

    #[async_trait]
    impl DataSource for Rows {
        async fn fetch(&self) -> Result<Vec<QaRecord>, DataSourceError> {
            Ok(self.0.clone())
        }
    }

    struct FakeAi {
        answer: Result<String, ()>,
    }

    #[async_trait]
    impl AiBackend for FakeAi {
        async fn classify_intent(&self, _question: &str) -> Result<AiIntent, AiServiceError> {
            Err(AiServiceError::RateLimited("test".into()))
        }

        async fn compose_answer(
            &self,
            _question: &str,
            _contexts: &[AnswerContext],
            _system_prompt: &str,
        ) -> Result<String, AiServiceError> {
            self.answer.clone().map_err(|_| AiServiceError::EmptyContent)
        }
    }

    fn dataset() -> Vec<QaRecord> {
        let mut pricing = record("料金プランについて教えて", "月額制のプランがあります", "pricing");
        pricing.source = "料金ページ https://www.pip-maker.com/pricing".into();
        vec![
            pricing,
            record("導入事例はありますか", "多数の企業で導入されています", "cases"),
            record("操作方法を知りたい", "マニュアルをご覧ください", "features"),
        ]
    }

    fn engine(ai: Option<Arc<dyn AiBackend>>) -> SearchEngine {
        let cache = DatasetCache::new(Arc::new(Rows(dataset())), Duration::from_secs(300));
        let citations = CitationService::new(UrlVerifier::new(CountingProbe::reachable(), 24), 3);
        SearchEngine::new(&SearchConfig::default(), Arc::new(cache), ai, citations)
    }

    #[tokio::test]
    async fn test_explicit_topic_scoped_match() {
        let answer = engine(None)
            .search("料金プランについて教えて", Some(Topic::Pricing))
            .await
            .unwrap();

        assert_eq!(answer.answer, "月額制のプランがあります");
        assert_eq!(answer.provenance, Provenance::Category);
        assert_eq!(answer.intent.confidence, 1.0);
        assert_eq!(answer.confidence, 1.0);
        assert_eq!(answer.similarity, 1.0);
        assert!(answer.category_boosted);
        assert!(!answer.ai_generated);
        assert!(answer.fallbacks.is_empty());
        assert_eq!(
            answer.citations.citations[0].url.as_deref(),
            Some("https://www.pip-maker.com/pricing")
        );
    }

    #[tokio::test]
    async fn test_classified_topic_without_ai() {
        let answer = engine(None).search("料金プランについて", None).await.unwrap();
        assert_eq!(answer.topic, Topic::Pricing);
        assert!(matches!(
            answer.intent.source,
            TopicSource::Classified(ClassificationMethod::RuleBased)
        ));
        assert!(answer.confidence <= 1.0);
    }

    #[tokio::test]
    async fn test_price_question_lands_in_pricing() {
        let cache = DatasetCache::new(
            Arc::new(Rows(vec![record("価格は？", "A", "pricing")])),
            Duration::from_secs(300),
        );
        let citations = CitationService::new(UrlVerifier::new(CountingProbe::reachable(), 24), 3);
        let engine = SearchEngine::new(&SearchConfig::default(), Arc::new(cache), None, citations);

        let answer = engine.search("価格について教えて", None).await.unwrap();
        assert_eq!(answer.topic, Topic::Pricing);
        assert_eq!(answer.answer, "A");
        assert_eq!(answer.provenance, Provenance::Category);
    }

    #[tokio::test]
    async fn test_unscoped_fallback_recorded() {
        let answer = engine(None)
            .search("導入事例はありますか", Some(Topic::Pricing))
            .await
            .unwrap();
        assert_eq!(answer.provenance, Provenance::Lexical);
        assert!(!answer.category_boosted);
        assert_eq!(answer.fallbacks.len(), 1);
    }

    #[tokio::test]
    async fn test_no_match_is_error_even_with_ai() {
        let ai: Arc<dyn AiBackend> = Arc::new(FakeAi {
            answer: Ok("x".into()),
        });
        let result = engine(Some(ai)).search("zzzzzzzz", Some(Topic::About)).await;
        assert!(matches!(result, Err(SearchError::NoMatchFound { .. })));
    }

    #[tokio::test]
    async fn test_low_confidence_is_composed_by_ai() {
        let ai: Arc<dyn AiBackend> = Arc::new(FakeAi {
            answer: Ok("PIP-Makerは月額制のプランがあります。".into()),
        });
        // Rules give pricing at 0.25 and the scoped match is weak, so the
        // blend stays under the AI threshold.
        let answer = engine(Some(ai)).search("プランの話", None).await.unwrap();

        assert!(answer.ai_generated);
        assert_eq!(answer.provenance, Provenance::Ai);
        // AI classification failed and fell back to rules.
        assert!(answer.fallbacks.iter().any(|f| f.contains("AI classification failed")));
        assert!((0.5..=1.0).contains(&answer.confidence));
    }

    #[tokio::test]
    async fn test_ai_failure_keeps_lexical_answer() {
        let ai: Arc<dyn AiBackend> = Arc::new(FakeAi { answer: Err(()) });
        let answer = engine(Some(ai)).search("プランの話", None).await.unwrap();

        assert!(!answer.ai_generated);
        assert_ne!(answer.provenance, Provenance::Ai);
        assert!(answer.fallbacks.iter().any(|f| f.contains("AI composition failed")));
    }

    #[tokio::test]
    async fn test_blank_answer_gets_placeholder() {
        let cache = DatasetCache::new(
            Arc::new(Rows(vec![record("空の回答", "  ", "other")])),
            Duration::from_secs(300),
        );
        let citations = CitationService::new(UrlVerifier::new(CountingProbe::reachable(), 24), 3);
        let engine = SearchEngine::new(&SearchConfig::default(), Arc::new(cache), None, citations);

        let answer = engine.search("空の回答", Some(Topic::Other)).await.unwrap();
        assert_eq!(answer.answer, MISSING_ANSWER);
    }
}
