//! Category-aware ranking: topic-scoped lexical search first, unscoped
//! fallback second, then the boost-and-blend confidence rule.

use serde::Serialize;

use crate::config::SearchConfig;
use crate::models::{DatasetSnapshot, QaRecord, Topic};
use crate::outcome::Outcome;
use crate::search::lexical::{self, LexicalMatch};
use crate::search::SearchError;

/// Which stage produced the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Matched inside the resolved topic.
    Category,
    /// Matched only by the unscoped fallback.
    Lexical,
    /// Composed by the AI backend.
    Ai,
}

#[derive(Debug, Clone)]
pub struct Ranking<'r> {
    pub best: &'r QaRecord,
    /// Raw lexical similarity of `best`.
    pub raw_score: f64,
    /// Blended confidence.
    pub confidence: f64,
    pub boosted: bool,
    pub provenance: Provenance,
    /// Every scored candidate of the stage that matched, best-first.
    pub candidates: Vec<LexicalMatch<'r>>,
}

pub struct CategoryAwareRanker {
    threshold: f64,
    boost: f64,
}

impl CategoryAwareRanker {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            threshold: config.similarity_threshold,
            boost: config.category_boost,
        }
    }

    /// Ranks `query` against `snapshot`. `intent_confidence` is 1.0 when the
    /// topic came from the user rather than the classifier.
    pub fn rank<'r>(
        &self,
        query: &str,
        snapshot: &'r DatasetSnapshot,
        topic: Topic,
        intent_confidence: f64,
    ) -> Outcome<Ranking<'r>, SearchError> {
        let scoped = lexical::score_all(query, &snapshot.in_topic(topic));
        if let Some(best) = lexical::best_of(&scoped, self.threshold) {
            return Outcome::Ok(self.blend(best, topic, intent_confidence, Provenance::Category, scoped));
        }

        let everything: Vec<&QaRecord> = snapshot.records().iter().collect();
        let unscoped = lexical::score_all(query, &everything);
        match lexical::best_of(&unscoped, self.threshold) {
            Some(best) => Outcome::degraded(
                self.blend(best, topic, intent_confidence, Provenance::Lexical, unscoped),
                format!("no match above threshold within topic '{topic}'"),
            ),
            None => Outcome::Failed(SearchError::NoMatchFound {
                query: query.to_string(),
            }),
        }
    }

    fn blend<'r>(
        &self,
        best: LexicalMatch<'r>,
        topic: Topic,
        intent_confidence: f64,
        provenance: Provenance,
        scored: Vec<LexicalMatch<'r>>,
    ) -> Ranking<'r> {
        let boosted = best.record.in_topic(topic);
        let adjusted = if boosted {
            f64::min(best.score + self.boost, 1.0)
        } else {
            best.score
        };

        Ranking {
            best: best.record,
            raw_score: best.score,
            confidence: (adjusted + intent_confidence) / 2.0,
            boosted,
            provenance,
            candidates: lexical::ranked(scored),
        }
    }
}
