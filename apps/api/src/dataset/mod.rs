//! Dataset access: the `DataSource` seam, the CSV implementation and the
//! TTL-bound snapshot cache that every request reads through.

pub mod cache;
pub mod csv_source;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::models::{QaRecord, Topic};

pub use cache::{CacheInfo, DatasetCache};
pub use csv_source::CsvSource;

#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error("data source unavailable: {0}")]
    Unavailable(String),

    #[error("malformed dataset: {0}")]
    Malformed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Human-readable description of where records come from.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SourceDescription {
    pub kind: String,
    pub location: String,
}

/// The external dataset. `search` and `describe` carry defaults so a minimal
/// source only has to implement `fetch`.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<QaRecord>, DataSourceError>;

    /// Substring search over question and answer, optionally topic-scoped.
    async fn search(
        &self,
        query: &str,
        topic: Option<Topic>,
    ) -> Result<Vec<QaRecord>, DataSourceError> {
        Ok(filter_records(self.fetch().await?, query, topic))
    }

    fn describe(&self) -> SourceDescription {
        SourceDescription {
            kind: "custom".to_string(),
            location: "-".to_string(),
        }
    }
}

/// Keeps rows in `topic` (if given) whose question or answer contains `query`.
/// An empty query keeps every row of the topic.
pub fn filter_records(records: Vec<QaRecord>, query: &str, topic: Option<Topic>) -> Vec<QaRecord> {
    let query = query.trim().to_lowercase();
    records
        .into_iter()
        .filter(|r| topic.map_or(true, |t| r.in_topic(t)))
        .filter(|r| {
            query.is_empty()
                || r.question.to_lowercase().contains(&query)
                || r.answer.to_lowercase().contains(&query)
        })
        .collect()
}
