// Search pipeline: dataset snapshot → intent → category-aware ranking →
// optional AI composition → citations.
// No module outside `llm_client` talks to the model directly.

pub mod engine;
pub mod handlers;
pub mod lexical;
pub mod ranker;

use thiserror::Error;

use crate::dataset::DataSourceError;

pub use engine::{SearchAnswer, SearchEngine};
pub use ranker::{CategoryAwareRanker, Provenance};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("data source error: {0}")]
    DataSource(#[from] DataSourceError),

    #[error("no answer above threshold for '{query}'")]
    NoMatchFound { query: String },
}
