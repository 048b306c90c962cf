use std::sync::Arc;

use crate::citations::CitationService;
use crate::config::Config;
use crate::conversation::ConversationFlowEngine;
use crate::dataset::DatasetCache;
use crate::llm_client::AiBackend;
use crate::notify::Notifier;
use crate::search::SearchEngine;

/// Shared application state injected into all route handlers via Axum extractors.
/// Built once in `main`; every component is shared, never re-created per request.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub dataset: Arc<DatasetCache>,
    pub search: Arc<SearchEngine>,
    pub flow: Arc<ConversationFlowEngine>,
    /// Same verifier cache the search engine cites through; exposed for stats.
    pub citations: CitationService,
    pub notifier: Arc<dyn Notifier>,
    /// `None` when no API key is configured.
    pub ai: Option<Arc<dyn AiBackend>>,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::citations::verify::tests::CountingProbe;
    use crate::citations::UrlVerifier;
    use crate::config::SearchConfig;
    use crate::dataset::{DataSource, DataSourceError};
    use crate::models::QaRecord;
    use crate::notify::tests::RecordingNotifier;
    use async_trait::async_trait;
    use std::time::Duration;

    pub(crate) struct StaticRows(pub(crate) Vec<QaRecord>);

    #[async_trait]
    impl DataSource for StaticRows {
        async fn fetch(&self) -> Result<Vec<QaRecord>, DataSourceError> {
            Ok(self.0.clone())
        }
    }

    pub(crate) fn test_config() -> Config {
        Config {
            port: 0,
            rust_log: "debug".into(),
            data_source: "memory".into(),
            cache_ttl_secs: 300,
            search: SearchConfig::default(),
            anthropic_api_key: None,
            ai_requests_per_minute: 20,
            ai_daily_budget_usd: 10.0,
            url_check_ttl_hours: 24,
            notify_webhook_url: None,
            conversation_idle_hours: 24,
        }
    }

    /// State over `rows` with no AI backend, an always-reachable URL checker
    /// and a notifier that records what it was sent.
    pub(crate) fn test_state(rows: Vec<QaRecord>) -> (AppState, Arc<RecordingNotifier>) {
        let config = test_config();
        let dataset = Arc::new(DatasetCache::new(
            Arc::new(StaticRows(rows)),
            Duration::from_secs(config.cache_ttl_secs),
        ));
        let citations = CitationService::new(
            UrlVerifier::new(CountingProbe::reachable(), config.url_check_ttl_hours),
            config.search.citation_limit,
        );
        let search = Arc::new(SearchEngine::new(
            &config.search,
            Arc::clone(&dataset),
            None,
            citations.clone(),
        ));
        let recorder = Arc::new(RecordingNotifier::default());
        let notifier: Arc<dyn Notifier> = recorder.clone();

        let state = AppState {
            flow: Arc::new(ConversationFlowEngine::new(Arc::clone(&dataset))),
            config,
            dataset,
            search,
            citations,
            notifier,
            ai: None,
        };
        (state, recorder)
    }
}
