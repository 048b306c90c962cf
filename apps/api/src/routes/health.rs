use axum::{extract::State, Json};
use serde::Serialize;

use crate::citations::CitationStats;
use crate::config::SearchConfig;
use crate::dataset::CacheInfo;
use crate::llm_client::UsageStats;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub service: &'static str,
    pub ai_enabled: bool,
    pub ai_usage: Option<UsageStats>,
    pub search: SearchConfig,
    pub dataset: CacheInfo,
    pub citations: CitationStats,
    pub active_conversations: usize,
}

/// GET /health
/// Always 200; a missing dataset shows up as `dataset.cached == false`.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        service: env!("CARGO_PKG_NAME"),
        ai_enabled: state.search.ai_enabled(),
        ai_usage: state.ai.as_ref().and_then(|ai| ai.usage()),
        search: state.config.search.clone(),
        dataset: state.dataset.info(),
        citations: state.citations.verifier().stats(),
        active_conversations: state.flow.active_conversations(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::fixtures::record;
    use crate::state::tests::test_state;

    #[tokio::test]
    async fn test_health_reports_components() {
        let (state, _) = test_state(vec![record("q", "a", "about")]);
        state.flow.begin("c1");

        let Json(health) = health_handler(State(state)).await;
        assert_eq!(health.status, "ok");
        assert!(!health.ai_enabled);
        assert!(health.ai_usage.is_none());
        assert!(!health.dataset.cached);
        assert_eq!(health.active_conversations, 1);
        assert_eq!(health.citations.total_cached_urls, 0);
        assert_eq!(health.search, SearchConfig::default());
    }
}
