mod citations;
mod compose;
mod config;
mod conversation;
mod dataset;
mod errors;
mod intent;
mod llm_client;
mod models;
mod notify;
mod outcome;
mod routes;
mod search;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::citations::{CitationService, HttpProbe, UrlVerifier};
use crate::config::Config;
use crate::conversation::ConversationFlowEngine;
use crate::dataset::csv_source::CsvLocation;
use crate::dataset::{CsvSource, DatasetCache};
use crate::llm_client::{AiBackend, LlmClient, RateGate};
use crate::notify::{LogNotifier, Notifier, WebhookNotifier};
use crate::routes::build_router;
use crate::search::SearchEngine;
use crate::state::AppState;

const SWEEP_INTERVAL: Duration = Duration::from_secs(600);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on unparseable env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Concierge API v{}", env!("CARGO_PKG_VERSION"));

    // Dataset: CSV file or URL behind a TTL snapshot cache
    let source = CsvSource::new(CsvLocation::parse(&config.data_source));
    let dataset = Arc::new(DatasetCache::new(
        Arc::new(source),
        Duration::from_secs(config.cache_ttl_secs),
    ));
    info!("Q&A data source: {}", config.data_source);

    // AI backend is optional; without a key every AI path is skipped
    let ai: Option<Arc<dyn AiBackend>> = match &config.anthropic_api_key {
        Some(key) => {
            let gate = Arc::new(RateGate::new(
                config.ai_requests_per_minute,
                config.ai_daily_budget_usd,
            ));
            let llm = LlmClient::new(key.clone(), gate)?;
            info!(
                "LLM client initialized (model: {}, {} req/min, ${:.2}/day)",
                llm_client::MODEL,
                config.ai_requests_per_minute,
                config.ai_daily_budget_usd
            );
            let llm: Arc<dyn AiBackend> = Arc::new(llm);
            Some(llm)
        }
        None => {
            info!("ANTHROPIC_API_KEY not set, AI classification and composition disabled");
            None
        }
    };

    // Citations share one verification cache across requests
    let verifier = UrlVerifier::new(Arc::new(HttpProbe::new()?), config.url_check_ttl_hours);
    let citations = CitationService::new(verifier, config.search.citation_limit);

    let search = Arc::new(SearchEngine::new(
        &config.search,
        Arc::clone(&dataset),
        ai.clone(),
        citations.clone(),
    ));
    let flow = Arc::new(ConversationFlowEngine::new(Arc::clone(&dataset)));

    let notifier: Arc<dyn Notifier> = match &config.notify_webhook_url {
        Some(url) => {
            info!("Notifications go to webhook");
            Arc::new(WebhookNotifier::new(url.clone())?)
        }
        None => Arc::new(LogNotifier),
    };

    spawn_idle_sweep(
        Arc::clone(&flow),
        chrono::Duration::hours(config.conversation_idle_hours),
    );

    // Build app state
    let state = AppState {
        config: config.clone(),
        dataset,
        search,
        flow,
        citations,
        notifier,
        ai,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the embedding site

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Drops idle conversation contexts every `SWEEP_INTERVAL`.
fn spawn_idle_sweep(flow: Arc<ConversationFlowEngine>, max_idle: chrono::Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            flow.sweep_idle(max_idle);
        }
    });
}
