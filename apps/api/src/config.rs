use std::str::FromStr;

use anyhow::{Context, Result};
use serde::Serialize;

/// Application configuration loaded from environment variables.
/// Fails at startup if a present variable cannot be parsed.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// CSV path or http(s) URL of the Q&A dataset.
    pub data_source: String,
    pub cache_ttl_secs: u64,
    pub search: SearchConfig,
    /// Absent key disables every AI path.
    pub anthropic_api_key: Option<String>,
    pub ai_requests_per_minute: usize,
    pub ai_daily_budget_usd: f64,
    pub url_check_ttl_hours: i64,
    pub notify_webhook_url: Option<String>,
    pub conversation_idle_hours: i64,
}

/// Thresholds and limits of the search pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchConfig {
    pub similarity_threshold: f64,
    pub category_boost: f64,
    pub ai_generation_threshold: f64,
    pub ai_context_limit: usize,
    pub citation_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.1,
            category_boost: 0.15,
            ai_generation_threshold: 0.6,
            ai_context_limit: 3,
            citation_limit: 3,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = SearchConfig::default();

        Ok(Config {
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            data_source: std::env::var("QA_DATA_SOURCE")
                .unwrap_or_else(|_| "data/qa_data.csv".to_string()),
            cache_ttl_secs: parse_env("CACHE_TTL_SECONDS", 300)?,
            search: SearchConfig {
                similarity_threshold: parse_env(
                    "SEARCH_SIMILARITY_THRESHOLD",
                    defaults.similarity_threshold,
                )?,
                category_boost: parse_env("CATEGORY_BOOST", defaults.category_boost)?,
                ai_generation_threshold: parse_env(
                    "AI_GENERATION_THRESHOLD",
                    defaults.ai_generation_threshold,
                )?,
                ai_context_limit: parse_env("AI_CONTEXT_LIMIT", defaults.ai_context_limit)?,
                citation_limit: parse_env("CITATION_LIMIT", defaults.citation_limit)?,
            },
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            ai_requests_per_minute: parse_env("AI_REQUESTS_PER_MINUTE", 20)?,
            ai_daily_budget_usd: parse_env("AI_DAILY_BUDGET_USD", 10.0)?,
            url_check_ttl_hours: parse_hours("URL_CHECK_TTL_HOURS", 24)?,
            notify_webhook_url: optional_env("NOTIFY_WEBHOOK_URL"),
            conversation_idle_hours: parse_hours("CONVERSATION_IDLE_HOURS", 24)?,
        })
    }
}

/// Reads a variable, treating unset and blank the same.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

/// Longest accepted hour window (one year).
const MAX_HOURS: i64 = 24 * 366;

/// An hour count in `1..=MAX_HOURS`; zero or negative windows would expire
/// every entry immediately.
fn parse_hours(key: &str, default: i64) -> Result<i64> {
    let hours = parse_env(key, default)?;
    check_hours(key, hours)
}

fn check_hours(key: &str, hours: i64) -> Result<i64> {
    if !(1..=MAX_HOURS).contains(&hours) {
        anyhow::bail!("Environment variable '{key}' must be between 1 and {MAX_HOURS} hours, got {hours}");
    }
    Ok(hours)
}
