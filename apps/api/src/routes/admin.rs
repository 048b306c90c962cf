use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::conversation::flow::CategorySummary;
use crate::conversation::ConversationContext;
use crate::dataset::{CacheInfo, DataSourceError};
use crate::errors::AppError;
use crate::models::{CategoryStats, QaRecord, Topic};
use crate::notify::{dispatch, NotificationKind};
use crate::outcome::Outcome;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Data source
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub status: &'static str,
    pub records: usize,
    pub fetched_at: DateTime<Utc>,
}

/// GET /api/data-source/status
pub async fn handle_data_source_status(State(state): State<AppState>) -> Json<CacheInfo> {
    Json(state.dataset.info())
}

/// POST /api/data-source/refresh
/// A failed refetch keeps the previous snapshot and reports 503.
pub async fn handle_refresh(
    State(state): State<AppState>,
) -> Result<Json<RefreshResponse>, AppError> {
    let snapshot = match state.dataset.force_refresh().await {
        Outcome::Ok(snapshot) => snapshot,
        Outcome::Degraded { reason, .. } => {
            warn!("Manual refresh failed, stale snapshot kept: {reason}");
            return Err(DataSourceError::Unavailable(reason).into());
        }
        Outcome::Failed(e) => return Err(e.into()),
    };

    let source = state.dataset.source().describe();
    dispatch(
        &state.notifier,
        NotificationKind::DataSourceChange,
        json!({
            "source": format!("{} {}", source.kind, source.location),
            "records": snapshot.len(),
        }),
    );

    Ok(Json(RefreshResponse {
        status: "refreshed",
        records: snapshot.len(),
        fetched_at: snapshot.fetched_at(),
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Admin
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ClearQuery {
    /// Keep the snapshot as a stale fallback instead of dropping it.
    #[serde(default)]
    pub keep_stale: bool,
}

/// POST /api/admin/cache/clear
pub async fn handle_cache_clear(
    State(state): State<AppState>,
    Query(params): Query<ClearQuery>,
) -> Json<CacheInfo> {
    if params.keep_stale {
        state.dataset.invalidate();
    } else {
        state.dataset.clear();
    }
    Json(state.dataset.info())
}

#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub topics: Vec<CategorySummary>,
    /// Keyed by the raw category label found in the dataset.
    pub labels: BTreeMap<String, CategoryStats>,
}

/// GET /api/admin/categories
pub async fn handle_categories(
    State(state): State<AppState>,
) -> Result<Json<CategoriesResponse>, AppError> {
    let topics = state.flow.category_summary().await?;
    let snapshot = state.dataset.get().await.into_result()?;
    Ok(Json(CategoriesResponse {
        topics,
        labels: snapshot.category_stats(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct RecordsQuery {
    #[serde(default)]
    pub q: String,
    pub topic: Option<String>,
}

/// GET /api/admin/records
/// Substring lookup straight against the data source, bypassing the cache.
pub async fn handle_records(
    State(state): State<AppState>,
    Query(params): Query<RecordsQuery>,
) -> Result<Json<Vec<QaRecord>>, AppError> {
    let topic = params
        .topic
        .as_deref()
        .map(|t| t.parse::<Topic>().map_err(|_| AppError::InvalidCategory(t.to_string())))
        .transpose()?;
    let records = state.dataset.source().search(&params.q, topic).await?;
    Ok(Json(records))
}

/// GET /api/admin/conversations/:id
pub async fn handle_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationContext>, AppError> {
    state
        .flow
        .get_context(&id)
        .map(Json)
        .ok_or(AppError::ConversationNotFound(id))
}
