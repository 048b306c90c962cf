use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::dataset::{DataSource, DataSourceError, SourceDescription};
use crate::models::DatasetSnapshot;
use crate::outcome::Outcome;

struct Cached {
    snapshot: Arc<DatasetSnapshot>,
    /// `None` once invalidated: the snapshot is kept only as a stale fallback.
    loaded_at: Option<Instant>,
}

/// Cache state as reported by the admin routes.
#[derive(Debug, Clone, Serialize)]
pub struct CacheInfo {
    pub cached: bool,
    pub cache_size: usize,
    pub fetched_at: Option<DateTime<Utc>>,
    pub cache_valid: bool,
    pub ttl_seconds: u64,
    pub source: SourceDescription,
}

/// TTL-bound holder of the current dataset snapshot.
///
/// Readers get an `Arc` to an immutable snapshot; a refresh builds a new one
/// and swaps the pointer, so in-flight requests keep reading the old copy.
pub struct DatasetCache {
    source: Arc<dyn DataSource>,
    ttl: Duration,
    current: RwLock<Option<Cached>>,
    /// Serializes refetches so an expired cache is fetched once, not per request.
    refresh: tokio::sync::Mutex<()>,
}

impl DatasetCache {
    pub fn new(source: Arc<dyn DataSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            current: RwLock::new(None),
            refresh: tokio::sync::Mutex::new(()),
        }
    }

    pub fn source(&self) -> &Arc<dyn DataSource> {
        &self.source
    }

    /// Returns the current snapshot, refetching when it is older than the TTL.
    pub async fn get(&self) -> Outcome<Arc<DatasetSnapshot>, DataSourceError> {
        if let Some(snapshot) = self.fresh_snapshot() {
            debug!("Serving {} cached Q&A rows", snapshot.len());
            return Outcome::Ok(snapshot);
        }

        let _guard = self.refresh.lock().await;
        // Another request may have refreshed while we waited.
        if let Some(snapshot) = self.fresh_snapshot() {
            return Outcome::Ok(snapshot);
        }
        self.refetch().await
    }

    /// Refetches regardless of snapshot age.
    pub async fn force_refresh(&self) -> Outcome<Arc<DatasetSnapshot>, DataSourceError> {
        let _guard = self.refresh.lock().await;
        self.refetch().await
    }

    /// Marks the snapshot expired; it stays available as a stale fallback.
    pub fn invalidate(&self) {
        if let Some(cached) = self.current.write().as_mut() {
            cached.loaded_at = None;
        }
        info!("Q&A dataset cache invalidated");
    }

    /// Drops the snapshot entirely.
    pub fn clear(&self) {
        *self.current.write() = None;
        info!("Q&A dataset cache cleared");
    }

    pub fn info(&self) -> CacheInfo {
        let current = self.current.read();
        CacheInfo {
            cached: current.is_some(),
            cache_size: current.as_ref().map_or(0, |c| c.snapshot.len()),
            fetched_at: current.as_ref().map(|c| c.snapshot.fetched_at()),
            cache_valid: current.as_ref().is_some_and(|c| self.is_fresh(c)),
            ttl_seconds: self.ttl.as_secs(),
            source: self.source.describe(),
        }
    }

    fn is_fresh(&self, cached: &Cached) -> bool {
        cached
            .loaded_at
            .is_some_and(|loaded| loaded.elapsed() < self.ttl)
    }

    fn fresh_snapshot(&self) -> Option<Arc<DatasetSnapshot>> {
        self.current
            .read()
            .as_ref()
            .filter(|c| self.is_fresh(c))
            .map(|c| Arc::clone(&c.snapshot))
    }

    async fn refetch(&self) -> Outcome<Arc<DatasetSnapshot>, DataSourceError> {
        match self.source.fetch().await {
            Ok(records) => {
                let snapshot = Arc::new(DatasetSnapshot::new(records, Utc::now()));
                *self.current.write() = Some(Cached {
                    snapshot: Arc::clone(&snapshot),
                    loaded_at: Some(Instant::now()),
                });
                info!("Q&A dataset refreshed: {} rows", snapshot.len());
                Outcome::Ok(snapshot)
            }
            Err(e) => {
                let stale = self
                    .current
                    .read()
                    .as_ref()
                    .map(|c| Arc::clone(&c.snapshot));
                match stale {
                    Some(snapshot) => {
                        warn!("Dataset fetch failed, serving stale snapshot: {e}");
                        Outcome::degraded(snapshot, format!("stale snapshot: {e}"))
                    }
                    None => Outcome::Failed(e),
                }
            }
        }
    }
}
