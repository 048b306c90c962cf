//! URL reachability checks with a shared TTL cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::OnceCell;
use tokio::task::JoinSet;
use tracing::warn;

use crate::citations::SourceCitation;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const REACHABLE_BONUS: f64 = 0.1;
const UNREACHABLE_PENALTY: f64 = 0.2;
const CONFIDENCE_FLOOR: f64 = 0.3;

/// Answers whether a URL currently responds.
#[async_trait]
pub trait UrlProbe: Send + Sync {
    /// HTTP status of a HEAD request.
    async fn head_status(&self, url: &str) -> anyhow::Result<u16>;
}

pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(PROBE_TIMEOUT).build()?,
        })
    }
}

#[async_trait]
impl UrlProbe for HttpProbe {
    async fn head_status(&self, url: &str) -> anyhow::Result<u16> {
        let response = self.client.head(url).send().await?;
        Ok(response.status().as_u16())
    }
}

#[derive(Debug, Clone, Copy)]
struct UrlCheck {
    reachable: bool,
    checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CitationStats {
    pub total_cached_urls: usize,
    pub accessible_urls: usize,
    /// Share of cached URLs that were reachable, in percent.
    pub cache_hit_rate: f64,
    pub cache_duration_hours: i64,
}

/// One slot per URL. Concurrent callers share the slot, so only the first
/// one sends the request and the rest await its result.
type CheckSlot = Arc<OnceCell<UrlCheck>>;

/// Cheap to clone; clones share the cache.
#[derive(Clone)]
pub struct UrlVerifier {
    probe: Arc<dyn UrlProbe>,
    cache: Arc<DashMap<String, CheckSlot>>,
    ttl: chrono::Duration,
}

impl UrlVerifier {
    pub fn new(probe: Arc<dyn UrlProbe>, ttl_hours: i64) -> Self {
        Self {
            probe,
            cache: Arc::new(DashMap::new()),
            ttl: chrono::Duration::hours(ttl_hours),
        }
    }

    /// Reachability of `url`, probing at most once per TTL. Probe failures
    /// are cached as unreachable.
    pub async fn is_reachable(&self, url: &str) -> bool {
        self.is_reachable_at(url, Utc::now()).await
    }

    async fn is_reachable_at(&self, url: &str, now: DateTime<Utc>) -> bool {
        let slot = self.slot(url, now);
        let check = slot
            .get_or_init(|| async {
                let reachable = match self.probe.head_status(url).await {
                    Ok(status) => status < 400,
                    Err(e) => {
                        warn!("URL check failed for {url}: {e}");
                        false
                    }
                };
                UrlCheck {
                    reachable,
                    checked_at: now,
                }
            })
            .await;
        check.reachable
    }

    /// The slot for `url`, replaced by an empty one once its check expired.
    /// The map entry stays locked while deciding, so racing callers agree on
    /// a single slot.
    fn slot(&self, url: &str, now: DateTime<Utc>) -> CheckSlot {
        let mut entry = self.cache.entry(url.to_string()).or_default();
        let expired = entry
            .value()
            .get()
            .is_some_and(|check| now - check.checked_at >= self.ttl);
        if expired {
            *entry = CheckSlot::default();
        }
        Arc::clone(entry.value())
    }

    /// Verifies every distinct URL concurrently and adjusts confidence:
    /// reachable `+0.1` (max 1.0) and stamped, unreachable `-0.2` (min 0.3).
    pub async fn enhance(&self, mut citations: Vec<SourceCitation>) -> Vec<SourceCitation> {
        let mut pending = JoinSet::new();
        let mut seen = std::collections::HashSet::new();
        for url in citations.iter().filter_map(|c| c.url.clone()) {
            if seen.insert(url.clone()) {
                let verifier = self.clone();
                pending.spawn(async move {
                    let reachable = verifier.is_reachable(&url).await;
                    (url, reachable)
                });
            }
        }

        let mut results: HashMap<String, bool> = HashMap::new();
        while let Some(joined) = pending.join_next().await {
            match joined {
                Ok((url, reachable)) => {
                    results.insert(url, reachable);
                }
                Err(e) => warn!("URL check task failed: {e}"),
            }
        }

        let now = Utc::now();
        for citation in &mut citations {
            let Some(url) = &citation.url else { continue };
            if results.get(url).copied().unwrap_or(false) {
                citation.confidence = f64::min(citation.confidence + REACHABLE_BONUS, 1.0);
                citation.last_verified = Some(now);
            } else {
                citation.confidence =
                    f64::max(citation.confidence - UNREACHABLE_PENALTY, CONFIDENCE_FLOOR);
            }
        }
        citations
    }

    pub fn stats(&self) -> CitationStats {
        let checks: Vec<UrlCheck> = self
            .cache
            .iter()
            .filter_map(|e| e.value().get().copied())
            .collect();
        let total = checks.len();
        let accessible = checks.iter().filter(|c| c.reachable).count();
        let rate = accessible as f64 / total.max(1) as f64 * 100.0;
        CitationStats {
            total_cached_urls: total,
            accessible_urls: accessible,
            cache_hit_rate: (rate * 10.0).round() / 10.0,
            cache_duration_hours: self.ttl.num_hours(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::citations::SourceType;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a fixed status and counts calls.
    pub(crate) struct CountingProbe {
        status: Option<u16>,
        delay: std::time::Duration,
        calls: AtomicUsize,
    }

    impl CountingProbe {
        pub(crate) fn reachable() -> Arc<Self> {
            Self::with_status(Some(200))
        }

        pub(crate) fn with_status(status: Option<u16>) -> Arc<Self> {
            Arc::new(Self {
                status,
                delay: std::time::Duration::ZERO,
                calls: AtomicUsize::new(0),
            })
        }

        /// Reachable, but each check takes `delay`.
        pub(crate) fn slow(delay: std::time::Duration) -> Arc<Self> {
            Arc::new(Self {
                status: Some(200),
                delay,
                calls: AtomicUsize::new(0),
            })
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl UrlProbe for CountingProbe {
        async fn head_status(&self, _url: &str) -> anyhow::Result<u16> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.status.ok_or_else(|| anyhow::anyhow!("connection refused"))
        }
    }

    fn cited(url: &str, confidence: f64) -> SourceCitation {
        SourceCitation {
            title: "t".into(),
            url: Some(url.into()),
            source_type: SourceType::OfficialWebsite,
            confidence,
            last_verified: None,
            excerpt: None,
            section: None,
        }
    }

    #[tokio::test]
    async fn test_same_url_twice_within_ttl_checks_once() {
        let probe = CountingProbe::reachable();
        let verifier = UrlVerifier::new(probe.clone(), 24);

        assert!(verifier.is_reachable("https://www.pip-maker.com/").await);
        assert!(verifier.is_reachable("https://www.pip-maker.com/").await);
        assert_eq!(probe.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_checks_of_one_url_share_one_request() {
        let probe = CountingProbe::slow(std::time::Duration::from_millis(50));
        let verifier = UrlVerifier::new(probe.clone(), 24);
        let url = "https://www.pip-maker.com/";

        let (first, second) = tokio::join!(verifier.is_reachable(url), verifier.is_reachable(url));
        assert!(first && second);
        assert_eq!(probe.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_requests_through_clones_share_one_request() {
        let probe = CountingProbe::slow(std::time::Duration::from_millis(50));
        let verifier = UrlVerifier::new(probe.clone(), 24);

        let a = tokio::spawn({
            let v = verifier.clone();
            async move { v.enhance(vec![cited("https://a.test/", 0.9)]).await }
        });
        let b = tokio::spawn({
            let v = verifier.clone();
            async move { v.enhance(vec![cited("https://a.test/", 0.9)]).await }
        });
        let (a, b) = (a.await.unwrap(), b.await.unwrap());

        assert_eq!(a[0].confidence, 1.0);
        assert_eq!(b[0].confidence, 1.0);
        assert_eq!(probe.calls(), 1);
        assert_eq!(verifier.stats().total_cached_urls, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_checked_again() {
        let probe = CountingProbe::reachable();
        let verifier = UrlVerifier::new(probe.clone(), 24);
        let url = "https://www.pip-maker.com/";

        verifier.is_reachable_at(url, Utc::now() - chrono::Duration::hours(25)).await;
        verifier.is_reachable(url).await;
        assert_eq!(probe.calls(), 2);
    }

    #[tokio::test]
    async fn test_enhance_adjusts_confidence() {
        let ok = UrlVerifier::new(CountingProbe::reachable(), 24);
        let enhanced = ok.enhance(vec![cited("https://a.test/", 0.95)]).await;
        assert_eq!(enhanced[0].confidence, 1.0);
        assert!(enhanced[0].last_verified.is_some());

        let down = UrlVerifier::new(CountingProbe::with_status(Some(404)), 24);
        let enhanced = down.enhance(vec![cited("https://a.test/", 0.4)]).await;
        assert_eq!(enhanced[0].confidence, 0.3);
        assert!(enhanced[0].last_verified.is_none());
    }

    #[tokio::test]
    async fn test_request_error_cached_as_unreachable() {
        let probe = CountingProbe::with_status(None);
        let verifier = UrlVerifier::new(probe.clone(), 24);

        let enhanced = verifier
            .enhance(vec![cited("https://a.test/", 0.9), cited("https://a.test/", 0.9)])
            .await;
        assert!(enhanced.iter().all(|c| (c.confidence - 0.7).abs() < 1e-9));
        assert_eq!(probe.calls(), 1);

        let stats = verifier.stats();
        assert_eq!(stats.total_cached_urls, 1);
        assert_eq!(stats.accessible_urls, 0);
        assert_eq!(stats.cache_duration_hours, 24);
    }

    #[tokio::test]
    async fn test_internal_citations_untouched() {
        let verifier = UrlVerifier::new(CountingProbe::reachable(), 24);
        let mut internal = cited("x", 0.8);
        internal.url = None;
        let enhanced = verifier.enhance(vec![internal.clone()]).await;
        assert_eq!(enhanced[0], internal);
    }
}
