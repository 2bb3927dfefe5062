use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::future::BoxFuture;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::ConnectorError;
use crate::models::Place;

/// Source of the complete, unfiltered place list.
///
/// Implemented for any `Fn() -> impl Future<Output = anyhow::Result<Vec<Place>>>`,
/// so plain async closures can be used as retrievers.
pub trait PlacesRetriever: Send + Sync {
    fn retrieve(&self) -> BoxFuture<'_, anyhow::Result<Vec<Place>>>;
}

impl<F, Fut> PlacesRetriever for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Vec<Place>>> + Send + 'static,
{
    fn retrieve(&self) -> BoxFuture<'_, anyhow::Result<Vec<Place>>> {
        Box::pin(self())
    }
}

/// Time source used to decide cache expiry.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// An immutable view of the cached places at a given refresh generation.
#[derive(Debug, Clone)]
pub struct CacheSnapshot {
    pub generation: u64,
    pub places: Arc<[Place]>,
}

#[derive(Debug, Default)]
struct CacheEntry {
    places: Option<Arc<[Place]>>,
    expires_at: Option<DateTime<Utc>>,
    /// Incremented on every successful refresh
    generation: u64,
}

impl CacheEntry {
    fn is_stale(&self, now: DateTime<Utc>) -> bool {
        match (&self.places, self.expires_at) {
            (None, _) => true,
            (Some(_), Some(expires_at)) => now >= expires_at,
            (Some(_), None) => false,
        }
    }
}

/// Shared, lazily refreshed snapshot of every place.
///
/// Without a retriever the snapshot given at construction is served forever.
/// With one, the snapshot is fetched on first use and again whenever the
/// expiration time has been reached.
pub struct PlacesCache {
    retriever: Option<Arc<dyn PlacesRetriever>>,
    ttl: Option<Duration>,
    clock: Clock,
    // Held across the retriever call so concurrent refreshes collapse into one
    entry: Mutex<CacheEntry>,
}

impl PlacesCache {
    /// Cache backed by a retriever, optionally seeded with an earlier
    /// snapshot and its expiration time.
    pub fn with_retriever(
        retriever: Arc<dyn PlacesRetriever>,
        lifetime_sec: Option<u64>,
        places: Option<Vec<Place>>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            retriever: Some(retriever),
            ttl: lifetime_sec.map(ttl_from_secs),
            clock: system_clock(),
            entry: Mutex::new(CacheEntry {
                places: places.map(Arc::from),
                expires_at,
                generation: 0,
            }),
        }
    }

    /// Cache over a fixed list that is never refreshed.
    pub fn from_places(places: Vec<Place>) -> Self {
        Self {
            retriever: None,
            ttl: None,
            clock: system_clock(),
            entry: Mutex::new(CacheEntry {
                places: Some(Arc::from(places)),
                expires_at: None,
                generation: 0,
            }),
        }
    }

    /// Replace the time source (used to simulate expiry).
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    pub async fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.entry.lock().await.expires_at
    }

    pub async fn generation(&self) -> u64 {
        self.entry.lock().await.generation
    }

    /// Whether the next `snapshot` call would invoke the retriever
    pub async fn is_stale(&self) -> bool {
        self.retriever.is_some() && self.entry.lock().await.is_stale((self.clock)())
    }

    /// Current snapshot, refreshed from the retriever first when stale.
    ///
    /// A failed retrieval leaves the previous snapshot and expiration
    /// untouched, so the next call retries.
    pub async fn snapshot(&self) -> Result<CacheSnapshot, ConnectorError> {
        let mut entry = self.entry.lock().await;

        if let Some(ref retriever) = self.retriever {
            if entry.is_stale((self.clock)()) {
                debug!(generation = entry.generation, "Places cache stale, retrieving");

                let places = retriever.retrieve().await.map_err(|e| {
                    warn!(error = %e, "Places retrieval failed");
                    ConnectorError::Retrieval(e)
                })?;

                if let Some(ttl) = self.ttl {
                    // Out-of-range expirations mean the snapshot never expires
                    entry.expires_at = (self.clock)().checked_add_signed(ttl);
                }
                entry.places = Some(Arc::from(places));
                entry.generation += 1;

                info!(
                    count = entry.places.as_ref().map_or(0, |p| p.len()),
                    generation = entry.generation,
                    expires_at = ?entry.expires_at,
                    "Places cache refreshed"
                );
            } else {
                debug!(generation = entry.generation, "Places cache hit");
            }
        }

        Ok(CacheSnapshot {
            generation: entry.generation,
            places: entry.places.clone().unwrap_or_else(|| Arc::from(Vec::new())),
        })
    }
}

impl std::fmt::Debug for PlacesCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlacesCache")
            .field("has_retriever", &self.retriever.is_some())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

fn ttl_from_secs(secs: u64) -> Duration {
    let secs = i64::try_from(secs).unwrap_or(i64::MAX).min(i64::MAX / 1000);
    Duration::seconds(secs)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

    fn sample_places() -> Vec<Place> {
        vec![
            Place::new("A001", "Rome").with_province("RM"),
            Place::new("Z404", "France"),
        ]
    }

    fn counting_retriever(calls: Arc<AtomicUsize>) -> Arc<dyn PlacesRetriever> {
        Arc::new(move || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>(sample_places())
            }
        })
    }

    /// Clock starting at a fixed instant, advanced by hand in seconds.
    fn manual_clock() -> (Clock, Arc<AtomicI64>) {
        let start = Utc::now();
        let offset = Arc::new(AtomicI64::new(0));
        let handle = offset.clone();
        let clock: Clock =
            Arc::new(move || start + Duration::seconds(handle.load(Ordering::SeqCst)));
        (clock, offset)
    }

    #[tokio::test]
    async fn test_static_places_never_refresh() {
        let cache = PlacesCache::from_places(sample_places());
        assert!(!cache.is_stale().await);

        let first = cache.snapshot().await.unwrap();
        let second = cache.snapshot().await.unwrap();
        assert_eq!(first.places.len(), 2);
        assert_eq!(first.generation, 0);
        assert_eq!(second.generation, 0);
        assert!(Arc::ptr_eq(&first.places, &second.places));
    }

    #[tokio::test]
    async fn test_first_snapshot_retrieves() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = PlacesCache::with_retriever(counting_retriever(calls.clone()), None, None, None);
        assert!(cache.is_stale().await);

        let snapshot = cache.snapshot().await.unwrap();
        assert_eq!(snapshot.places.len(), 2);
        assert_eq!(snapshot.generation, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_ttl_retrieves_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = PlacesCache::with_retriever(counting_retriever(calls.clone()), None, None, None);

        for _ in 0..5 {
            cache.snapshot().await.unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.expires_at().await, None);
    }

    #[tokio::test]
    async fn test_ttl_refresh_trigger() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (clock, offset) = manual_clock();
        let cache =
            PlacesCache::with_retriever(counting_retriever(calls.clone()), Some(60), None, None)
                .with_clock(clock);

        cache.snapshot().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        offset.store(59, Ordering::SeqCst);
        cache.snapshot().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        offset.store(60, Ordering::SeqCst);
        assert!(cache.is_stale().await);
        let snapshot = cache.snapshot().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(snapshot.generation, 2);

        // Expiry is measured from the latest refresh
        offset.store(119, Ordering::SeqCst);
        cache.snapshot().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        offset.store(125, Ordering::SeqCst);
        cache.snapshot().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_seeded_snapshot_with_past_expiration_refreshes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = PlacesCache::with_retriever(
            counting_retriever(calls.clone()),
            Some(3600),
            Some(vec![Place::new("B002", "Old")]),
            Some(Utc::now() - Duration::minutes(1)),
        );

        let snapshot = cache.snapshot().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(snapshot.places.len(), 2);
        assert!(cache.expires_at().await.unwrap() > Utc::now());
    }

    #[tokio::test]
    async fn test_seeded_snapshot_without_expiration_is_served() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = PlacesCache::with_retriever(
            counting_retriever(calls.clone()),
            None,
            Some(vec![Place::new("B002", "Old")]),
            None,
        );

        let snapshot = cache.snapshot().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(snapshot.places[0].code, "B002");
    }

    #[tokio::test]
    async fn test_failed_retrieval_keeps_previous_state() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let retriever: Arc<dyn PlacesRetriever> = Arc::new(move || {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 1 {
                    anyhow::bail!("source unavailable");
                }
                Ok(sample_places())
            }
        });
        let (clock, offset) = manual_clock();
        let cache = PlacesCache::with_retriever(retriever, Some(10), None, None).with_clock(clock);

        cache.snapshot().await.unwrap();
        let expires_at = cache.expires_at().await;

        offset.store(10, Ordering::SeqCst);
        let err = cache.snapshot().await.unwrap_err();
        assert!(matches!(err, ConnectorError::Retrieval(_)));
        assert_eq!(err.to_string(), "source unavailable");
        assert_eq!(cache.expires_at().await, expires_at);
        assert_eq!(cache.generation().await, 1);

        // Next call retries instead of staying failed
        let snapshot = cache.snapshot().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(snapshot.generation, 2);
    }

    #[tokio::test]
    async fn test_failed_first_retrieval_is_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let retriever: Arc<dyn PlacesRetriever> = Arc::new(move || {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    anyhow::bail!("timeout");
                }
                Ok(sample_places())
            }
        });
        let cache = PlacesCache::with_retriever(retriever, None, None, None);

        assert!(cache.snapshot().await.is_err());
        assert!(cache.is_stale().await);
        assert_eq!(cache.snapshot().await.unwrap().places.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_snapshots_retrieve_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let retriever: Arc<dyn PlacesRetriever> = Arc::new(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                Ok::<_, anyhow::Error>(sample_places())
            }
        });
        let cache = Arc::new(PlacesCache::with_retriever(retriever, Some(3600), None, None));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.snapshot().await.map(|s| s.generation) })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 1);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
