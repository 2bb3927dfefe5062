use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use super::manager::{CacheSnapshot, PlacesCache};
use crate::error::ConnectorError;
use crate::filter::FilterChain;
use crate::models::Place;

/// A view's filtered copy of the shared snapshot.
///
/// Filtering runs once per cache generation: queries between two refreshes
/// reuse the stored result.
#[derive(Debug, Default)]
pub struct FilteredSnapshot {
    latest: Mutex<Option<CacheSnapshot>>,
}

impl FilteredSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places of `cache` passing every link of `chain`, refreshing the
    /// cache if needed.
    pub async fn places(
        &self,
        cache: &PlacesCache,
        chain: &FilterChain,
    ) -> Result<Arc<[Place]>, ConnectorError> {
        let snapshot = cache.snapshot().await?;
        if chain.is_unrestricted() {
            return Ok(snapshot.places);
        }

        let mut latest = self.latest.lock().await;
        if let Some(ref filtered) = *latest {
            if filtered.generation == snapshot.generation {
                return Ok(filtered.places.clone());
            }
            // A concurrent caller already stored a newer generation
            if filtered.generation > snapshot.generation {
                return Ok(Arc::from(chain.apply(&snapshot.places)));
            }
        }

        let places: Arc<[Place]> = Arc::from(chain.apply(&snapshot.places));
        debug!(
            generation = snapshot.generation,
            total = snapshot.places.len(),
            kept = places.len(),
            links = chain.links().len(),
            "Filtered places snapshot"
        );
        *latest = Some(CacheSnapshot {
            generation: snapshot.generation,
            places: places.clone(),
        });
        Ok(places)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PlacesRetriever;
    use crate::filter::FilterCriteria;
    use crate::models::CodeMatcher;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn places() -> Vec<Place> {
        vec![
            Place::new("H501", "Roma").with_province("RM"),
            Place::new("Z110", "Francia"),
        ]
    }

    #[tokio::test]
    async fn test_filters_once_per_generation() {
        let cache = PlacesCache::from_places(places());
        let filtered = FilteredSnapshot::new();
        let countries = FilterChain::new(FilterCriteria {
            code_matcher: Some(CodeMatcher::Country),
            ..Default::default()
        });

        let first = filtered.places(&cache, &countries).await.unwrap();
        let second = filtered.places(&cache, &countries).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].code, "Z110");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_unrestricted_shares_cache_snapshot() {
        let cache = PlacesCache::from_places(places());
        let filtered = FilteredSnapshot::new();

        let via_view = filtered.places(&cache, &FilterChain::default()).await.unwrap();
        let direct = cache.snapshot().await.unwrap().places;
        assert!(Arc::ptr_eq(&via_view, &direct));
    }

    #[tokio::test]
    async fn test_refiltered_after_refresh() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let retriever: Arc<dyn PlacesRetriever> = Arc::new(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                let mut list = places();
                if n > 0 {
                    list.push(Place::new("Z404", "Narnia"));
                }
                Ok::<_, anyhow::Error>(list)
            }
        });
        // Zero lifetime: every call refreshes
        let cache = PlacesCache::with_retriever(retriever, Some(0), None, None);
        let filtered = FilteredSnapshot::new();
        let countries = FilterChain::new(FilterCriteria {
            code_matcher: Some(CodeMatcher::Country),
            ..Default::default()
        });

        assert_eq!(filtered.places(&cache, &countries).await.unwrap().len(), 1);
        assert_eq!(filtered.places(&cache, &countries).await.unwrap().len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
