//! Result cache with single-flight computation.
//!
//! # Architecture
//!
//! ```text
//! get_or_compute(key, compute)
//!      │
//!      ├─► ResultStore::get(key) ── hit ──► (entry, Hit)
//!      │
//!      ├─► in-flight map has key? ── yes ──► await shared task (Joined)
//!      │
//!      └─► spawn task: re-check store ─► compute ─► ResultStore::set
//!                 │
//!                 └─► every caller awaits the same task (Computed)
//! ```
//!
//! The computation runs as a detached task, so a caller that goes away
//! does not cancel it and the result still reaches the store. The in-flight
//! map is locked only to register or remove a computation.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt, Shared};
use storage::ResultStore;
use tracing::{debug, instrument, warn};

use crate::error::{DelineationError, Result};
use crate::types::CacheEntry;

/// How a cached result was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Read from the result store.
    Hit,
    /// Computed by this caller's request.
    Computed,
    /// Shared from a computation another request started.
    Joined,
}

type Computation = Shared<BoxFuture<'static, Result<(Arc<CacheEntry>, bool)>>>;
type InFlight = Arc<Mutex<HashMap<String, Computation>>>;

/// Derive the cache key of a request.
///
/// Coordinates are rounded to `precision` decimals. Without snapping, or
/// with a zero radius, the key always reads `snap=false|r=0`.
pub fn cache_key(lat: f64, lon: f64, snap: bool, radius: i64, precision: usize) -> String {
    let (snap, radius) = if snap && radius > 0 {
        (true, radius)
    } else {
        (false, 0)
    };
    format!(
        "{:.*},{:.*}|snap={}|r={}",
        precision, lat, precision, lon, snap, radius
    )
}

/// Cache of delineation results keyed by request.
pub struct ResultCache {
    store: Option<Arc<dyn ResultStore>>,
    in_flight: InFlight,
    precision: usize,
}

impl ResultCache {
    /// Cache backed by a result store.
    pub fn new(store: Arc<dyn ResultStore>, precision: usize) -> Self {
        Self {
            store: Some(store),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            precision,
        }
    }

    /// Cache that never stores anything; concurrent identical requests are
    /// still computed once.
    pub fn disabled(precision: usize) -> Self {
        Self {
            store: None,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            precision,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Name of the storage backend, if caching is enabled.
    pub fn backend_name(&self) -> Option<&'static str> {
        self.store.as_ref().map(|s| s.name())
    }

    pub fn key(&self, lat: f64, lon: f64, snap: bool, radius: i64) -> String {
        cache_key(lat, lon, snap, radius, self.precision)
    }

    /// Number of computations currently running.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Return the stored entry for `key`, or compute it exactly once no
    /// matter how many callers ask concurrently.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: &str,
        compute: F,
    ) -> Result<(Arc<CacheEntry>, CacheOutcome)>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<CacheEntry>> + Send + 'static,
    {
        if let Some(store) = &self.store {
            if let Some(entry) = lookup(store.as_ref(), key).await {
                return Ok((Arc::new(entry), CacheOutcome::Hit));
            }
        }

        let (computation, leader) = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            match in_flight.get(key) {
                Some(running) => (running.clone(), false),
                None => {
                    let guard = InFlightGuard {
                        in_flight: self.in_flight.clone(),
                        key: key.to_string(),
                    };
                    let handle = tokio::spawn(compute_and_store(
                        self.store.clone(),
                        key.to_string(),
                        compute,
                        guard,
                    ));
                    let computation = async move {
                        match handle.await {
                            Ok(result) => result,
                            Err(e) => Err(DelineationError::from(e)),
                        }
                    }
                    .boxed()
                    .shared();
                    in_flight.insert(key.to_string(), computation.clone());
                    (computation, true)
                }
            }
        };

        let (entry, from_store) = computation.await?;
        let outcome = match (leader, from_store) {
            (false, _) => CacheOutcome::Joined,
            (true, true) => CacheOutcome::Hit,
            (true, false) => CacheOutcome::Computed,
        };
        Ok((entry, outcome))
    }

    /// Remove one stored result. Returns whether it existed.
    pub async fn invalidate(&self, key: &str) -> Result<bool> {
        match &self.store {
            Some(store) => Ok(store.delete(key).await?),
            None => Ok(false),
        }
    }

    /// Remove every stored result. Returns the number removed.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<u64> {
        match &self.store {
            Some(store) => {
                let count = store.clear().await?;
                debug!(count, "Result cache cleared");
                Ok(count)
            }
            None => Ok(0),
        }
    }
}

/// Removes a computation from the in-flight map when its task ends,
/// including by panic.
struct InFlightGuard {
    in_flight: InFlight,
    key: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.key);
    }
}

async fn compute_and_store<F, Fut>(
    store: Option<Arc<dyn ResultStore>>,
    key: String,
    compute: F,
    _guard: InFlightGuard,
) -> Result<(Arc<CacheEntry>, bool)>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<CacheEntry>> + Send + 'static,
{
    // A computation for this key may have finished between our lookup and
    // registration
    if let Some(store) = &store {
        if let Some(entry) = lookup(store.as_ref(), &key).await {
            return Ok((Arc::new(entry), true));
        }
    }

    let entry = compute().await?;

    if let Some(store) = &store {
        match serde_json::to_vec(&entry) {
            Ok(bytes) => match store.set(&key, Bytes::from(bytes)).await {
                Ok(()) => debug!(key = %key, backend = store.name(), "Stored result"),
                Err(e) => warn!(key = %key, error = %e, "Failed to store result"),
            },
            Err(e) => warn!(key = %key, error = %e, "Failed to serialize result"),
        }
    }

    Ok((Arc::new(entry), false))
}

/// Stored entry for a key. Read and decode failures count as misses.
async fn lookup(store: &dyn ResultStore, key: &str) -> Option<CacheEntry> {
    match store.get(key).await {
        Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(key, error = %e, "Discarding undecodable stored result");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            warn!(key, error = %e, "Result store read failed, treating as miss");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geojson::Geometry;
    use crate::types::{PourPoint, Watershed, WatershedStats};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use storage::{MemoryResultStore, StorageError, StorageResult};
    use terrain_grid::Pixel;

    fn entry(key: &str) -> CacheEntry {
        CacheEntry {
            key: key.to_string(),
            watershed: Watershed {
                geometry: Geometry::from_parts(vec![vec![vec![
                    [0.0, 0.0],
                    [1.0, 0.0],
                    [1.0, 1.0],
                    [0.0, 0.0],
                ]]]),
                stats: WatershedStats {
                    area_km2: 1.0,
                    area_mi2: 0.3861,
                    area_m2: 1e6,
                    perimeter_km: 4.0,
                    perimeter_m: 4000.0,
                    elevation_min_m: Some(1.0),
                    elevation_max_m: Some(2.0),
                    elevation_mean_m: Some(1.5),
                    elevation_std_m: Some(0.5),
                    num_cells: 2,
                },
                warnings: vec![],
            },
            pour_point: PourPoint {
                original_lon: 0.0,
                original_lat: 0.0,
                lon: 0.0,
                lat: 0.0,
                snapped: false,
                snap_distance_m: 0.0,
                flow_accumulation: Some(2.0),
                pixel: Pixel::new(0, 0),
            },
            computation_seconds: 0.05,
            created_at: Utc::now(),
        }
    }

    struct FailingStore;

    #[async_trait]
    impl ResultStore for FailingStore {
        fn name(&self) -> &'static str {
            "failing"
        }
        async fn get(&self, _key: &str) -> StorageResult<Option<Bytes>> {
            Err(StorageError::read("unreachable"))
        }
        async fn set(&self, _key: &str, _value: Bytes) -> StorageResult<()> {
            Err(StorageError::write("unreachable"))
        }
        async fn exists(&self, _key: &str) -> StorageResult<bool> {
            Err(StorageError::read("unreachable"))
        }
        async fn delete(&self, _key: &str) -> StorageResult<bool> {
            Err(StorageError::write("unreachable"))
        }
        async fn clear(&self) -> StorageResult<u64> {
            Err(StorageError::write("unreachable"))
        }
    }

    #[test]
    fn test_key_precision() {
        assert_eq!(
            cache_key(37.774900, -122.4194, true, 100, 6),
            cache_key(37.7749001, -122.4194, true, 100, 6)
        );
        assert_eq!(
            cache_key(37.7749, -122.4194, true, 100, 6),
            "37.774900,-122.419400|snap=true|r=100"
        );
        assert_ne!(
            cache_key(37.7749, -122.4194, true, 100, 6),
            cache_key(37.7749, -122.4194, true, 200, 6)
        );
    }

    #[test]
    fn test_key_without_snap() {
        assert_eq!(
            cache_key(1.0, 2.0, false, 250, 2),
            "1.00,2.00|snap=false|r=0"
        );
        assert_eq!(cache_key(1.0, 2.0, true, 0, 2), cache_key(1.0, 2.0, false, 0, 2));
    }

    #[tokio::test]
    async fn test_compute_then_hit() {
        let cache = ResultCache::new(Arc::new(MemoryResultStore::new(8)), 6);
        let calls = Arc::new(AtomicUsize::new(0));

        let mut results = Vec::new();
        for _ in 0..2 {
            let calls = calls.clone();
            results.push(
                cache
                    .get_or_compute("k", move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(entry("k"))
                    })
                    .await
                    .unwrap(),
            );
        }

        assert_eq!(results[0].1, CacheOutcome::Computed);
        assert_eq!(results[1].1, CacheOutcome::Hit);
        assert_eq!(results[0].0.watershed, results[1].0.watershed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.in_flight_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_single_flight() {
        let cache = Arc::new(ResultCache::new(Arc::new(MemoryResultStore::new(8)), 6));
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let calls = calls.clone();
                tokio::spawn(async move {
                    cache
                        .get_or_compute("same", move || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(100)).await;
                            Ok(entry("same"))
                        })
                        .await
                })
            })
            .collect();

        let mut computed = 0;
        for task in futures::future::join_all(tasks).await {
            let (result, outcome) = task.unwrap().unwrap();
            assert_eq!(result.key, "same");
            if outcome == CacheOutcome::Computed {
                computed += 1;
            }
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(computed <= 1);
    }

    #[tokio::test]
    async fn test_abandoned_caller_still_stores() {
        let store = Arc::new(MemoryResultStore::new(8));
        let cache = ResultCache::new(store.clone(), 6);

        let abandoned = tokio::time::timeout(
            Duration::from_millis(10),
            cache.get_or_compute("slow", || async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(entry("slow"))
            }),
        )
        .await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(store.exists("slow").await.unwrap());
        assert_eq!(cache.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_failure_is_shared_and_not_stored() {
        let store = Arc::new(MemoryResultStore::new(8));
        let cache = ResultCache::new(store.clone(), 6);

        let err = cache
            .get_or_compute("bad", || async {
                Err(DelineationError::out_of_coverage("nodata"))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DelineationError::OutOfCoverage(_)));
        assert!(!store.exists("bad").await.unwrap());

        // The next request computes again
        let (_, outcome) = cache
            .get_or_compute("bad", || async { Ok(entry("bad")) })
            .await
            .unwrap();
        assert_eq!(outcome, CacheOutcome::Computed);
    }

    #[tokio::test]
    async fn test_store_failures_do_not_fail_requests() {
        let cache = ResultCache::new(Arc::new(FailingStore), 6);
        let (_, outcome) = cache
            .get_or_compute("k", || async { Ok(entry("k")) })
            .await
            .unwrap();
        assert_eq!(outcome, CacheOutcome::Computed);
        assert!(cache.clear().await.is_err());
    }

    #[tokio::test]
    async fn test_disabled_cache_always_computes() {
        let cache = ResultCache::disabled(6);
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = calls.clone();
            let (_, outcome) = cache
                .get_or_compute("k", move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(entry("k"))
                })
                .await
                .unwrap();
            assert_eq!(outcome, CacheOutcome::Computed);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(!cache.is_enabled());
        assert_eq!(cache.clear().await.unwrap(), 0);
        assert!(!cache.invalidate("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_invalidate() {
        let store = Arc::new(MemoryResultStore::new(8));
        let cache = ResultCache::new(store.clone(), 6);
        cache
            .get_or_compute("k", || async { Ok(entry("k")) })
            .await
            .unwrap();

        assert!(cache.invalidate("k").await.unwrap());
        assert!(!store.exists("k").await.unwrap());
        assert_eq!(cache.backend_name(), Some("memory"));
    }
}
