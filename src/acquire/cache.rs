//! Per-domain TTL cache cells.
//!
//! Each domain owns one [`TtlCache`] passed into the orchestrator, so tests
//! can build a fresh cache (and drive it with paused tokio time) instead of
//! sharing a hidden global. The cell's mutex is held across the refresh, so
//! concurrent callers wait for one refresh instead of racing to fill it. A
//! failed refresh can leave a stand-in held for a short window, so callers
//! queued behind an outage are answered from it instead of re-running the
//! refresh one after another.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

// ---

#[derive(Debug)]
struct CacheEntry<T> {
    payload: Arc<T>,
    fetched_at: Instant,
    /// Shorter than the cache TTL for stand-ins held after a failed refresh.
    lifetime: Option<Duration>,
}

impl<T> CacheEntry<T> {
    fn new(payload: Arc<T>) -> Self {
        Self {
            payload,
            fetched_at: Instant::now(),
            lifetime: None,
        }
    }

    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < self.lifetime.map_or(ttl, |hold| hold.min(ttl))
    }
}

/// A single cache slot with a fixed time-to-live.
#[derive(Debug)]
pub struct TtlCache<T> {
    ttl: Duration,
    cell: Mutex<Option<CacheEntry<T>>>,
}

impl<T> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            cell: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached payload, if one exists and is still fresh.
    pub async fn fresh(&self) -> Option<Arc<T>> {
        let cell = self.cell.lock().await;
        cell.as_ref()
            .filter(|entry| entry.is_fresh(self.ttl))
            .map(|entry| Arc::clone(&entry.payload))
    }

    pub async fn invalidate(&self) {
        *self.cell.lock().await = None;
    }

    /// Return the fresh payload, or run `refresh` and cache its `Ok` value.
    ///
    /// `force` skips the freshness check. An `Err` from `refresh` leaves the
    /// previous entry in place and is handed back to the caller.
    pub async fn get_or_try_refresh<F, Fut, E>(&self, force: bool, refresh: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        // ---
        let mut cell = self.cell.lock().await;

        if !force {
            if let Some(entry) = cell.as_ref().filter(|e| e.is_fresh(self.ttl)) {
                tracing::debug!("cache hit ({:?} old)", entry.fetched_at.elapsed());
                return Ok(Arc::clone(&entry.payload));
            }
        }

        let payload = Arc::new(refresh().await?);
        *cell = Some(CacheEntry::new(Arc::clone(&payload)));
        Ok(payload)
    }

    /// Like [`TtlCache::get_or_try_refresh`], but a failed refresh is answered
    /// with `fallback(err)`, and that stand-in is held for `hold` (capped at
    /// the TTL) so callers waiting on the lock get it without refreshing again.
    pub async fn get_or_refresh_or_hold<F, Fut, E, B>(
        &self,
        force: bool,
        hold: Duration,
        refresh: F,
        fallback: B,
    ) -> Arc<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        B: FnOnce(E) -> T,
    {
        // ---
        let mut cell = self.cell.lock().await;

        if !force {
            if let Some(entry) = cell.as_ref().filter(|e| e.is_fresh(self.ttl)) {
                tracing::debug!("cache hit ({:?} old)", entry.fetched_at.elapsed());
                return Arc::clone(&entry.payload);
            }
        }

        let (payload, lifetime) = match refresh().await {
            Ok(payload) => (Arc::new(payload), None),
            Err(err) => (Arc::new(fallback(err)), Some(hold)),
        };
        *cell = Some(CacheEntry {
            lifetime,
            ..CacheEntry::new(Arc::clone(&payload))
        });
        payload
    }

    /// Infallible form of [`TtlCache::get_or_try_refresh`].
    pub async fn get_or_refresh<F, Fut>(&self, force: bool, refresh: F) -> Arc<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let result: Result<Arc<T>, std::convert::Infallible> = self
            .get_or_try_refresh(force, || async { Ok(refresh().await) })
            .await;
        match result {
            Ok(payload) => payload,
            Err(never) => match never {},
        }
    }
}

/// TTL cache with one slot per key (historical queries).
#[derive(Debug)]
pub struct KeyedTtlCache<K, T> {
    ttl: Duration,
    cells: Mutex<HashMap<K, CacheEntry<T>>>,
}

impl<K: Eq + Hash, T> KeyedTtlCache<K, T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            cells: Mutex::new(HashMap::new()),
        }
    }

    pub async fn fresh(&self, key: &K) -> Option<Arc<T>> {
        let cells = self.cells.lock().await;
        cells
            .get(key)
            .filter(|entry| entry.is_fresh(self.ttl))
            .map(|entry| Arc::clone(&entry.payload))
    }

    pub async fn insert(&self, key: K, payload: T) -> Arc<T> {
        // ---
        let payload = Arc::new(payload);
        let mut cells = self.cells.lock().await;
        // Drop anything expired while we hold the lock
        let ttl = self.ttl;
        cells.retain(|_, entry| entry.is_fresh(ttl));
        cells.insert(key, CacheEntry::new(Arc::clone(&payload)));
        payload
    }

    pub async fn clear(&self) {
        self.cells.lock().await.clear();
    }
}
