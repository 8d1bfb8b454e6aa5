//! Time-bounded metadata cache with single-flight refresh
//!
//! Shields the origin stream from client polling: a stored result is served
//! for `ttl` (10s by default) and concurrent misses share one upstream fetch.
//!
//! ## Refresh model
//!
//! ```text
//! miss, nothing in flight → spawn refresh task, remember its shared handle
//! miss, refresh in flight → await the same shared handle
//! refresh completes       → on success replace entry; clear in-flight slot
//! ```
//!
//! The refresh runs as its own tokio task, so it still populates the cache
//! when every caller awaiting it has gone away. A failed refresh leaves the
//! previous entry in place.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::fetcher::FetchError;
use crate::metadata::StreamMetadata;

/// Default time a stored result stays servable
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10);

type RefreshResult = Result<StreamMetadata, FetchError>;
type SharedRefresh = Shared<BoxFuture<'static, RefreshResult>>;

/// Last successful fetch, replaced wholesale on every success
#[derive(Debug, Clone)]
struct CacheEntry {
    data: StreamMetadata,
    stored_at: Instant,
}

#[derive(Default)]
struct CacheState {
    entry: Option<CacheEntry>,
    in_flight: Option<SharedRefresh>,
}

impl CacheState {
    fn fresh(&self, now: Instant, ttl: Duration) -> Option<StreamMetadata> {
        self.entry
            .as_ref()
            .filter(|entry| now.saturating_duration_since(entry.stored_at) < ttl)
            .map(|entry| entry.data.clone())
    }
}

/// Process-wide metadata cache handle.
///
/// Cloning shares the same underlying entry; create a new cache for an
/// isolated instance.
#[derive(Clone)]
pub struct MetadataCache {
    state: Arc<Mutex<CacheState>>,
    ttl: Duration,
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl MetadataCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState::default())),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached data if it was stored less than `ttl` before `now`
    pub fn get_fresh(&self, now: Instant) -> Option<StreamMetadata> {
        self.lock().fresh(now, self.ttl)
    }

    /// Last stored data regardless of age
    pub fn peek(&self) -> Option<StreamMetadata> {
        self.lock().entry.as_ref().map(|entry| entry.data.clone())
    }

    /// Age of the stored entry at `now`
    pub fn age(&self, now: Instant) -> Option<Duration> {
        self.lock()
            .entry
            .as_ref()
            .map(|entry| now.saturating_duration_since(entry.stored_at))
    }

    /// Serve from cache, or run `refresh` once for all concurrent misses.
    ///
    /// `refresh` is only called when no fresh entry exists and no refresh is
    /// already running. On success the entry is stored with `stored_at = now`.
    pub async fn get_or_refresh<F, Fut>(&self, now: Instant, refresh: F) -> RefreshResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RefreshResult> + Send + 'static,
    {
        let pending = {
            let mut state = self.lock();
            if let Some(hit) = state.fresh(now, self.ttl) {
                return Ok(hit);
            }

            if let Some(pending) = state.in_flight.clone() {
                debug!("Joining in-flight metadata refresh");
                pending
            } else {
                debug!("Metadata cache miss, starting refresh");
                let pending = self.spawn_refresh(now, refresh());
                state.in_flight = Some(pending.clone());
                pending
            }
        };

        pending.await
    }

    fn spawn_refresh<Fut>(&self, now: Instant, refresh: Fut) -> SharedRefresh
    where
        Fut: Future<Output = RefreshResult> + Send + 'static,
    {
        let state = Arc::clone(&self.state);
        let task = tokio::spawn(async move {
            // Frees the slot on every exit, including a panicking refresh
            let _slot = InFlightSlot(Arc::clone(&state));
            let result = refresh.await;

            if let Ok(data) = &result {
                state.lock().unwrap_or_else(PoisonError::into_inner).entry = Some(CacheEntry {
                    data: data.clone(),
                    stored_at: now,
                });
            }
            result
        });

        async move {
            task.await.unwrap_or_else(|e| {
                Err(FetchError::Transport(format!(
                    "metadata refresh task failed: {}",
                    e
                )))
            })
        }
        .boxed()
        .shared()
    }
}

/// Clears `in_flight` when the refresh task finishes or unwinds.
///
/// The caller holds the lock while registering the task, so the slot is
/// always set by the time this runs.
struct InFlightSlot(Arc<Mutex<CacheState>>);

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .in_flight = None;
    }
}
