use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{debug, error};

use wall_types::api::{CountErrorResponse, CountResponse};

use crate::state::AppState;

/// How long a computed total is served before the database is asked again.
pub const COUNT_TTL: Duration = Duration::from_secs(15);

/// Time source for the cache, swappable in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[cfg(test)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += by;
    }
}

#[cfg(test)]
impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = *self.offset.lock().unwrap_or_else(|e| e.into_inner());
        self.base + offset
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedCount {
    value: u64,
    computed_at: Instant,
}

/// Short-lived cache in front of the total-count query.
///
/// There is no invalidation: a new submission shows up once the entry
/// expires. The lock is never held while recomputing, so a burst of
/// requests right after expiry may each recompute.
pub struct CountCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    slot: Mutex<Option<CachedCount>>,
}

impl CountCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            slot: Mutex::new(None),
        }
    }

    /// The cached value, if it is still fresh.
    pub fn peek(&self) -> Option<u64> {
        let now = self.clock.now();
        let slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        slot.filter(|c| now.duration_since(c.computed_at) < self.ttl)
            .map(|c| c.value)
    }

    /// Return the fresh cached value or run `compute` and cache its result.
    /// A failed `compute` leaves the previous entry alone.
    pub async fn get_count<F, Fut, E>(&self, compute: F) -> Result<u64, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<u64, E>>,
    {
        if let Some(value) = self.peek() {
            return Ok(value);
        }

        let value = compute().await?;
        let computed_at = self.clock.now();
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(CachedCount { value, computed_at });
        debug!("Submission count recomputed: {}", value);
        Ok(value)
    }
}

pub async fn get_submission_count(State(state): State<AppState>) -> Response {
    let db = state.clone();
    let result = state
        .count_cache
        .get_count(|| async move {
            tokio::task::spawn_blocking(move || db.db.count_all())
                .await
                .map_err(anyhow::Error::from)?
        })
        .await;

    match result {
        Ok(count) => Json(CountResponse { count }).into_response(),
        Err(e) => {
            error!("Error fetching submission count: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(CountErrorResponse {
                    error: "Failed to fetch submission count".into(),
                    count: 0,
                }),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(calls: &AtomicUsize, value: u64) -> impl Future<Output = Result<u64, ()>> + '_ {
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(value)
        }
    }

    #[tokio::test]
    async fn test_value_is_reused_within_ttl() {
        let clock = Arc::new(ManualClock::new());
        let cache = CountCache::with_clock(COUNT_TTL, clock.clone());
        let calls = AtomicUsize::new(0);

        assert_eq!(cache.get_count(|| counting(&calls, 7)).await, Ok(7));
        clock.advance(Duration::from_secs(14));
        // A different value from the source is not observed yet.
        assert_eq!(cache.get_count(|| counting(&calls, 8)).await, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recomputes_after_expiry() {
        let clock = Arc::new(ManualClock::new());
        let cache = CountCache::with_clock(COUNT_TTL, clock.clone());
        let calls = AtomicUsize::new(0);

        assert_eq!(cache.get_count(|| counting(&calls, 7)).await, Ok(7));
        clock.advance(Duration::from_secs(16));
        assert_eq!(cache.peek(), None);
        assert_eq!(cache.get_count(|| counting(&calls, 9)).await, Ok(9));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.peek(), Some(9));
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_entry() {
        let clock = Arc::new(ManualClock::new());
        let cache = CountCache::with_clock(COUNT_TTL, clock.clone());

        assert_eq!(cache.get_count(|| async { Ok::<_, &str>(3) }).await, Ok(3));
        clock.advance(Duration::from_secs(20));
        assert_eq!(cache.get_count(|| async { Err::<u64, _>("db down") }).await, Err("db down"));
        assert_eq!(cache.peek(), None);
        assert_eq!(cache.get_count(|| async { Ok::<_, &str>(4) }).await, Ok(4));
    }
}
