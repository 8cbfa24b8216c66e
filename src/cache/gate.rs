//! Single-flight refresh in front of a [`TtlCache`].

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

use super::TtlCache;

/// How a value returned by [`CacheGate::get_or_refresh`] was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Served from a live cache entry.
    Hit,
    /// This caller ran the refresh.
    Refreshed,
    /// Another caller's in-flight refresh was awaited.
    Joined,
}

impl CacheOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheOutcome::Hit => "hit",
            CacheOutcome::Refreshed => "refreshed",
            CacheOutcome::Joined => "joined",
        }
    }
}

#[derive(Debug, Error)]
pub enum RefreshError<E: std::error::Error + 'static> {
    #[error(transparent)]
    Failed(Arc<E>),

    #[error("refresh task did not complete: {0}")]
    Aborted(String),
}

impl<E: std::error::Error + 'static> Clone for RefreshError<E> {
    fn clone(&self) -> Self {
        match self {
            RefreshError::Failed(err) => RefreshError::Failed(err.clone()),
            RefreshError::Aborted(reason) => RefreshError::Aborted(reason.clone()),
        }
    }
}

type SharedRefresh<V, E> = Shared<BoxFuture<'static, Result<V, RefreshError<E>>>>;
type InFlight<V, E> = Arc<Mutex<HashMap<String, SharedRefresh<V, E>>>>;

/// Clears the in-flight registration of a key, even if the refresh panics.
struct InFlightGuard<V, E: std::error::Error + 'static> {
    in_flight: InFlight<V, E>,
    key: String,
}

impl<V, E: std::error::Error + 'static> Drop for InFlightGuard<V, E> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

/// Serves cached values and makes sure that, per key, at most one refresh is
/// running at any time. Concurrent misses on the same key await the refresh
/// already in flight instead of starting their own.
///
/// Refreshes run on their own task: a caller going away does not cancel
/// them, and a successful result is still written to the cache.
pub struct CacheGate<V, E: std::error::Error + 'static> {
    cache: TtlCache<V>,
    in_flight: InFlight<V, E>,
}

impl<V, E: std::error::Error + 'static> Clone for CacheGate<V, E> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            in_flight: self.in_flight.clone(),
        }
    }
}

impl<V, E> CacheGate<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    pub fn new(cache: TtlCache<V>) -> Self {
        Self {
            cache,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn cache(&self) -> &TtlCache<V> {
        &self.cache
    }

    /// Returns the cached value for `key`, running `refresh` on a miss.
    ///
    /// A successful refresh is stored with `ttl`; a failed one leaves the
    /// cache untouched and is reported to every caller that awaited it.
    pub async fn get_or_refresh<F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        refresh: F,
    ) -> Result<(V, CacheOutcome), RefreshError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        if let Some(value) = self.cache.get(key) {
            return Ok((value, CacheOutcome::Hit));
        }

        let (pending, outcome) = {
            let mut in_flight = self
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            if let Some(pending) = in_flight.get(key) {
                debug!("Joining in-flight refresh of {}", key);
                (pending.clone(), CacheOutcome::Joined)
            } else if let Some(value) = self.cache.get(key) {
                // A refresh completed between the first lookup and taking the lock.
                return Ok((value, CacheOutcome::Hit));
            } else {
                let pending = self.start_refresh(key, ttl, refresh());
                in_flight.insert(key.to_string(), pending.clone());
                (pending, CacheOutcome::Refreshed)
            }
        };

        pending.await.map(|value| (value, outcome))
    }

    fn start_refresh<Fut>(&self, key: &str, ttl: Duration, refresh: Fut) -> SharedRefresh<V, E>
    where
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let cache = self.cache.clone();
        let guard = InFlightGuard {
            in_flight: self.in_flight.clone(),
            key: key.to_string(),
        };

        let task = tokio::spawn(async move {
            let result = refresh.await;
            if let Ok(value) = &result {
                cache.set(&guard.key, value.clone(), ttl);
            }
            // The entry must be visible in the cache before the key stops
            // being in flight.
            drop(guard);
            result.map_err(|err| RefreshError::Failed(Arc::new(err)))
        });

        async move {
            match task.await {
                Ok(result) => result,
                Err(join_error) => {
                    error!("Cache refresh task failed: {}", join_error);
                    Err(RefreshError::Aborted(join_error.to_string()))
                }
            }
        }
        .boxed()
        .shared()
    }
}
