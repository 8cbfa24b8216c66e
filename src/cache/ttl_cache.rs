//! In-memory key/value cache with per-entry expiry.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

/// Default interval between two sweeps of expired entries.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Longer TTLs are clamped to this, so the expiry instant never overflows.
pub const MAX_TTL: Duration = Duration::from_secs(86400 * 365 * 30);

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

type Entries<V> = HashMap<String, CacheEntry<V>>;

/// Readers share the lock, writers and the sweeper take it exclusively.
///
/// `get` never returns an entry past its expiry, whether or not the sweeper
/// has removed it yet. Cloning the cache yields another handle to the same
/// entries.
pub struct TtlCache<V> {
    entries: Arc<RwLock<Entries<V>>>,
}

impl<V> Clone for TtlCache<V> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<V> Default for TtlCache<V> {
    fn default() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(key)?;
        if entry.is_expired(Instant::now()) {
            return None;
        }
        Some(entry.value.clone())
    }

    pub fn set(&self, key: &str, value: V, ttl: Duration) {
        let expires_at = Instant::now() + ttl.min(MAX_TTL);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), CacheEntry { value, expires_at });
    }

    pub fn delete(&self, key: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    /// Physically drops expired entries and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        Self::purge(&self.entries)
    }

    /// Number of stored entries, expired-but-unswept ones included.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn purge(entries: &RwLock<Entries<V>>) -> usize {
        let now = Instant::now();
        let mut entries = entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }
}

impl<V: Clone + Send + Sync + 'static> TtlCache<V> {
    /// Spawns the housekeeping task. It only holds a weak reference and ends
    /// on its own once every handle to the cache is dropped.
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let entries: Weak<RwLock<Entries<V>>> = Arc::downgrade(&self.entries);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);

            // Skip the first immediate tick, wait for the first interval
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(live) = entries.upgrade() else {
                    debug!("Cache dropped, stopping sweeper");
                    break;
                };
                let removed = Self::purge(&live);
                if removed > 0 {
                    debug!("Swept {} expired cache entries", removed);
                }
            }
        })
    }
}
