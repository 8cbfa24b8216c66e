mod gate;
mod ttl_cache;

pub use gate::{CacheGate, CacheOutcome, RefreshError};
pub use ttl_cache::{TtlCache, DEFAULT_SWEEP_INTERVAL, MAX_TTL};
