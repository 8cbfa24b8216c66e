use std::time::Duration;

use super::RequestsLoggingLevel;
use crate::cache::DEFAULT_SWEEP_INTERVAL;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    /// Port of the Prometheus metrics listener, 0 disables it.
    pub metrics_port: u16,
    pub cache_ttl: Duration,
    pub cache_sweep_interval: Duration,
    /// Token expected in `Authorization: Bearer <token>` on /discovery.
    /// If None, discovery requests are not authenticated.
    pub bearer_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 8080,
            metrics_port: 9091,
            cache_ttl: DEFAULT_CACHE_TTL,
            cache_sweep_interval: DEFAULT_SWEEP_INTERVAL,
            bearer_token: None,
        }
    }
}
