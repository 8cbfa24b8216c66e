//! Shared constants for end-to-end tests

// ============================================================================
// Credentials
// ============================================================================

/// API key the fake upstream accepts
pub const API_KEY: &str = "test-key";

/// API secret the fake upstream accepts
pub const API_SECRET: &str = "test-secret";

/// `Authorization` header value the fake upstream expects (basic auth of the above)
pub const UPSTREAM_BASIC_AUTH: &str = "Basic dGVzdC1rZXk6dGVzdC1zZWNyZXQ=";

/// Bearer token the discovery endpoint requires
pub const BEARER_TOKEN: &str = "scrape-token";

// ============================================================================
// Upstream paths
// ============================================================================

pub const ENVIRONMENTS_PATH: &str = "/org/v2/environments";
pub const KAFKA_CLUSTERS_PATH: &str = "/cmk/v2/clusters";
pub const SCHEMA_REGISTRY_PATH: &str = "/srcm/v2/clusters";
pub const KSQL_CLUSTERS_PATH: &str = "/ksqldbcm/v2/clusters";
pub const COMPUTE_POOLS_PATH: &str = "/fcpm/v2/compute-pools";

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for a server to become ready
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Interval between readiness checks
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 10;

/// Timeout for HTTP requests in tests
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
