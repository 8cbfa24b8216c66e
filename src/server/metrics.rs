use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, GaugeVec, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

use crate::catalog::{Catalog, ResourceKind};

/// Metric name prefix for all service metrics
const PREFIX: &str = "ccloud_sd";

const COLLECTED_KINDS: [ResourceKind; 5] = [
    ResourceKind::Kafka,
    ResourceKind::SchemaRegistry,
    ResourceKind::Ksql,
    ResourceKind::ComputePool,
    ResourceKind::Connector,
];

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Collection Metrics
    pub static ref COLLECTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_collections_total"), "Upstream collection runs by outcome"),
        &["outcome"]
    ).expect("Failed to create collections_total metric");

    pub static ref COLLECTION_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            format!("{PREFIX}_collection_duration_seconds"),
            "Duration of a full upstream collection in seconds"
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0])
    ).expect("Failed to create collection_duration_seconds metric");

    pub static ref CATALOG_RESOURCES: GaugeVec = GaugeVec::new(
        Opts::new(format!("{PREFIX}_catalog_resources"), "Resources in the last collected catalog"),
        &["kind"]
    ).expect("Failed to create catalog_resources metric");

    pub static ref SKIPPED_FETCHES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_skipped_fetches_total"), "Failed sub-fetches skipped during collection"),
        &["kind"]
    ).expect("Failed to create skipped_fetches_total metric");

    // Cache Metrics
    pub static ref CACHE_LOOKUPS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_cache_lookups_total"), "Catalog cache lookups by outcome"),
        &["outcome"]
    ).expect("Failed to create cache_lookups_total metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(COLLECTIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(COLLECTION_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(CATALOG_RESOURCES.clone()));
    let _ = REGISTRY.register(Box::new(SKIPPED_FETCHES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(CACHE_LOOKUPS_TOTAL.clone()));

    tracing::info!("Metrics system initialized successfully");
}

pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

/// Records a finished collection. `catalog` is `None` when it failed.
pub fn record_collection(catalog: Option<&Catalog>, duration: Duration) {
    COLLECTION_DURATION_SECONDS.observe(duration.as_secs_f64());

    let Some(catalog) = catalog else {
        COLLECTIONS_TOTAL.with_label_values(&["failed"]).inc();
        return;
    };

    let outcome = if catalog.is_degraded() {
        "degraded"
    } else {
        "complete"
    };
    COLLECTIONS_TOTAL.with_label_values(&[outcome]).inc();

    for kind in COLLECTED_KINDS {
        CATALOG_RESOURCES
            .with_label_values(&[kind.as_str()])
            .set(catalog.count_of(kind) as f64);
    }
}

pub fn record_skipped_fetch(kind: &str) {
    SKIPPED_FETCHES_TOTAL.with_label_values(&[kind]).inc();
}

pub fn record_cache_lookup(outcome: &str) {
    CACHE_LOOKUPS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_else(|_| String::from(""));
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
