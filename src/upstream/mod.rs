//! Access to the Confluent Cloud management API.

mod client;
pub mod models;

pub use client::{
    ConfluentClient, UpstreamSettings, COMPUTE_POOLS_PATH, DEFAULT_BASE_URL, ENVIRONMENTS_PATH,
    KAFKA_CLUSTERS_PATH, KSQL_CLUSTERS_PATH, SCHEMA_REGISTRY_PATH,
};
pub use models::{
    ComputePoolRecord, EnvironmentRecord, KafkaClusterRecord, KsqlClusterRecord, Page,
    RegionField, SchemaRegistryRecord,
};

use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by a single upstream call.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request to {path} failed: {source}")]
    Request {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{path} returned non-success status {status}: {body}")]
    Status {
        path: String,
        status: u16,
        body: String,
    },

    #[error("failed to decode {path} response: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path} returned the same page token twice ({token})")]
    StalledPagination { path: String, token: String },
}

/// One call per upstream page.
///
/// Paginated listings take the continuation token of the previous page
/// (`None` for the first page) and report the next one in [`Page`].
#[async_trait]
pub trait UpstreamApi: Send + Sync {
    async fn list_environments(
        &self,
        page_token: Option<&str>,
    ) -> Result<Page<EnvironmentRecord>, UpstreamError>;

    async fn list_kafka_clusters(
        &self,
        environment_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<KafkaClusterRecord>, UpstreamError>;

    async fn list_schema_registries(
        &self,
        environment_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<SchemaRegistryRecord>, UpstreamError>;

    async fn list_ksql_clusters(
        &self,
        environment_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<KsqlClusterRecord>, UpstreamError>;

    async fn list_compute_pools(
        &self,
        environment_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<ComputePoolRecord>, UpstreamError>;

    /// Connector names of one Kafka cluster. Not paginated.
    async fn list_connectors(
        &self,
        environment_id: &str,
        cluster_id: &str,
    ) -> Result<Vec<String>, UpstreamError>;
}
