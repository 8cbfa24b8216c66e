//! HTTP client for the Confluent Cloud management API.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::models::{
    ComputePoolRecord, EnvironmentRecord, KafkaClusterRecord, KsqlClusterRecord, ListResponse,
    Page, SchemaRegistryRecord,
};
use super::{UpstreamApi, UpstreamError};

pub const DEFAULT_BASE_URL: &str = "https://api.confluent.cloud";

pub const ENVIRONMENTS_PATH: &str = "/org/v2/environments";
pub const KAFKA_CLUSTERS_PATH: &str = "/cmk/v2/clusters";
pub const SCHEMA_REGISTRY_PATH: &str = "/srcm/v2/clusters";
pub const KSQL_CLUSTERS_PATH: &str = "/ksqldbcm/v2/clusters";
pub const COMPUTE_POOLS_PATH: &str = "/fcpm/v2/compute-pools";

#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    pub base_url: String,
    pub api_key: String,
    pub api_secret: String,
    pub request_timeout: Duration,
    pub page_size: u32,
}

impl UpstreamSettings {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            request_timeout: Duration::from_secs(30),
            page_size: 100,
        }
    }
}

/// Basic-auth client for the Confluent Cloud listings the collector needs.
pub struct ConfluentClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    page_size: u32,
}

impl ConfluentClient {
    pub fn new(settings: UpstreamSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        // Ensure base_url doesn't have trailing slash
        let base_url = settings.base_url.trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            api_key: settings.api_key,
            api_secret: settings.api_secret,
            page_size: settings.page_size,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Performs an authenticated GET and returns the body of a 200 response.
    async fn get_body(&self, path: &str, query: &[(&str, String)]) -> Result<String, UpstreamError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .query(query)
            .send()
            .await
            .map_err(|source| UpstreamError::Request {
                path: path.to_string(),
                source,
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| UpstreamError::Request {
                path: path.to_string(),
                source,
            })?;

        if status != reqwest::StatusCode::OK {
            return Err(UpstreamError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, UpstreamError> {
        let body = self.get_body(path, query).await?;
        serde_json::from_str(&body).map_err(|source| UpstreamError::Decode {
            path: path.to_string(),
            source,
        })
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        environment_id: Option<&str>,
        page_token: Option<&str>,
    ) -> Result<Page<T>, UpstreamError> {
        let mut query = vec![("page_size", self.page_size.to_string())];
        if let Some(environment_id) = environment_id {
            query.push(("environment", environment_id.to_string()));
        }
        if let Some(token) = page_token {
            query.push(("page_token", token.to_string()));
        }

        debug!("GET {} (environment={:?}, page_token={:?})", path, environment_id, page_token);
        let response: ListResponse<T> = self.get_json(path, &query).await?;
        Ok(response.into())
    }
}

#[async_trait]
impl UpstreamApi for ConfluentClient {
    async fn list_environments(
        &self,
        page_token: Option<&str>,
    ) -> Result<Page<EnvironmentRecord>, UpstreamError> {
        self.get_page(ENVIRONMENTS_PATH, None, page_token).await
    }

    async fn list_kafka_clusters(
        &self,
        environment_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<KafkaClusterRecord>, UpstreamError> {
        self.get_page(KAFKA_CLUSTERS_PATH, Some(environment_id), page_token)
            .await
    }

    async fn list_schema_registries(
        &self,
        environment_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<SchemaRegistryRecord>, UpstreamError> {
        self.get_page(SCHEMA_REGISTRY_PATH, Some(environment_id), page_token)
            .await
    }

    async fn list_ksql_clusters(
        &self,
        environment_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<KsqlClusterRecord>, UpstreamError> {
        self.get_page(KSQL_CLUSTERS_PATH, Some(environment_id), page_token)
            .await
    }

    async fn list_compute_pools(
        &self,
        environment_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<ComputePoolRecord>, UpstreamError> {
        self.get_page(COMPUTE_POOLS_PATH, Some(environment_id), page_token)
            .await
    }

    async fn list_connectors(
        &self,
        environment_id: &str,
        cluster_id: &str,
    ) -> Result<Vec<String>, UpstreamError> {
        let path = format!(
            "/connect/v1/environments/{}/clusters/{}/connectors",
            environment_id, cluster_id
        );
        self.get_json(&path, &[]).await
    }
}
