//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per endpoint of the discovery server.

use super::constants::*;
use reqwest::Response;
use serde_json::Value;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    pub base_url: String,
    token: Option<String>,
}

#[allow(dead_code)]
impl TestClient {
    /// Creates a client that sends no Authorization header
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            token: None,
        }
    }

    /// Creates a client sending the bearer token the test server expects
    pub fn authenticated(base_url: String) -> Self {
        Self::with_token(base_url, BEARER_TOKEN)
    }

    pub fn with_token(base_url: String, token: &str) -> Self {
        Self {
            token: Some(token.to_string()),
            ..Self::new(base_url)
        }
    }

    pub async fn health(&self) -> Response {
        self.client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .expect("Health request failed")
    }

    /// GET /discovery with optional `targets` and `prefix` query parameters
    pub async fn discovery(&self, targets: Option<&str>, prefix: Option<&str>) -> Response {
        let mut query = Vec::new();
        if let Some(targets) = targets {
            query.push(("targets", targets));
        }
        if let Some(prefix) = prefix {
            query.push(("prefix", prefix));
        }

        let mut request = self
            .client
            .get(format!("{}/discovery", self.base_url))
            .query(&query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("Discovery request failed")
    }

    /// Same as `discovery` but asserts a 200 and decodes the groups
    pub async fn discovery_groups(&self, targets: &str, prefix: Option<&str>) -> Vec<Value> {
        let response = self.discovery(Some(targets), prefix).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::OK,
            "Unexpected discovery status"
        );
        response.json().await.expect("Discovery body is not JSON")
    }
}
