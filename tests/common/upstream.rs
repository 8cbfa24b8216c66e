//! Fake Confluent Cloud management API
//!
//! Serves the listings the collector walks from an in-memory fixture, checks
//! basic auth, paginates environments and can be told to fail any listing.

use super::constants::*;
use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Upstream content, built with the chained helpers below.
#[derive(Default, Clone)]
pub struct UpstreamFixture {
    environments: Vec<Value>,
    /// (listing path, environment id) -> records
    listings: HashMap<(&'static str, String), Vec<Value>>,
    /// (environment id, cluster id) -> connector names
    connectors: HashMap<(String, String), Vec<String>>,
    /// Environments per page, 0 means a single page
    environments_page_size: usize,
}

#[allow(dead_code)]
impl UpstreamFixture {
    pub fn environment(mut self, id: &str, name: &str) -> Self {
        self.environments
            .push(json!({"id": id, "display_name": name}));
        self
    }

    pub fn environments_page_size(mut self, size: usize) -> Self {
        self.environments_page_size = size;
        self
    }

    pub fn kafka_cluster(self, env: &str, id: &str, name: &str, cloud: &str, region: &str) -> Self {
        self.record(
            KAFKA_CLUSTERS_PATH,
            env,
            json!({"id": id, "spec": {
                "display_name": name,
                "availability": "SINGLE_ZONE",
                "cloud": cloud,
                "region": region,
            }}),
        )
    }

    pub fn schema_registry(
        self,
        env: &str,
        id: &str,
        name: &str,
        cloud: &str,
        region: Value,
        package: &str,
    ) -> Self {
        self.record(
            SCHEMA_REGISTRY_PATH,
            env,
            json!({"id": id, "spec": {
                "display_name": name,
                "cloud": cloud,
                "region": region,
                "package": package,
            }}),
        )
    }

    pub fn ksql_cluster(self, env: &str, id: &str, name: &str, cloud: &str, region: &str) -> Self {
        self.record(
            KSQL_CLUSTERS_PATH,
            env,
            json!({"id": id, "spec": {"display_name": name, "cloud": cloud, "region": region}}),
        )
    }

    pub fn compute_pool(self, env: &str, id: &str, name: &str, cloud: &str, region: &str) -> Self {
        self.record(
            COMPUTE_POOLS_PATH,
            env,
            json!({"id": id, "spec": {"display_name": name, "cloud": cloud, "region": region}}),
        )
    }

    pub fn connectors(mut self, env: &str, cluster: &str, names: &[&str]) -> Self {
        self.connectors.insert(
            (env.to_string(), cluster.to_string()),
            names.iter().map(|name| name.to_string()).collect(),
        );
        self
    }

    fn record(mut self, path: &'static str, env: &str, record: Value) -> Self {
        self.listings
            .entry((path, env.to_string()))
            .or_default()
            .push(record);
        self
    }
}

struct FakeState {
    fixture: UpstreamFixture,
    /// Failing listings, keyed by path or by "path?environment"
    failures: Mutex<HashSet<String>>,
    environment_calls: AtomicUsize,
    total_calls: AtomicUsize,
    /// While true, environment listings are counted but not answered
    hold_environments: watch::Sender<bool>,
}

impl FakeState {
    fn should_fail(&self, path: &str, env: Option<&str>) -> bool {
        let failures = self.failures.lock().unwrap();
        failures.contains(path)
            || env
                .map(|env| failures.contains(&format!("{}?{}", path, env)))
                .unwrap_or(false)
    }
}

fn check_auth(headers: &HeaderMap) -> Result<(), Response> {
    match headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(UPSTREAM_BASIC_AUTH) => Ok(()),
        _ => Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"errors": [{"status": "401", "detail": "invalid API key"}]})),
        )
            .into_response()),
    }
}

fn failure() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({"errors": [{"status": "503", "detail": "temporarily unavailable"}]})),
    )
        .into_response()
}

fn page(data: Vec<Value>, next: Option<String>) -> Response {
    Json(json!({
        "api_version": "v2",
        "data": data,
        "metadata": {"pagination": {"next": next.unwrap_or_default()}},
    }))
    .into_response()
}

async fn list_environments(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.total_calls.fetch_add(1, Ordering::SeqCst);
    state.environment_calls.fetch_add(1, Ordering::SeqCst);
    let mut hold = state.hold_environments.subscribe();
    let _ = hold.wait_for(|held| !*held).await;
    if let Err(rejection) = check_auth(&headers) {
        return rejection;
    }
    if state.should_fail(ENVIRONMENTS_PATH, None) {
        return failure();
    }

    let environments = &state.fixture.environments;
    let size = match state.fixture.environments_page_size {
        0 => environments.len().max(1),
        size => size,
    };
    let start: usize = query
        .get("page_token")
        .and_then(|token| token.strip_prefix("offset-"))
        .and_then(|offset| offset.parse().ok())
        .unwrap_or(0);
    let end = (start + size).min(environments.len());
    let next = (end < environments.len()).then(|| format!("offset-{}", end));

    page(environments[start.min(end)..end].to_vec(), next)
}

async fn list_environment_records(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.total_calls.fetch_add(1, Ordering::SeqCst);
    if let Err(rejection) = check_auth(&headers) {
        return rejection;
    }
    let Some(env) = query.get("environment") else {
        return (StatusCode::BAD_REQUEST, "environment is required").into_response();
    };

    let path = uri.path();
    if state.should_fail(path, Some(env)) {
        return failure();
    }

    let records = [
        KAFKA_CLUSTERS_PATH,
        SCHEMA_REGISTRY_PATH,
        KSQL_CLUSTERS_PATH,
        COMPUTE_POOLS_PATH,
    ]
    .into_iter()
    .find(|known| *known == path)
    .and_then(|known| state.fixture.listings.get(&(known, env.clone())))
    .cloned()
    .unwrap_or_default();

    page(records, None)
}

async fn list_connectors(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path((env, cluster)): Path<(String, String)>,
) -> Response {
    state.total_calls.fetch_add(1, Ordering::SeqCst);
    if let Err(rejection) = check_auth(&headers) {
        return rejection;
    }
    if state.should_fail("connectors", Some(&cluster)) {
        return failure();
    }

    let names = state
        .fixture
        .connectors
        .get(&(env, cluster))
        .cloned()
        .unwrap_or_default();
    Json(names).into_response()
}

/// A running fake upstream, shut down on drop.
pub struct FakeUpstream {
    pub base_url: String,
    state: Arc<FakeState>,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

#[allow(dead_code)]
impl FakeUpstream {
    pub async fn spawn(fixture: UpstreamFixture) -> Self {
        let state = Arc::new(FakeState {
            fixture,
            failures: Mutex::new(HashSet::new()),
            environment_calls: AtomicUsize::new(0),
            total_calls: AtomicUsize::new(0),
            hold_environments: watch::Sender::new(false),
        });

        let app = Router::new()
            .route(ENVIRONMENTS_PATH, get(list_environments))
            .route(KAFKA_CLUSTERS_PATH, get(list_environment_records))
            .route(SCHEMA_REGISTRY_PATH, get(list_environment_records))
            .route(KSQL_CLUSTERS_PATH, get(list_environment_records))
            .route(COMPUTE_POOLS_PATH, get(list_environment_records))
            .route(
                "/connect/v1/environments/{env}/clusters/{cluster}/connectors",
                get(list_connectors),
            )
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake upstream");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Fake upstream failed");
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            state,
            _shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Makes a whole listing fail, e.g. `ENVIRONMENTS_PATH`.
    pub fn fail(&self, path: &str) {
        self.state.failures.lock().unwrap().insert(path.to_string());
    }

    /// Makes a per-environment listing fail for one environment only.
    pub fn fail_for_environment(&self, path: &str, env: &str) {
        self.fail(&format!("{}?{}", path, env));
    }

    /// Makes the connector listing of one Kafka cluster fail.
    pub fn fail_connectors(&self, cluster: &str) {
        self.fail(&format!("connectors?{}", cluster));
    }

    pub fn heal(&self) {
        self.state.failures.lock().unwrap().clear();
    }

    /// Environment listings stall until `release_environments` is called.
    pub fn hold_environments(&self) {
        self.state.hold_environments.send_replace(true);
    }

    pub fn release_environments(&self) {
        self.state.hold_environments.send_replace(false);
    }

    pub fn environment_calls(&self) -> usize {
        self.state.environment_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.state.total_calls.load(Ordering::SeqCst)
    }
}

impl Drop for FakeUpstream {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
