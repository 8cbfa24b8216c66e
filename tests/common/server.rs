//! Test server lifecycle management
//!
//! Spawns the real discovery router, backed by a [`FakeUpstream`], on a
//! random port. Dropping the server shuts both down.

use super::constants::*;
use super::upstream::{FakeUpstream, UpstreamFixture};
use async_trait::async_trait;
use ccloud_discovery_server::cache::TtlCache;
use ccloud_discovery_server::catalog::{Catalog, CollectError, ResourceCollector};
use ccloud_discovery_server::{
    make_app, ConfluentClient, RequestsLoggingLevel, ServerConfig, ServerState, UpstreamCollector,
    UpstreamSettings,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Counts collector runs before delegating to the real collector.
pub struct CountingCollector {
    inner: UpstreamCollector,
    runs: AtomicUsize,
}

#[async_trait]
impl ResourceCollector for CountingCollector {
    async fn collect(&self) -> Result<Catalog, CollectError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.inner.collect().await
    }
}

pub struct TestServer {
    pub base_url: String,
    pub upstream: FakeUpstream,
    collector: Arc<CountingCollector>,
    cache: TtlCache<Arc<Catalog>>,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

#[allow(dead_code)]
impl TestServer {
    pub async fn spawn(fixture: UpstreamFixture) -> Self {
        Self::spawn_with_ttl(fixture, Duration::from_secs(30 * 60)).await
    }

    pub async fn spawn_with_ttl(fixture: UpstreamFixture, cache_ttl: Duration) -> Self {
        let upstream = FakeUpstream::spawn(fixture).await;

        let mut settings = UpstreamSettings::new(API_KEY, API_SECRET);
        settings.base_url = upstream.base_url.clone();
        settings.request_timeout = Duration::from_secs(REQUEST_TIMEOUT_SECS);
        let client = ConfluentClient::new(settings).expect("Failed to build upstream client");

        let collector = Arc::new(CountingCollector {
            inner: UpstreamCollector::new(Arc::new(client)),
            runs: AtomicUsize::new(0),
        });

        let config = ServerConfig {
            requests_logging_level: RequestsLoggingLevel::None,
            port: 0,
            metrics_port: 0,
            cache_ttl,
            bearer_token: Some(BEARER_TOKEN.to_string()),
            ..Default::default()
        };
        let state = ServerState::new(config, collector.clone());
        let cache = state.catalog_gate.cache().clone();
        let app = make_app(state);

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            upstream,
            collector,
            cache,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Number of collector runs so far.
    pub fn collector_runs(&self) -> usize {
        self.collector.runs.load(Ordering::SeqCst)
    }

    /// The catalog cache behind the discovery endpoint.
    pub fn cache(&self) -> &TtlCache<Arc<Catalog>> {
        &self.cache
    }

    /// Waits for the server to become ready by polling /health
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/health", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
