use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tracing::{error, info};

use super::auth::Authenticated;
use super::{log_requests, metrics, state::*, ServerConfig};
use crate::cache::RefreshError;
use crate::catalog::{Catalog, CollectError};
use crate::discovery::{format_groups, parse_targets, DiscoveryError, LabelPrefix};

/// Key under which the whole catalog is cached.
pub const CATALOG_CACHE_KEY: &str = "confluent_resources";

const FETCH_FAILED_MESSAGE: &str = "Failed to fetch resources from Confluent API";

/// `/discovery` query parameters. A repeated key keeps its first value.
#[derive(Debug, Default, PartialEq)]
struct DiscoveryQuery {
    targets: Option<String>,
    prefix: Option<String>,
}

impl DiscoveryQuery {
    fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "targets" => &mut query.targets,
                "prefix" => &mut query.prefix,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        query
    }
}

impl IntoResponse for DiscoveryError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn load_catalog(state: &ServerState) -> Result<Arc<Catalog>, RefreshError<CollectError>> {
    let collector = state.collector.clone();
    let (catalog, outcome) = state
        .catalog_gate
        .get_or_refresh(CATALOG_CACHE_KEY, state.config.cache_ttl, move || async move {
            info!("Catalog cache miss, collecting resources");
            let start = Instant::now();
            let result = collector.collect().await;
            metrics::record_collection(result.as_ref().ok(), start.elapsed());
            if let Ok(catalog) = &result {
                info!(
                    "Collected {} resources ({} sub-fetches skipped) in {}ms",
                    catalog.len(),
                    catalog.skipped.len(),
                    start.elapsed().as_millis()
                );
            }
            result.map(Arc::new)
        })
        .await?;
    metrics::record_cache_lookup(outcome.as_str());
    Ok(catalog)
}

async fn discovery(
    _auth: Authenticated,
    State(state): State<ServerState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    let query = DiscoveryQuery::from_pairs(pairs);
    let targets = match parse_targets(query.targets.as_deref()) {
        Ok(targets) => targets,
        Err(err) => return err.into_response(),
    };
    let prefix = match LabelPrefix::parse(query.prefix.as_deref().unwrap_or_default()) {
        Ok(prefix) => prefix,
        Err(err) => return err.into_response(),
    };

    match load_catalog(&state).await {
        Ok(catalog) => Json(format_groups(&catalog.resources, &targets, &prefix)).into_response(),
        Err(err) => {
            error!("Failed to fetch resources: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, FETCH_FAILED_MESSAGE).into_response()
        }
    }
}

pub fn make_app(state: ServerState) -> Router {
    let discovery_routes: Router = Router::new()
        .route("/discovery", get(discovery))
        .with_state(state.clone());

    Router::new()
        .route("/health", get(health))
        .merge(discovery_routes)
        .layer(middleware::from_fn_with_state(state, log_requests))
}

fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics::metrics_handler))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown"),
        Err(err) => {
            error!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await
        }
    }
}

pub async fn run_server(config: ServerConfig, collector: GuardedCollector) -> Result<()> {
    metrics::init_metrics();

    let state = ServerState::new(config.clone(), collector);
    let _sweeper = state
        .catalog_gate
        .cache()
        .spawn_sweeper(config.cache_sweep_interval);

    if config.metrics_port != 0 {
        let metrics_listener = tokio::net::TcpListener::bind(("0.0.0.0", config.metrics_port))
            .await
            .with_context(|| format!("Failed to bind metrics port {}", config.metrics_port))?;
        info!("Metrics available at port {}!", config.metrics_port);
        tokio::spawn(async move {
            if let Err(err) = axum::serve(metrics_listener, make_metrics_app()).await {
                error!("Metrics server stopped: {}", err);
            }
        });
    }

    let app = make_app(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;

    info!("Ready to serve at port {}!", config.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}
