use axum::extract::FromRef;
use std::sync::Arc;

use crate::cache::{CacheGate, TtlCache};
use crate::catalog::{Catalog, CollectError, ResourceCollector};

use super::ServerConfig;

pub type GuardedCollector = Arc<dyn ResourceCollector>;
pub type CatalogGate = CacheGate<Arc<Catalog>, CollectError>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub collector: GuardedCollector,
    pub catalog_gate: CatalogGate,
}

impl ServerState {
    pub fn new(config: ServerConfig, collector: GuardedCollector) -> ServerState {
        ServerState {
            config,
            collector,
            catalog_gate: CacheGate::new(TtlCache::new()),
        }
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for GuardedCollector {
    fn from_ref(input: &ServerState) -> Self {
        input.collector.clone()
    }
}

impl FromRef<ServerState> for CatalogGate {
    fn from_ref(input: &ServerState) -> Self {
        input.catalog_gate.clone()
    }
}
