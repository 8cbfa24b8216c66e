//! Walks the upstream resource hierarchy and builds a [`Catalog`].

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{
    or_unknown, Catalog, Labels, Resource, ResourceKind, SkippedFetch, LABEL_CLOUD_PROVIDER,
    LABEL_CLUSTER_ID, LABEL_CLUSTER_NAME, LABEL_CONNECTOR_NAME, LABEL_ENVIRONMENT_NAME,
    LABEL_NAME, LABEL_PACKAGE, LABEL_REGION,
};
use crate::server::metrics;
use crate::upstream::{
    ComputePoolRecord, EnvironmentRecord, KafkaClusterRecord, KsqlClusterRecord, Page,
    SchemaRegistryRecord, UpstreamApi, UpstreamError, COMPUTE_POOLS_PATH, ENVIRONMENTS_PATH,
    KAFKA_CLUSTERS_PATH, KSQL_CLUSTERS_PATH, SCHEMA_REGISTRY_PATH,
};

pub const DEFAULT_COLLECTOR_CONCURRENCY: usize = 4;

/// Fatal collection errors. Sub-fetch failures are never surfaced here, they
/// end up in [`Catalog::skipped`].
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("failed to fetch environments: {0}")]
    EnvironmentListing(#[source] UpstreamError),
}

#[async_trait]
pub trait ResourceCollector: Send + Sync {
    async fn collect(&self) -> Result<Catalog, CollectError>;
}

/// Collects resources of every environment visible to the API credentials.
pub struct UpstreamCollector {
    api: Arc<dyn UpstreamApi>,
    concurrency: usize,
}

impl UpstreamCollector {
    pub fn new(api: Arc<dyn UpstreamApi>) -> Self {
        Self::with_concurrency(api, DEFAULT_COLLECTOR_CONCURRENCY)
    }

    /// `concurrency` bounds how many environments are walked at once.
    pub fn with_concurrency(api: Arc<dyn UpstreamApi>, concurrency: usize) -> Self {
        Self {
            api,
            concurrency: concurrency.max(1),
        }
    }

    async fn collect_environment(&self, env: &EnvironmentRecord) -> Catalog {
        info!("Processing environment: {} ({})", env.name, env.id);
        let api = self.api.as_ref();
        let env_id = env.id.as_str();
        let mut catalog = Catalog::default();

        match fetch_all_pages(KAFKA_CLUSTERS_PATH, |token| async move {
            api.list_kafka_clusters(env_id, token.as_deref()).await
        })
        .await
        {
            Ok(clusters) => {
                for cluster in clusters {
                    catalog.resources.push(kafka_resource(env, &cluster));
                    self.collect_connectors(env, &cluster, &mut catalog).await;
                }
            }
            Err(err) => skip(&mut catalog, env, ResourceKind::Kafka, None, err),
        }

        match fetch_all_pages(SCHEMA_REGISTRY_PATH, |token| async move {
            api.list_schema_registries(env_id, token.as_deref()).await
        })
        .await
        {
            Ok(registries) => catalog
                .resources
                .extend(registries.iter().map(|sr| schema_registry_resource(env, sr))),
            Err(err) => skip(&mut catalog, env, ResourceKind::SchemaRegistry, None, err),
        }

        match fetch_all_pages(KSQL_CLUSTERS_PATH, |token| async move {
            api.list_ksql_clusters(env_id, token.as_deref()).await
        })
        .await
        {
            Ok(clusters) => catalog
                .resources
                .extend(clusters.iter().map(|ksql| ksql_resource(env, ksql))),
            Err(err) => skip(&mut catalog, env, ResourceKind::Ksql, None, err),
        }

        match fetch_all_pages(COMPUTE_POOLS_PATH, |token| async move {
            api.list_compute_pools(env_id, token.as_deref()).await
        })
        .await
        {
            Ok(pools) => catalog
                .resources
                .extend(pools.iter().map(|pool| compute_pool_resource(env, pool))),
            Err(err) => skip(&mut catalog, env, ResourceKind::ComputePool, None, err),
        }

        catalog
    }

    async fn collect_connectors(
        &self,
        env: &EnvironmentRecord,
        cluster: &KafkaClusterRecord,
        catalog: &mut Catalog,
    ) {
        match self.api.list_connectors(&env.id, &cluster.id).await {
            Ok(names) => {
                debug!(
                    "Found {} connectors for environment {}, cluster {}",
                    names.len(),
                    env.id,
                    cluster.id
                );
                catalog
                    .resources
                    .extend(names.iter().map(|name| connector_resource(env, cluster, name)));
            }
            Err(err) => skip(
                catalog,
                env,
                ResourceKind::Connector,
                Some(cluster.id.clone()),
                err,
            ),
        }
    }
}

#[async_trait]
impl ResourceCollector for UpstreamCollector {
    async fn collect(&self) -> Result<Catalog, CollectError> {
        let start = Instant::now();
        let api = self.api.as_ref();

        let environments = fetch_all_pages(ENVIRONMENTS_PATH, |token| async move {
            api.list_environments(token.as_deref()).await
        })
        .await
        .map_err(CollectError::EnvironmentListing)?;
        let environment_count = environments.len();
        info!("Found {} total environments", environment_count);

        // `buffered` keeps the environment order regardless of completion order.
        let per_environment: Vec<Catalog> = stream::iter(environments)
            .map(|env| async move { self.collect_environment(&env).await })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut catalog = Catalog::default();
        for part in per_environment {
            catalog.resources.extend(part.resources);
            catalog.skipped.extend(part.skipped);
        }

        info!(
            "Found {} total resources across {} environments in {}ms ({} sub-fetches skipped)",
            catalog.len(),
            environment_count,
            start.elapsed().as_millis(),
            catalog.skipped.len()
        );
        Ok(catalog)
    }
}

/// Follows continuation tokens until a page reports none. A token that was
/// already requested means the listing loops and fails with
/// [`UpstreamError::StalledPagination`].
async fn fetch_all_pages<T, F, Fut>(path: &str, mut fetch_page: F) -> Result<Vec<T>, UpstreamError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, UpstreamError>>,
{
    let mut items = Vec::new();
    let mut seen = HashSet::new();
    let mut token: Option<String> = None;

    loop {
        let page = fetch_page(token.take()).await?;
        items.extend(page.items);

        let Some(next) = page.next_page_token else {
            break;
        };
        if !seen.insert(next.clone()) {
            return Err(UpstreamError::StalledPagination {
                path: path.to_string(),
                token: next,
            });
        }
        debug!("Fetching next page of {} with token: {}", path, next);
        token = Some(next);
    }

    Ok(items)
}

fn skip(
    catalog: &mut Catalog,
    env: &EnvironmentRecord,
    kind: ResourceKind,
    cluster_id: Option<String>,
    err: UpstreamError,
) {
    match &cluster_id {
        Some(cluster_id) => warn!(
            "Failed to fetch {} resources for environment {}, cluster {}: {}",
            kind, env.id, cluster_id, err
        ),
        None => warn!(
            "Failed to fetch {} resources for environment {}: {}",
            kind, env.id, err
        ),
    }
    metrics::record_skipped_fetch(kind.as_str());
    catalog.skipped.push(SkippedFetch {
        environment_id: env.id.clone(),
        kind,
        cluster_id,
        reason: err.to_string(),
    });
}

fn base_labels(env: &EnvironmentRecord, cloud: &str, region: String) -> Labels {
    let mut labels = Labels::new();
    labels.insert(LABEL_CLOUD_PROVIDER.to_string(), or_unknown(cloud));
    labels.insert(LABEL_ENVIRONMENT_NAME.to_string(), env.name.clone());
    labels.insert(LABEL_REGION.to_string(), region);
    labels
}

fn kafka_resource(env: &EnvironmentRecord, cluster: &KafkaClusterRecord) -> Resource {
    let mut labels = base_labels(env, &cluster.spec.cloud, cluster.spec.region.clone());
    labels.insert(
        LABEL_CLUSTER_NAME.to_string(),
        cluster.spec.display_name.clone(),
    );
    Resource::new(cluster.id.clone(), ResourceKind::Kafka, labels)
}

fn connector_resource(
    env: &EnvironmentRecord,
    cluster: &KafkaClusterRecord,
    connector_name: &str,
) -> Resource {
    let mut labels = base_labels(env, &cluster.spec.cloud, cluster.spec.region.clone());
    labels.insert(LABEL_CONNECTOR_NAME.to_string(), connector_name.to_string());
    labels.insert(LABEL_CLUSTER_ID.to_string(), cluster.id.clone());
    Resource::new(connector_name, ResourceKind::Connector, labels)
}

fn schema_registry_resource(env: &EnvironmentRecord, sr: &SchemaRegistryRecord) -> Resource {
    let mut labels = base_labels(env, &sr.spec.cloud, sr.spec.region());
    labels.insert(LABEL_NAME.to_string(), sr.spec.display_name.clone());
    if !sr.spec.package.is_empty() {
        labels.insert(LABEL_PACKAGE.to_string(), sr.spec.package.clone());
    }
    Resource::new(sr.id.clone(), ResourceKind::SchemaRegistry, labels)
}

fn ksql_resource(env: &EnvironmentRecord, ksql: &KsqlClusterRecord) -> Resource {
    let mut labels = base_labels(env, &ksql.spec.cloud, ksql.spec.region.clone());
    labels.insert(LABEL_NAME.to_string(), ksql.spec.display_name.clone());
    Resource::new(ksql.id.clone(), ResourceKind::Ksql, labels)
}

fn compute_pool_resource(env: &EnvironmentRecord, pool: &ComputePoolRecord) -> Resource {
    let mut labels = base_labels(env, &pool.spec.cloud, pool.spec.region.clone());
    labels.insert(LABEL_NAME.to_string(), pool.spec.display_name.clone());
    Resource::new(pool.id.clone(), ResourceKind::ComputePool, labels)
}
