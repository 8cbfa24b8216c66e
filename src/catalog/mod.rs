//! In-process catalog of discoverable Confluent Cloud resources.

mod collector;

pub use collector::{
    CollectError, ResourceCollector, UpstreamCollector, DEFAULT_COLLECTOR_CONCURRENCY,
};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const LABEL_CLOUD_PROVIDER: &str = "cloud_provider";
pub const LABEL_ENVIRONMENT_NAME: &str = "environment_name";
pub const LABEL_CLUSTER_NAME: &str = "cluster_name";
pub const LABEL_CLUSTER_ID: &str = "cluster_id";
pub const LABEL_CONNECTOR_NAME: &str = "connector_name";
pub const LABEL_NAME: &str = "name";
pub const LABEL_REGION: &str = "region";
pub const LABEL_PACKAGE: &str = "package";

/// Value used for labels the upstream left empty or sent in an unexpected shape.
pub const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Kafka,
    SchemaRegistry,
    Ksql,
    ComputePool,
    Connector,
    /// Anything this server does not know how to expose as a scrape parameter.
    #[serde(other)]
    Unknown,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Kafka => "kafka",
            ResourceKind::SchemaRegistry => "schema_registry",
            ResourceKind::Ksql => "ksql",
            ResourceKind::ComputePool => "compute_pool",
            ResourceKind::Connector => "connector",
            ResourceKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Labels = BTreeMap<String, String>;

/// A single upstream entity, normalized.
///
/// Resources are only ever built complete: every label for their kind is
/// filled in at construction time and never touched afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub kind: ResourceKind,
    pub labels: Labels,
}

impl Resource {
    pub fn new(id: impl Into<String>, kind: ResourceKind, labels: Labels) -> Self {
        Self {
            id: id.into(),
            kind,
            labels,
        }
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

/// A sub-fetch that failed during collection and whose resources are missing
/// from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFetch {
    pub environment_id: String,
    pub kind: ResourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,
    pub reason: String,
}

/// Result of one collection pass, in traversal order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Catalog {
    pub resources: Vec<Resource>,
    pub skipped: Vec<SkippedFetch>,
}

impl Catalog {
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn is_degraded(&self) -> bool {
        !self.skipped.is_empty()
    }

    pub fn count_of(&self, kind: ResourceKind) -> usize {
        self.resources.iter().filter(|r| r.kind == kind).count()
    }
}

/// Returns `value`, or [`UNKNOWN`] when it is empty.
pub fn or_unknown(value: &str) -> String {
    if value.is_empty() {
        UNKNOWN.to_string()
    } else {
        value.to_string()
    }
}
