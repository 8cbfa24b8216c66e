//! Prometheus HTTP service discovery response format.
//!
//! See <https://prometheus.io/docs/prometheus/latest/http_sd/>. Each resource
//! of the catalog becomes one target group: the targets are those the caller
//! asked for, the labels describe the resource and the params tell the
//! exporter behind the targets which resource to scrape.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::catalog::{Resource, ResourceKind};

lazy_static! {
    static ref VALID_PREFIX: Regex =
        Regex::new(r"^[A-Za-z0-9_]*$").expect("Failed to compile prefix regex");
}

/// Scrape parameter carrying the resource id, per resource kind.
static PARAM_KEYS: &[(ResourceKind, &str)] = &[
    (ResourceKind::Kafka, "resource.kafka.id"),
    (ResourceKind::SchemaRegistry, "resource.schema_registry.id"),
    (ResourceKind::Ksql, "resource.ksql.id"),
    (ResourceKind::ComputePool, "resource.compute_pool.id"),
    (ResourceKind::Connector, "resource.connector.id"),
];

pub fn param_key(kind: ResourceKind) -> Option<&'static str> {
    PARAM_KEYS
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, key)| *key)
}

/// Request validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    #[error("Missing required 'targets' parameter")]
    MissingTargets,

    #[error(
        "Invalid 'prefix' parameter '{0}'. Must contain only alphanumeric characters and underscores"
    )]
    InvalidPrefix(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveryGroup {
    pub targets: Vec<String>,
    pub labels: BTreeMap<String, String>,
    pub params: BTreeMap<String, Vec<String>>,
}

/// A validated label prefix. Non-empty prefixes always end with `_`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelPrefix(String);

impl LabelPrefix {
    pub fn parse(raw: &str) -> Result<Self, DiscoveryError> {
        if raw.is_empty() {
            return Ok(Self::default());
        }
        if !VALID_PREFIX.is_match(raw) {
            return Err(DiscoveryError::InvalidPrefix(raw.to_string()));
        }
        if raw.ends_with('_') {
            Ok(Self(raw.to_string()))
        } else {
            Ok(Self(format!("{}_", raw)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn apply(&self, key: &str) -> String {
        format!("{}{}", self.0, key)
    }
}

/// Splits the comma separated `targets` query value.
pub fn parse_targets(raw: Option<&str>) -> Result<Vec<String>, DiscoveryError> {
    match raw {
        None | Some("") => Err(DiscoveryError::MissingTargets),
        Some(raw) => Ok(raw.split(',').map(str::to_string).collect()),
    }
}

/// One group per resource, in catalog order.
pub fn format_groups(
    resources: &[Resource],
    targets: &[String],
    prefix: &LabelPrefix,
) -> Vec<DiscoveryGroup> {
    resources
        .iter()
        .map(|resource| DiscoveryGroup {
            targets: targets.to_vec(),
            labels: resource
                .labels
                .iter()
                .map(|(key, value)| (prefix.apply(key), value.clone()))
                .collect(),
            // Kinds without a parameter key keep their labels but get no params.
            params: param_key(resource.kind)
                .map(|key| (key.to_string(), vec![resource.id.clone()]))
                .into_iter()
                .collect(),
        })
        .collect()
}
