//! Wire records of the Confluent Cloud management API.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::catalog::UNKNOWN;

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_page_token: None,
        }
    }

    pub fn with_next(items: Vec<T>, token: impl Into<String>) -> Self {
        Self {
            items,
            next_page_token: Some(token.into()),
        }
    }
}

/// Envelope shared by every paginated listing.
#[derive(Debug, Deserialize)]
pub(crate) struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub metadata: ListMetadata,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListMetadata {
    #[serde(default)]
    pub pagination: Pagination,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Pagination {
    #[serde(default)]
    pub next: Option<String>,
}

impl<T> From<ListResponse<T>> for Page<T> {
    fn from(response: ListResponse<T>) -> Self {
        let next_page_token = response
            .metadata
            .pagination
            .next
            .filter(|token| !token.is_empty());
        Page {
            items: response.data,
            next_page_token,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EnvironmentRecord {
    pub id: String,
    #[serde(rename = "display_name", default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct KafkaClusterSpec {
    pub display_name: String,
    pub availability: String,
    pub cloud: String,
    pub region: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KafkaClusterRecord {
    pub id: String,
    #[serde(default)]
    pub spec: KafkaClusterSpec,
}

/// Schema Registry regions come either as a plain string or as a nested
/// object carrying an `id`, depending on the API version.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RegionField {
    Plain(String),
    Nested(Map<String, Value>),
    Other(Value),
}

impl RegionField {
    pub fn normalized(&self) -> String {
        match self {
            RegionField::Plain(region) if !region.is_empty() => region.clone(),
            RegionField::Nested(fields) => match fields.get("id") {
                Some(Value::String(id)) if !id.is_empty() => id.clone(),
                _ => UNKNOWN.to_string(),
            },
            _ => UNKNOWN.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SchemaRegistrySpec {
    pub display_name: String,
    pub cloud: String,
    pub region: Option<RegionField>,
    pub package: String,
}

impl SchemaRegistrySpec {
    pub fn region(&self) -> String {
        self.region
            .as_ref()
            .map(RegionField::normalized)
            .unwrap_or_else(|| UNKNOWN.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SchemaRegistryRecord {
    pub id: String,
    #[serde(default)]
    pub spec: SchemaRegistrySpec,
}

/// Spec shape shared by KSQL clusters and compute pools.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RegionalSpec {
    pub display_name: String,
    pub cloud: String,
    pub region: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KsqlClusterRecord {
    pub id: String,
    #[serde(default)]
    pub spec: RegionalSpec,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ComputePoolRecord {
    pub id: String,
    #[serde(default)]
    pub spec: RegionalSpec,
}
