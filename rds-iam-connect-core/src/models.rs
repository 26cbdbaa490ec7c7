//! Core data models for discovered clusters and authorization outcomes.
//!
//! `ConnectionTarget` is serialized with the same field names the cache
//! snapshot files have always used, so snapshots written by earlier
//! releases stay readable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A discovered database cluster eligible for connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionTarget {
    /// Cluster identifier, unique within an account and region
    #[serde(rename = "Identifier")]
    pub identifier: String,
    /// Writer endpoint hostname
    #[serde(rename = "Endpoint")]
    pub endpoint: String,
    /// Listener port
    #[serde(rename = "Port")]
    pub port: i32,
    /// Globally unique resource name of the cluster
    #[serde(rename = "Arn")]
    pub resource_arn: String,
    /// Region derived from `resource_arn`
    #[serde(rename = "Region")]
    pub region: String,
}

impl ConnectionTarget {
    /// Builds a target, deriving the region from the resource ARN.
    pub fn new(
        identifier: impl Into<String>,
        endpoint: impl Into<String>,
        port: i32,
        resource_arn: impl Into<String>,
    ) -> Self {
        let resource_arn = resource_arn.into();
        let region = region_from_arn(&resource_arn).to_string();
        Self {
            identifier: identifier.into(),
            endpoint: endpoint.into(),
            port,
            resource_arn,
            region,
        }
    }

    /// `endpoint:port` locator used when signing auth tokens.
    pub fn locator(&self) -> String {
        format!("{}:{}", self.endpoint, self.port)
    }

    /// Label shown in the cluster selection menu.
    pub fn display_label(&self) -> String {
        format!("{} ({}:{})", self.identifier, self.endpoint, self.port)
    }
}

/// Extracts the region component of an ARN.
///
/// Returns an empty string when the ARN has fewer than four components.
pub fn region_from_arn(arn: &str) -> &str {
    arn.split(':').nth(3).unwrap_or_default()
}

/// A key/value tag attached to a remote resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTag {
    /// Tag key
    pub key: String,
    /// Tag value
    pub value: String,
}

impl ResourceTag {
    /// Creates a tag from a key and value.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Tag predicates a cluster must satisfy to be offered as a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFilters {
    /// Classification tag name (e.g. `Team`)
    pub tag_name: String,
    /// Classification tag value
    pub tag_value: String,
    /// Environment tag name (e.g. `ReleaseState`)
    pub env_tag_name: String,
    /// Environment tag value for the selected scope
    pub env_tag_value: String,
}

impl TagFilters {
    pub fn new(
        tag_name: impl Into<String>,
        tag_value: impl Into<String>,
        env_tag_name: impl Into<String>,
        env_tag_value: impl Into<String>,
    ) -> Self {
        Self {
            tag_name: tag_name.into(),
            tag_value: tag_value.into(),
            env_tag_name: env_tag_name.into(),
            env_tag_value: env_tag_value.into(),
        }
    }

    /// True when both the classification and environment pairs are present.
    pub fn matches(&self, tags: &[ResourceTag]) -> bool {
        let has_classification = tags
            .iter()
            .any(|tag| tag.key == self.tag_name && tag.value == self.tag_value);
        let has_environment = tags
            .iter()
            .any(|tag| tag.key == self.env_tag_name && tag.value == self.env_tag_value);
        has_classification && has_environment
    }
}

/// Persisted cache contents for one environment scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    /// When the snapshot was captured (UTC)
    #[serde(rename = "timestamp")]
    pub captured_at: DateTime<Utc>,
    /// Targets in discovery order
    #[serde(rename = "clusters")]
    pub targets: Vec<ConnectionTarget>,
}

/// Outcome of simulating the connect action for one principal/user pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationDecision {
    /// Role ARN the simulation ran as
    pub principal_role_arn: String,
    /// `rds-db` user ARN the connect action was checked against
    pub resource_user_arn: String,
    /// Whether the final evaluation allowed the action
    pub allowed: bool,
}
