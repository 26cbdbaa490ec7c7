//! Tag-based cluster discovery over a paginated inventory.
//!
//! The inventory listing carries no tags, so every candidate that survives
//! the cheap checks costs one extra `list_tags` call. Candidates are checked
//! in this order and the first failing check skips the cluster:
//!
//! 1. IAM database authentication is enabled
//! 2. identifier, endpoint, port and ARN are all present
//! 3. tags are fetched (a transport error here aborts the whole pass)
//! 4. both the classification and environment tag pairs are present
//! 5. the region in the ARN equals the session region
//!
//! Results keep listing order. Any remote failure discards everything found
//! so far.

use crate::error::{RdsConnectError, Result};
use crate::models::{ConnectionTarget, ResourceTag, TagFilters, region_from_arn};
use crate::validation::validate_filters;
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// One cluster as returned by the inventory listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterRecord {
    /// Cluster identifier
    pub identifier: Option<String>,
    /// Writer endpoint hostname
    pub endpoint: Option<String>,
    /// Listener port
    pub port: Option<i32>,
    /// Cluster ARN, used for the tag lookup and region
    pub arn: Option<String>,
    /// Whether IAM database authentication is enabled
    pub iam_auth_enabled: Option<bool>,
    /// Region-unique immutable id used in `rds-db` resource ARNs
    pub resource_id: Option<String>,
}

/// One page of the inventory listing.
#[derive(Debug, Clone, Default)]
pub struct ClusterPage {
    /// Clusters on this page
    pub clusters: Vec<ClusterRecord>,
    /// Marker for the next page; `None` on the last page
    pub next_marker: Option<String>,
}

/// Remote inventory operations used by discovery.
///
/// Implemented over the RDS API by [`AwsSession`](crate::aws::AwsSession)
/// and by in-memory fakes in tests.
#[async_trait]
pub trait InventoryApi: Send + Sync {
    /// Fetches one page of clusters starting at `marker`.
    async fn describe_clusters_page(&self, marker: Option<String>) -> Result<ClusterPage>;

    /// Lists the tags attached to a cluster.
    async fn list_tags(&self, resource_arn: &str) -> Result<Vec<ResourceTag>>;

    /// Looks up a single cluster by identifier.
    async fn describe_cluster(&self, identifier: &str) -> Result<Option<ClusterRecord>>;
}

/// Options for a discovery pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Region clusters must live in
    pub region: String,
    /// Tag lookups allowed in flight at once; values below 1 act as 1
    pub tag_fetch_concurrency: usize,
}

impl DiscoveryOptions {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            tag_fetch_concurrency: 1,
        }
    }

    pub fn with_tag_fetch_concurrency(mut self, concurrency: usize) -> Self {
        self.tag_fetch_concurrency = concurrency.max(1);
        self
    }
}

/// Cluster that passed the cheap checks and now needs its tags.
struct Candidate {
    identifier: String,
    endpoint: String,
    port: i32,
    arn: String,
}

/// Why a cluster was left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SkipReason {
    IamAuthDisabled,
    MissingFields,
    TagMismatch,
    RegionMismatch,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::IamAuthDisabled => write!(f, "IAM authentication disabled"),
            SkipReason::MissingFields => write!(f, "missing identifier, endpoint, port or ARN"),
            SkipReason::TagMismatch => write!(f, "required tags not present"),
            SkipReason::RegionMismatch => write!(f, "cluster is in another region"),
        }
    }
}

/// Runs the cheap checks (1 and 2) on a listed cluster.
fn precheck(record: &ClusterRecord) -> std::result::Result<Candidate, SkipReason> {
    if record.iam_auth_enabled != Some(true) {
        return Err(SkipReason::IamAuthDisabled);
    }
    match (&record.identifier, &record.endpoint, record.port, &record.arn) {
        (Some(identifier), Some(endpoint), Some(port), Some(arn)) => Ok(Candidate {
            identifier: identifier.clone(),
            endpoint: endpoint.clone(),
            port,
            arn: arn.clone(),
        }),
        _ => Err(SkipReason::MissingFields),
    }
}

/// Runs checks 4 and 5 once tags are known.
fn finish(
    candidate: Candidate,
    tags: &[ResourceTag],
    filters: &TagFilters,
    region: &str,
) -> std::result::Result<ConnectionTarget, SkipReason> {
    if !filters.matches(tags) {
        return Err(SkipReason::TagMismatch);
    }
    if region_from_arn(&candidate.arn) != region {
        return Err(SkipReason::RegionMismatch);
    }
    Ok(ConnectionTarget::new(
        candidate.identifier,
        candidate.endpoint,
        candidate.port,
        candidate.arn,
    ))
}

fn label(record: &ClusterRecord) -> &str {
    record.identifier.as_deref().unwrap_or("<unnamed>")
}

/// Discovers clusters matching `filters` in `options.region`.
///
/// Fails fast with a validation error, before any remote call, when a tag
/// name or value is empty. Cancellation is honoured before each page fetch.
pub async fn discover(
    inventory: &dyn InventoryApi,
    filters: &TagFilters,
    options: &DiscoveryOptions,
    cancel: &CancellationToken,
) -> Result<Vec<ConnectionTarget>> {
    validate_filters(filters)?;

    debug!("Fetching RDS clusters from AWS (region: {})", options.region);
    let concurrency = options.tag_fetch_concurrency.max(1);
    let mut targets = Vec::new();
    let mut marker = None;
    let mut pages = 0usize;

    loop {
        if cancel.is_cancelled() {
            debug!("Discovery cancelled after {} pages", pages);
            return Err(RdsConnectError::Cancelled);
        }

        let page = inventory.describe_clusters_page(marker.take()).await?;
        pages = pages.saturating_add(1);
        debug!("Processing {} clusters from AWS", page.clusters.len());

        let mut candidates = Vec::with_capacity(page.clusters.len());
        for record in &page.clusters {
            match precheck(record) {
                Ok(candidate) => candidates.push(candidate),
                Err(reason) => debug!("Skipping cluster {}: {}", label(record), reason),
            }
        }

        // buffered() keeps candidate order; try_collect stops at the first error.
        let tagged: Vec<(Candidate, Vec<ResourceTag>)> = stream::iter(candidates)
            .map(|candidate| async move {
                let tags = inventory.list_tags(&candidate.arn).await?;
                Ok::<_, RdsConnectError>((candidate, tags))
            })
            .buffered(concurrency)
            .try_collect()
            .await?;

        for (candidate, tags) in tagged {
            let identifier = candidate.identifier.clone();
            match finish(candidate, &tags, filters, &options.region) {
                Ok(target) => {
                    debug!("Found matching cluster: {}", target.identifier);
                    targets.push(target);
                }
                Err(reason) => debug!("Skipping cluster {}: {}", identifier, reason),
            }
        }

        match page.next_marker {
            Some(next) if !next.is_empty() => marker = Some(next),
            _ => break,
        }
    }

    debug!(
        "Found {} matching RDS clusters across {} pages",
        targets.len(),
        pages
    );
    Ok(targets)
}

#[cfg(test)]
pub(crate) mod fakes {
    //! In-memory inventory used by discovery and orchestrator tests.

    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    pub struct FakeInventory {
        pub pages: Vec<Vec<ClusterRecord>>,
        pub tags: HashMap<String, Vec<ResourceTag>>,
        pub fail_page: Option<usize>,
        pub fail_tags_for: Option<String>,
        pub page_calls: AtomicUsize,
        pub tag_calls: AtomicUsize,
        pub describe_calls: AtomicUsize,
    }

    impl FakeInventory {
        pub fn remote_calls(&self) -> usize {
            self.page_calls.load(Ordering::SeqCst)
                + self.tag_calls.load(Ordering::SeqCst)
                + self.describe_calls.load(Ordering::SeqCst)
        }
    }

    pub fn record(name: &str, region: &str, iam: Option<bool>) -> ClusterRecord {
        ClusterRecord {
            identifier: Some(name.to_string()),
            endpoint: Some(format!("{name}.cluster-abc.{region}.rds.amazonaws.com")),
            port: Some(3306),
            arn: Some(arn(name, region)),
            iam_auth_enabled: iam,
            resource_id: Some(format!("cluster-{}", name.to_uppercase())),
        }
    }

    pub fn arn(name: &str, region: &str) -> String {
        format!("arn:aws:rds:{region}:123456789012:cluster:{name}")
    }

    pub fn matching_tags() -> Vec<ResourceTag> {
        vec![
            ResourceTag::new("Team", "payments"),
            ResourceTag::new("ReleaseState", "production"),
            ResourceTag::new("Owner", "dba"),
        ]
    }

    pub fn filters() -> TagFilters {
        TagFilters::new("Team", "payments", "ReleaseState", "production")
    }

    #[async_trait]
    impl InventoryApi for FakeInventory {
        async fn describe_clusters_page(&self, marker: Option<String>) -> Result<ClusterPage> {
            self.page_calls.fetch_add(1, Ordering::SeqCst);
            let index: usize = marker.as_deref().map_or(0, |m| m.parse().unwrap_or(0));
            if self.fail_page == Some(index) {
                return Err(RdsConnectError::discovery(
                    "describing RDS clusters",
                    "ThrottlingException: Rate exceeded",
                ));
            }
            let clusters = self.pages.get(index).cloned().unwrap_or_default();
            let next_marker = (index + 1 < self.pages.len()).then(|| (index + 1).to_string());
            Ok(ClusterPage {
                clusters,
                next_marker,
            })
        }

        async fn list_tags(&self, resource_arn: &str) -> Result<Vec<ResourceTag>> {
            self.tag_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_tags_for.as_deref() == Some(resource_arn) {
                return Err(RdsConnectError::discovery(
                    "listing tags for resource",
                    "AccessDenied",
                ));
            }
            Ok(self.tags.get(resource_arn).cloned().unwrap_or_default())
        }

        async fn describe_cluster(&self, identifier: &str) -> Result<Option<ClusterRecord>> {
            self.describe_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .pages
                .iter()
                .flatten()
                .find(|record| record.identifier.as_deref() == Some(identifier))
                .cloned())
        }
    }
}
