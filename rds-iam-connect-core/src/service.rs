//! Cache-first cluster lookup for one region-bound session.

use crate::cache::CacheStore;
use crate::discovery::{DiscoveryOptions, InventoryApi, discover};
use crate::error::{RdsConnectError, Result};
use crate::models::{ConnectionTarget, TagFilters};
use crate::validation::validate_filters;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Combines the cache store with live discovery.
///
/// A cache hit is returned as-is for the lifetime of the snapshot; it is not
/// re-checked against the inventory. A failed live pass is never papered
/// over with stale cache contents.
pub struct DiscoveryService {
    inventory: Arc<dyn InventoryApi>,
    cache: CacheStore,
    options: DiscoveryOptions,
}

impl DiscoveryService {
    pub fn new(inventory: Arc<dyn InventoryApi>, cache: CacheStore, options: DiscoveryOptions) -> Self {
        Self {
            inventory,
            cache,
            options,
        }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn region(&self) -> &str {
        &self.options.region
    }

    /// Returns the targets for an environment scope.
    pub async fn get_targets(
        &self,
        filters: &TagFilters,
        scope: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ConnectionTarget>> {
        validate_filters(filters).inspect_err(|e| debug!("Invalid tags provided: {}", e))?;

        debug!("Attempting to load clusters from cache");
        if let Some(targets) = self.cache.load(scope) {
            debug!("Loaded {} clusters from cache", targets.len());
            return Ok(targets);
        }
        debug!("Cache miss or invalid, fetching from AWS");

        let targets = discover(self.inventory.as_ref(), filters, &self.options, cancel).await?;

        if let Err(e) = self.cache.save(scope, &targets) {
            warn!("Failed to save clusters to cache: {}", e);
        }

        Ok(targets)
    }

    /// Resolves the immutable resource id of a target's cluster.
    pub async fn resource_id(&self, target: &ConnectionTarget) -> Result<String> {
        let record = self
            .inventory
            .describe_cluster(&target.identifier)
            .await?
            .ok_or_else(|| {
                RdsConnectError::discovery(
                    format!("describing cluster {}", target.identifier),
                    "cluster not found",
                )
            })?;
        record.resource_id.filter(|id| !id.is_empty()).ok_or_else(|| {
            RdsConnectError::discovery(
                format!("describing cluster {}", target.identifier),
                "cluster has no resource id",
            )
        })
    }
}
