//! Cluster inventory over the RDS API.

use super::AwsSession;
use crate::discovery::{ClusterPage, ClusterRecord, InventoryApi};
use crate::error::{RdsConnectError, Result};
use crate::models::ResourceTag;
use async_trait::async_trait;
use aws_sdk_rds::types::{DbCluster, Tag};

impl From<&DbCluster> for ClusterRecord {
    fn from(cluster: &DbCluster) -> Self {
        Self {
            identifier: cluster.db_cluster_identifier().map(str::to_string),
            endpoint: cluster.endpoint().map(str::to_string),
            port: cluster.port(),
            arn: cluster.db_cluster_arn().map(str::to_string),
            iam_auth_enabled: cluster.iam_database_authentication_enabled(),
            resource_id: cluster.db_cluster_resource_id().map(str::to_string),
        }
    }
}

fn tag_from_sdk(tag: &Tag) -> ResourceTag {
    ResourceTag::new(
        tag.key().unwrap_or_default(),
        tag.value().unwrap_or_default(),
    )
}

#[async_trait]
impl InventoryApi for AwsSession {
    async fn describe_clusters_page(&self, marker: Option<String>) -> Result<ClusterPage> {
        let output = self
            .rds
            .describe_db_clusters()
            .set_marker(marker)
            .send()
            .await
            .map_err(|e| RdsConnectError::discovery("failed to describe RDS clusters", e))?;

        Ok(ClusterPage {
            clusters: output.db_clusters().iter().map(ClusterRecord::from).collect(),
            next_marker: output.marker().map(str::to_string),
        })
    }

    async fn list_tags(&self, resource_arn: &str) -> Result<Vec<ResourceTag>> {
        let output = self
            .rds
            .list_tags_for_resource()
            .resource_name(resource_arn)
            .send()
            .await
            .map_err(|e| {
                RdsConnectError::discovery(
                    format!("failed to list tags for cluster {}", resource_arn),
                    e,
                )
            })?;

        Ok(output.tag_list().iter().map(tag_from_sdk).collect())
    }

    async fn describe_cluster(&self, identifier: &str) -> Result<Option<ClusterRecord>> {
        match self
            .rds
            .describe_db_clusters()
            .db_cluster_identifier(identifier)
            .send()
            .await
        {
            Ok(output) => Ok(output.db_clusters().first().map(ClusterRecord::from)),
            Err(e)
                if e
                    .as_service_error()
                    .is_some_and(|se| se.is_db_cluster_not_found_fault()) =>
            {
                Ok(None)
            }
            Err(e) => Err(RdsConnectError::discovery(
                format!("failed to describe RDS cluster {}", identifier),
                e,
            )),
        }
    }
}
