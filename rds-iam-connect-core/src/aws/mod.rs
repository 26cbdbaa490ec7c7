//! AWS SDK implementations of the remote seams.
//!
//! One [`AwsSession`] is bound to one region. It is built once per
//! environment and handed explicitly to discovery, the identity checks and
//! the token minter.

mod iam;
mod rds;
mod token;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use tracing::debug;

/// Region-bound AWS clients sharing one credentials chain.
#[derive(Debug, Clone)]
pub struct AwsSession {
    sdk_config: SdkConfig,
    region: String,
    rds: aws_sdk_rds::Client,
    sts: aws_sdk_sts::Client,
    iam: aws_sdk_iam::Client,
}

impl AwsSession {
    /// Loads the default credentials chain for `region`.
    ///
    /// Credentials are resolved lazily; a missing or expired profile
    /// surfaces on the first remote call.
    pub async fn load(region: &str) -> Self {
        debug!("Loading AWS configuration for region {}", region);
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        Self::from_sdk_config(sdk_config, region)
    }

    /// Builds the service clients from an already loaded configuration.
    pub fn from_sdk_config(sdk_config: SdkConfig, region: &str) -> Self {
        Self {
            rds: aws_sdk_rds::Client::new(&sdk_config),
            sts: aws_sdk_sts::Client::new(&sdk_config),
            iam: aws_sdk_iam::Client::new(&sdk_config),
            region: region.to_string(),
            sdk_config,
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }
}
