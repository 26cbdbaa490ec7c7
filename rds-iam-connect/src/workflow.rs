//! The connect flow: environment, discovery, selection, IAM check, token,
//! client.

use crate::Selection;
use crate::prompt::{Prompter, Selector};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use rds_iam_connect_core::identity::{check_access, current_principal};
use rds_iam_connect_core::{
    AwsSession, CacheStore, Config, ConnectionTarget, DiscoveryOptions, DiscoveryService,
    IdentityApi, InventoryApi, ProcessRunner, TokenIssuer, launcher, redact_auth_token, token,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Remote services bound to one region.
#[derive(Clone)]
pub struct Services {
    pub region: String,
    pub inventory: Arc<dyn InventoryApi>,
    pub identity: Arc<dyn IdentityApi>,
    pub tokens: Arc<dyn TokenIssuer>,
}

/// Opens region-bound remote services.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self, region: &str) -> Services;
}

/// Opens [`AwsSession`]s from the default credentials chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct AwsSessionFactory;

#[async_trait]
impl SessionFactory for AwsSessionFactory {
    async fn open(&self, region: &str) -> Services {
        let session = Arc::new(AwsSession::load(region).await);
        Services {
            region: region.to_string(),
            inventory: session.clone(),
            identity: session.clone(),
            tokens: session,
        }
    }
}

/// Everything a run needs, passed explicitly to each step.
pub struct Runtime {
    pub config: Config,
    pub cache: CacheStore,
    pub sessions: Box<dyn SessionFactory>,
    pub prompter: Box<dyn Prompter>,
    pub runner: Box<dyn ProcessRunner>,
    pub cancel: CancellationToken,
}

impl Runtime {
    /// Builds the discovery orchestrator for one environment's services.
    pub fn discovery_service(&self, services: &Services) -> DiscoveryService {
        DiscoveryService::new(
            services.inventory.clone(),
            self.cache.clone(),
            DiscoveryOptions::new(&services.region)
                .with_tag_fetch_concurrency(self.config.discovery.tag_fetch_concurrency),
        )
    }
}

/// Runs the interactive connect flow once.
pub async fn connect(runtime: &Runtime, selection: &Selection) -> Result<()> {
    let selector = Selector::new(runtime.prompter.as_ref(), &runtime.cancel);
    let config = &runtime.config;

    let env = selector
        .environment(&config.environment_names(), selection.environment.as_deref())
        .await
        .context("failed to select environment")?;
    let region = config.environment(&env)?.region.clone();
    let filters = config.filters_for(&env)?;
    debug!("Selected environment {} in region {}", env, region);

    let services = runtime.sessions.open(&region).await;
    let discovery = runtime.discovery_service(&services);

    if selection.refresh {
        match runtime.cache.invalidate(&env) {
            Ok(true) => info!("Discarded cached clusters for environment {}", env),
            Ok(false) => debug!("No cached clusters to discard for environment {}", env),
            Err(e) => warn!("Failed to discard cached clusters: {}", e),
        }
    }

    let targets = discovery
        .get_targets(&filters, &env, &runtime.cancel)
        .await
        .context("failed to get RDS clusters")?;
    if targets.is_empty() {
        bail!("no RDS clusters found with specified tags and IAM authentication enabled");
    }

    let target = selector
        .cluster(&targets, selection.cluster.as_deref())
        .await
        .context("failed to select cluster")?;
    let user = selector
        .user(&config.allowed_iam_users, selection.user.as_deref())
        .await
        .context("failed to select user")?;

    if config.check_iam_permissions {
        verify_access(&discovery, services.identity.as_ref(), &target, &user).await?;
    }

    let token = token::mint(services.tokens.as_ref(), &target, &user)
        .await
        .context("failed to generate IAM auth token")?;
    debug!("Generated auth token {}", redact_auth_token(token.expose()));

    launcher::connect(
        runtime.runner.as_ref(),
        &config.client,
        &target,
        &user,
        &token,
    )
    .await
    .context("failed to connect to RDS")
}

/// Simulates `rds-db:connect` for the caller's role before minting.
async fn verify_access(
    discovery: &DiscoveryService,
    identity: &dyn IdentityApi,
    target: &ConnectionTarget,
    user: &str,
) -> Result<()> {
    let principal = current_principal(identity)
        .await
        .context("failed to get IAM role")?;
    let resource_id = discovery
        .resource_id(target)
        .await
        .context("failed to resolve cluster resource id")?;

    check_access(identity, &principal, &resource_id, user)
        .await
        .with_context(|| {
            format!(
                "access denied: your IAM role '{}' does not have permission to connect to RDS cluster '{}' as user '{}'",
                principal, target.identifier, user
            )
        })?;
    info!("IAM role {} may connect to {} as {}", principal, target.identifier, user);
    Ok(())
}
