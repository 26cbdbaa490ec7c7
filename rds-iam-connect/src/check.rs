//! `--check`: verify credentials, configuration, discovery and cache.

use crate::workflow::Runtime;
use anyhow::{Context, Result, bail};
use rds_iam_connect_core::CacheFileStatus;
use rds_iam_connect_core::identity::role_arn_from_caller_arn;
use std::io::Write;
use tracing::debug;

/// API actions the tool relies on, listed in the credentials report.
const REQUIRED_PERMISSIONS: [&str; 3] = [
    "rds:DescribeDBClusters",
    "rds:ListTagsForResource",
    "rds-db:connect",
];

/// Runs every check and writes a report to `out`.
///
/// Discovery failures are reported per environment and do not stop the run.
/// Credential, configuration and cache problems do.
pub async fn run_check(runtime: &Runtime, out: &mut impl Write) -> Result<()> {
    writeln!(out, "Running RDS IAM Connect checks...")?;
    writeln!(out, "--------------------------------")?;

    writeln!(out, "1. Checking AWS credentials...")?;
    check_credentials(runtime, out)
        .await
        .context("AWS credentials check failed")?;
    writeln!(out, "✓ AWS credentials are valid")?;

    writeln!(out, "\n2. Checking configuration...")?;
    check_configuration(runtime, out).context("configuration check failed")?;
    writeln!(out, "✓ Configuration is valid")?;

    writeln!(out, "\n3. Checking RDS connectivity...")?;
    check_environments(runtime, out).await?;

    writeln!(out, "\n4. Checking cache...")?;
    check_cache(runtime, out).context("cache check failed")?;
    writeln!(out, "✓ Cache is working properly")?;

    writeln!(out, "\nAll checks completed!")?;
    Ok(())
}

async fn check_credentials(runtime: &Runtime, out: &mut impl Write) -> Result<()> {
    let Some(first) = runtime.config.env_tag.values().next() else {
        bail!("no environments configured");
    };
    let services = runtime.sessions.open(&first.region).await;
    let identity = services.identity.caller_identity().await?;

    writeln!(
        out,
        "  - AWS Account ID: {}",
        identity.account.as_deref().unwrap_or("unknown")
    )?;
    writeln!(out, "  - AWS User ARN: {}", identity.arn)?;
    writeln!(out, "  - AWS Region: {}", services.region)?;
    writeln!(
        out,
        "  - Current IAM Role: {}",
        role_arn_from_caller_arn(&identity.arn)
    )?;
    for permission in REQUIRED_PERMISSIONS {
        writeln!(out, "  - Permission {}: required", permission)?;
    }
    Ok(())
}

fn check_configuration(runtime: &Runtime, out: &mut impl Write) -> Result<()> {
    let config = &runtime.config;
    config.validate()?;

    writeln!(
        out,
        "  - RDS Tags: {}={}",
        config.rds_tags.tag_name, config.rds_tags.tag_value
    )?;
    writeln!(
        out,
        "  - Allowed IAM Users: {} configured",
        config.allowed_iam_users.len()
    )?;
    writeln!(
        out,
        "  - Environment Tags: {} configured",
        config.env_tag.len()
    )?;
    if config.caching.enabled {
        writeln!(out, "  - Cache: Enabled (duration: {})", config.caching.duration)?;
    } else {
        writeln!(out, "  - Cache: Disabled")?;
    }
    Ok(())
}

async fn check_environments(runtime: &Runtime, out: &mut impl Write) -> Result<()> {
    for (name, env) in &runtime.config.env_tag {
        if runtime.cancel.is_cancelled() {
            return Err(rds_iam_connect_core::RdsConnectError::Cancelled.into());
        }
        writeln!(out, "\n  Environment: {}", name)?;
        writeln!(out, "  Region: {}", env.region)?;
        writeln!(out, "  Release State: {}", env.release_state)?;

        let filters = runtime.config.filters_for(name)?;
        let services = runtime.sessions.open(&env.region).await;
        let discovery = runtime.discovery_service(&services);

        match discovery.get_targets(&filters, name, &runtime.cancel).await {
            Ok(targets) if targets.is_empty() => {
                writeln!(
                    out,
                    "  ✗ RDS connectivity check failed: no RDS clusters found with the specified tags"
                )?;
            }
            Ok(targets) => {
                writeln!(out, "  - Found {} RDS clusters", targets.len())?;
                for (index, target) in targets.iter().enumerate() {
                    writeln!(out, "  - Cluster {}: {}", index + 1, target.identifier)?;
                    writeln!(out, "    - Endpoint: {}:{}", target.endpoint, target.port)?;
                    writeln!(out, "    - Region: {}", target.region)?;
                    writeln!(out, "    - IAM Auth: Enabled")?;
                }
                writeln!(out, "  ✓ RDS connectivity is valid")?;
            }
            Err(e) if e.is_cancelled() => return Err(e.into()),
            Err(e) => {
                debug!("Discovery failed for environment {}: {:?}", name, e);
                writeln!(out, "  ✗ RDS connectivity check failed: {}", e)?;
            }
        }
    }
    Ok(())
}

fn check_cache(runtime: &Runtime, out: &mut impl Write) -> Result<()> {
    let cache = &runtime.cache;
    if !cache.is_enabled() {
        writeln!(out, "  - Cache is disabled, skipping cache checks")?;
        return Ok(());
    }

    let Some(directory) = cache.directory() else {
        bail!("failed to get home directory");
    };
    match std::fs::metadata(directory) {
        Ok(metadata) if metadata.is_dir() => writeln!(out, "  - Cache directory exists")?,
        Ok(_) => bail!("cache path is not a directory: {}", directory.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            writeln!(out, "  - Cache directory does not exist")?;
            return Ok(());
        }
        Err(e) => {
            return Err(e).with_context(|| {
                format!("failed to check cache directory {}", directory.display())
            });
        }
    }

    for name in runtime.config.env_tag.keys() {
        match cache.inspect(name) {
            CacheFileStatus::Present => {
                writeln!(out, "  - Cache file exists for environment {}", name)?;
            }
            CacheFileStatus::Missing => {
                writeln!(out, "  - Cache file for environment {} does not exist", name)?;
            }
            CacheFileStatus::NotRegularFile => {
                bail!("cache file for environment {} is not a regular file", name);
            }
            CacheFileStatus::Unavailable => {
                bail!("environment name '{}' cannot be used as a cache file name", name);
            }
            CacheFileStatus::Disabled => {}
        }
    }
    Ok(())
}
