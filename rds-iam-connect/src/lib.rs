//! Library module for rds-iam-connect
//!
//! The CLI definition and the interactive workflow live here so they can be
//! driven from integration tests with scripted prompts and mock AWS
//! services. The binary entry point is in main.rs.

pub mod check;
pub mod prompt;
pub mod workflow;

use clap::{Args, Parser};
use rds_iam_connect_core::RdsConnectError;
use std::path::PathBuf;

/// CLI argument structure
#[derive(Debug, Parser)]
#[command(name = "rds-iam-connect")]
#[command(about = "Connect to AWS RDS clusters using IAM authentication")]
#[command(version)]
#[command(long_about = "
RDS IAM Connect - IAM-authenticated access to tagged RDS clusters

Discovers clusters carrying the configured team tag and environment tag,
lets you pick a cluster and a database user, optionally checks that your
IAM role may connect as that user, then starts the mysql client with a
freshly minted IAM auth token.

Configuration is read from ~/.rds-iam-connect/config.yaml unless --config
is given. The file is created from a template on first run.

EXAMPLES:
  rds-iam-connect
  rds-iam-connect --env prod --cluster orders --user app_ro
  rds-iam-connect --check
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Path to the configuration file
    #[arg(long, value_name = "FILE", env = "RDS_IAM_CONNECT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verify credentials, configuration, discovery and cache, then exit
    #[arg(
        short,
        long,
        help = "Verify the RDS IAM Connect tool configuration and environment"
    )]
    pub check: bool,

    #[command(flatten)]
    pub selection: Selection,
}

/// Preselected answers that skip the matching prompt.
#[derive(Debug, Clone, Default, Args)]
pub struct Selection {
    /// Environment name from the configuration
    #[arg(long = "env", value_name = "ENV")]
    pub environment: Option<String>,

    /// Cluster identifier
    #[arg(long, value_name = "CLUSTER")]
    pub cluster: Option<String>,

    /// Database user (must be listed in allowed_iam_users)
    #[arg(long, value_name = "USER")]
    pub user: Option<String>,

    /// Ignore the cached cluster list for the selected environment
    #[arg(long, help = "Discard the cached cluster list and query AWS")]
    pub refresh: bool,
}

/// Logging verbosity flags shared by every mode
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, help = "Suppress all log output except errors")]
    pub quiet: bool,
}

/// Whether a failed run stopped because the user interrupted it.
///
/// Only a cancellation in the error chain counts. A Ctrl-C handled by the
/// database client still cancels the run token, so the token state alone
/// would hide a later client failure.
pub fn is_interrupted(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        cause
            .downcast_ref::<RdsConnectError>()
            .is_some_and(RdsConnectError::is_cancelled)
    })
}
