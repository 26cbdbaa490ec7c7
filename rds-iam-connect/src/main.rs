//! Connect to tagged AWS RDS clusters using IAM authentication.
//!
//! This binary discovers IAM-enabled clusters for a configured environment,
//! prompts for a cluster and database user, mints an IAM auth token and
//! starts the MySQL client with it.
//!
//! # Security Guarantees
//! - Auth tokens are never written to logs or disk
//! - The client is spawned without a shell
//! - Cache and configuration files are readable by the owner only

use anyhow::Result;
use clap::Parser;
use rds_iam_connect::{Cli, is_interrupted};
use rds_iam_connect::check::run_check;
use rds_iam_connect::prompt::TerminalPrompter;
use rds_iam_connect::workflow::{self, AwsSessionFactory, Runtime};
use rds_iam_connect_core::config::seed_default_config;
use rds_iam_connect_core::logging::init_logging;
use rds_iam_connect_core::{CacheStore, Config, TokioProcessRunner};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Exit status used when the run was interrupted.
const EXIT_INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let cancel = CancellationToken::new();

    // The first interrupt cancels the run. A running client handles its own.
    let listener = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            listener.cancel();
        }
    });

    let code = match run(cli, cancel.clone()).await {
        Ok(()) => 0,
        Err(e) if is_interrupted(&e) => {
            eprintln!("Interrupted");
            EXIT_INTERRUPTED
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli, cancel: CancellationToken) -> Result<()> {
    let seeded = match cli.config {
        Some(_) => None,
        None => seed_default_config()?,
    };
    let config = Config::load(cli.config.as_deref())?;

    init_logging(cli.global.verbose, cli.global.quiet, config.debug)?;
    if let Some(path) = seeded {
        println!("Created default config at {}", path.display());
    }
    debug!("Configuration loaded with {} environments", config.env_tag.len());

    let runtime = Runtime {
        cache: CacheStore::new(&config.caching),
        config,
        sessions: Box::new(AwsSessionFactory),
        prompter: Box::new(TerminalPrompter),
        runner: Box::new(TokioProcessRunner),
        cancel,
    };

    if cli.check {
        println!("Running in check mode...");
        run_check(&runtime, &mut std::io::stdout()).await
    } else {
        workflow::connect(&runtime, &cli.selection).await
    }
}
