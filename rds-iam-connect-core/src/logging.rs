//! Logging setup for the rds-iam-connect binary.
//!
//! Logs go to stderr so that interactive menus and the database client's
//! own output on stdout stay readable.

use crate::Result;

/// Maps CLI verbosity flags to a tracing level.
///
/// `debug` is the configuration file's debug switch; it raises the level to
/// at least DEBUG unless `quiet` is set.
pub fn level_for(verbose: u8, quiet: bool, debug: bool) -> tracing::Level {
    match (quiet, verbose, debug) {
        (true, _, _) => tracing::Level::ERROR,
        (false, 0, false) => tracing::Level::WARN,
        (false, 0 | 1, _) => tracing::Level::DEBUG,
        (false, _, _) => tracing::Level::TRACE,
    }
}

/// Initializes structured logging based on verbosity level.
///
/// # Arguments
/// * `verbose` - Verbosity level (0=WARN, 1=DEBUG, 2+=TRACE)
/// * `quiet` - If true, only show ERROR level logs
/// * `debug` - Debug switch from the configuration file
///
/// # Example
/// ```rust,no_run
/// use rds_iam_connect_core::logging::init_logging;
///
/// init_logging(1, false, false).expect("Failed to initialize logging");
/// ```
pub fn init_logging(verbose: u8, quiet: bool, debug: bool) -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(level_for(verbose, quiet, debug))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| {
            crate::error::RdsConnectError::configuration(format!(
                "Failed to initialize logging: {}",
                e
            ))
        })?;

    Ok(())
}
