//! Hands a minted token to the native database client.
//!
//! The client is spawned directly with an argument vector and inherits the
//! terminal. Nothing is passed through a shell.

use crate::config::ClientSettings;
use crate::error::{RdsConnectError, Result};
use crate::models::ConnectionTarget;
use crate::security::AuthToken;
use crate::validation::{validate_hostname, validate_port, validate_username};
use async_trait::async_trait;
use std::process::Stdio;
use tracing::{debug, info};

/// Exit code the MySQL client uses when the user quits normally.
pub const CLIENT_QUIT_EXIT_CODE: i32 = 1;

/// Spawns an external program and waits for it.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Runs `program` with `args` and returns its exit code.
    ///
    /// `None` means the process ended without an exit code (killed by a
    /// signal).
    async fn run(&self, program: &str, args: &[String]) -> std::io::Result<Option<i32>>;
}

/// [`ProcessRunner`] backed by `tokio::process` with inherited stdio.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, program: &str, args: &[String]) -> std::io::Result<Option<i32>> {
        let status = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await?;
        Ok(status.code())
    }
}

/// Builds the client argument vector.
///
/// The password flag and token form a single argument (`-p<token>`), the way
/// the MySQL client expects an inline password.
pub fn client_args(
    target: &ConnectionTarget,
    user: &str,
    token: &AuthToken,
    extra_args: &[String],
) -> Vec<String> {
    let mut args = vec![
        "-h".to_string(),
        target.endpoint.clone(),
        "-P".to_string(),
        target.port.to_string(),
        "-u".to_string(),
        user.to_string(),
        format!("-p{}", token.expose()),
    ];
    args.extend(extra_args.iter().cloned());
    args
}

/// Validates the connection parameters and runs the client.
///
/// Every check must pass before anything is spawned. Exit code 0 and
/// [`CLIENT_QUIT_EXIT_CODE`] are treated as a normal end of session.
pub async fn connect(
    runner: &dyn ProcessRunner,
    client: &ClientSettings,
    target: &ConnectionTarget,
    user: &str,
    token: &AuthToken,
) -> Result<()> {
    validate_hostname(&target.endpoint)?;
    validate_username(user)?;
    validate_port(target.port)?;

    if client.program.is_empty() {
        return Err(RdsConnectError::configuration("client program is empty"));
    }

    let mut args = client_args(target, user, token, &client.extra_args);
    info!(
        "Connecting to {} as {} with {}",
        target.locator(),
        user,
        client.program
    );

    let outcome = runner.run(&client.program, &args).await;
    // The token argument is not needed past this point.
    zeroize::Zeroize::zeroize(&mut args);

    match outcome {
        Ok(Some(0)) | Ok(Some(CLIENT_QUIT_EXIT_CODE)) => {
            debug!("{} exited normally", client.program);
            Ok(())
        }
        Ok(Some(code)) => Err(RdsConnectError::launch(
            format!("{} exited with status {}", client.program, code),
            None,
        )),
        Ok(None) => Err(RdsConnectError::launch(
            format!("{} was terminated by a signal", client.program),
            None,
        )),
        Err(e) => Err(RdsConnectError::launch(
            format!("failed to start {}", client.program),
            Some(e),
        )),
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;
    use std::sync::Mutex;

    /// Records invocations and returns a canned exit status.
    pub struct RecordingRunner {
        pub exit: std::io::Result<Option<i32>>,
        pub invocations: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl RecordingRunner {
        pub fn exiting_with(code: i32) -> Self {
            Self {
                exit: Ok(Some(code)),
                invocations: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> Vec<(String, Vec<String>)> {
            self.invocations
                .lock()
                .map(|calls| calls.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl ProcessRunner for RecordingRunner {
        async fn run(&self, program: &str, args: &[String]) -> std::io::Result<Option<i32>> {
            if let Ok(mut calls) = self.invocations.lock() {
                calls.push((program.to_string(), args.to_vec()));
            }
            match &self.exit {
                Ok(code) => Ok(*code),
                Err(e) => Err(std::io::Error::new(e.kind(), e.to_string())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fakes::RecordingRunner;
    use super::*;

    fn target(endpoint: &str, port: i32) -> ConnectionTarget {
        ConnectionTarget::new(
            "orders",
            endpoint,
            port,
            "arn:aws:rds:eu-west-1:123456789012:cluster:orders",
        )
    }

    fn token() -> AuthToken {
        AuthToken::new(
            "orders.example.com:3306/?Action=connect&DBUser=app_ro&X-Amz-Signature=abc".to_string(),
        )
    }

    #[test]
    fn test_token_is_one_argument() {
        let args = client_args(
            &target("orders.example.com", 3306),
            "app_ro",
            &token(),
            &["--enable-cleartext-plugin".to_string()],
        );
        assert_eq!(
            args,
            vec![
                "-h",
                "orders.example.com",
                "-P",
                "3306",
                "-u",
                "app_ro",
                "-porders.example.com:3306/?Action=connect&DBUser=app_ro&X-Amz-Signature=abc",
                "--enable-cleartext-plugin",
            ]
        );
    }

    #[tokio::test]
    async fn test_exit_code_one_is_normal_quit() {
        let runner = RecordingRunner::exiting_with(1);
        let result = connect(
            &runner,
            &ClientSettings::default(),
            &target("orders.example.com", 3306),
            "app_ro",
            &token(),
        )
        .await;
        assert!(result.is_ok());
        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "mysql");
    }

    #[tokio::test]
    async fn test_other_exit_codes_are_launch_errors() {
        let runner = RecordingRunner::exiting_with(2);
        let result = connect(
            &runner,
            &ClientSettings::default(),
            &target("orders.example.com", 3306),
            "app_ro",
            &token(),
        )
        .await;
        assert!(matches!(result, Err(RdsConnectError::Launch { .. })));
    }

    #[tokio::test]
    async fn test_spawn_failure_keeps_io_source() {
        let runner = RecordingRunner {
            exit: Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "No such file or directory",
            )),
            invocations: Default::default(),
        };
        match connect(
            &runner,
            &ClientSettings::default(),
            &target("orders.example.com", 3306),
            "app_ro",
            &token(),
        )
        .await
        {
            Err(RdsConnectError::Launch { source, .. }) => {
                assert_eq!(source.map(|e| e.kind()), Some(std::io::ErrorKind::NotFound));
            }
            other => panic!("expected launch error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_input_never_spawns() {
        let runner = RecordingRunner::exiting_with(0);
        let settings = ClientSettings::default();

        let bad_host = connect(&runner, &settings, &target("db host", 3306), "app_ro", &token()).await;
        assert!(matches!(
            bad_host,
            Err(RdsConnectError::Validation { ref field, .. }) if field == "hostname"
        ));

        let bad_user = connect(
            &runner,
            &settings,
            &target("orders.example.com", 3306),
            "app ro",
            &token(),
        )
        .await;
        assert!(matches!(
            bad_user,
            Err(RdsConnectError::Validation { ref field, .. }) if field == "username"
        ));

        let bad_port = connect(&runner, &settings, &target("orders.example.com", 0), "app_ro", &token()).await;
        assert!(matches!(
            bad_port,
            Err(RdsConnectError::Validation { ref field, .. }) if field == "port"
        ));

        assert!(runner.calls().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_tokio_runner_reports_exit_codes() {
        let runner = TokioProcessRunner;
        let code = runner
            .run("sh", &["-c".to_string(), "exit 3".to_string()])
            .await
            .unwrap();
        assert_eq!(code, Some(3));

        let missing = runner.run("rds-iam-connect-no-such-client", &[]).await;
        assert!(missing.is_err());
    }
}
