//! Interactive selection of environment, cluster and database user.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use rds_iam_connect_core::{ConnectionTarget, RdsConnectError};
use std::io::{self, BufRead, Write};
use tokio_util::sync::CancellationToken;

/// Asks the user to pick one of several options.
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Returns the index of the chosen option.
    async fn select(&self, message: &str, options: &[String]) -> Result<usize>;
}

/// Numbered menu on the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompter;

#[async_trait]
impl Prompter for TerminalPrompter {
    async fn select(&self, message: &str, options: &[String]) -> Result<usize> {
        let message = message.to_string();
        let options = options.to_vec();
        tokio::task::spawn_blocking(move || {
            choose(&mut io::stdin().lock(), &mut io::stdout(), &message, &options)
        })
        .await
        .context("prompt task failed")?
        .context("failed to read selection")
    }
}

/// Parses a 1-based menu choice.
pub fn parse_choice(input: &str, count: usize) -> Option<usize> {
    match input.trim().parse::<usize>() {
        Ok(n) if n >= 1 && n <= count => Some(n - 1),
        _ => None,
    }
}

/// Prints a numbered menu and reads choices until a valid one is entered.
pub fn choose<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    message: &str,
    options: &[String],
) -> io::Result<usize> {
    writeln!(output, "{}", message)?;
    for (index, option) in options.iter().enumerate() {
        writeln!(output, "  {:>2}) {}", index + 1, option)?;
    }
    loop {
        write!(output, "Enter a number [1-{}]: ", options.len())?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed before a selection was made",
            ));
        }
        match parse_choice(&line, options.len()) {
            Some(index) => return Ok(index),
            None => writeln!(output, "Invalid selection '{}'", line.trim())?,
        }
    }
}

/// Resolves each choice from a preset value or a prompt.
///
/// A preset must name one of the offered options exactly. Prompts are
/// abandoned as soon as `cancel` fires.
pub struct Selector<'a> {
    prompter: &'a dyn Prompter,
    cancel: &'a CancellationToken,
}

impl<'a> Selector<'a> {
    pub fn new(prompter: &'a dyn Prompter, cancel: &'a CancellationToken) -> Self {
        Self { prompter, cancel }
    }

    async fn pick(&self, message: &str, options: &[String]) -> Result<usize> {
        if options.is_empty() {
            bail!("nothing to choose from for '{}'", message);
        }
        tokio::select! {
            () = self.cancel.cancelled() => Err(RdsConnectError::Cancelled.into()),
            choice = self.prompter.select(message, options) => {
                let index = choice?;
                if index >= options.len() {
                    bail!("selection {} is out of range", index + 1);
                }
                Ok(index)
            }
        }
    }

    pub async fn environment(&self, names: &[String], preset: Option<&str>) -> Result<String> {
        if let Some(name) = preset {
            return find_preset("env", names, name).map(str::to_string);
        }
        let index = self.pick("Choose environment:", names).await?;
        Ok(names[index].clone())
    }

    pub async fn cluster(
        &self,
        targets: &[ConnectionTarget],
        preset: Option<&str>,
    ) -> Result<ConnectionTarget> {
        if let Some(identifier) = preset {
            return targets
                .iter()
                .find(|target| target.identifier == identifier)
                .cloned()
                .ok_or_else(|| {
                    RdsConnectError::validation(
                        "cluster",
                        format!("'{}' is not among the discovered clusters", identifier),
                    )
                    .into()
                });
        }
        let labels: Vec<String> = targets.iter().map(ConnectionTarget::display_label).collect();
        let index = self.pick("Choose an RDS cluster:", &labels).await?;
        Ok(targets[index].clone())
    }

    pub async fn user(&self, users: &[String], preset: Option<&str>) -> Result<String> {
        if let Some(user) = preset {
            return find_preset("user", users, user).map(str::to_string);
        }
        let index = self.pick("Choose an IAM user:", users).await?;
        Ok(users[index].clone())
    }
}

fn find_preset<'o>(field: &str, options: &'o [String], wanted: &str) -> Result<&'o str> {
    options
        .iter()
        .find(|option| option.as_str() == wanted)
        .map(String::as_str)
        .ok_or_else(|| {
            RdsConnectError::validation(
                field,
                format!("'{}' is not one of: {}", wanted, options.join(", ")),
            )
            .into()
        })
}
