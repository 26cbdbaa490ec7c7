//! Error types for discovery, authorization, token minting and launch.
//!
//! Every failure path in the connection flow maps to exactly one variant
//! here. Minted auth tokens are never embedded in an error message; callers
//! that need to mention a token pass it through
//! [`redact_auth_token`](crate::security::redact_auth_token) first.

use thiserror::Error;

/// Boxed error used as the source of transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for rds-iam-connect operations.
#[derive(Debug, Error)]
pub enum RdsConnectError {
    /// Caller input failed a shape check; no I/O was attempted
    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Listing clusters or fetching their tags failed; the pass was aborted
    #[error("Cluster discovery failed: {context}")]
    Discovery {
        context: String,
        #[source]
        source: BoxError,
    },

    /// Cache snapshot could not be written
    #[error("Cache operation failed: {context}")]
    Cache {
        context: String,
        #[source]
        source: BoxError,
    },

    /// The caller identity could not be resolved
    #[error("Failed to resolve caller identity: {context}")]
    Identity {
        context: String,
        #[source]
        source: BoxError,
    },

    /// The policy simulator denied the connect action
    #[error("Access denied: role '{principal}' cannot connect to '{resource}' (decision: {decision})")]
    AccessDenied {
        principal: String,
        resource: String,
        decision: String,
    },

    /// The policy simulation failed or was inconclusive
    #[error("Policy simulation failed: {context}")]
    Simulation {
        context: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Auth token generation failed
    #[error("Failed to generate IAM auth token: {context}")]
    Token {
        context: String,
        #[source]
        source: BoxError,
    },

    /// The database client could not be started or exited abnormally
    #[error("Database client failed: {context}")]
    Launch {
        context: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Configuration file is missing, malformed or inconsistent
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// I/O operation failed
    #[error("I/O operation failed: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization or deserialization failed
    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The operation was interrupted before it completed
    #[error("Operation cancelled")]
    Cancelled,
}

/// Convenience type alias for Results with RdsConnectError
pub type Result<T> = std::result::Result<T, RdsConnectError>;

impl RdsConnectError {
    /// Creates a validation error naming the offending field
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a discovery error wrapping a transport failure
    pub fn discovery<E>(context: impl Into<String>, error: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Discovery {
            context: context.into(),
            source: error.into(),
        }
    }

    /// Creates a cache error
    pub fn cache<E>(context: impl Into<String>, error: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Cache {
            context: context.into(),
            source: error.into(),
        }
    }

    /// Creates an identity resolution error
    pub fn identity<E>(context: impl Into<String>, error: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Identity {
            context: context.into(),
            source: error.into(),
        }
    }

    /// Creates a simulation error without an underlying cause
    pub fn inconclusive(context: impl Into<String>) -> Self {
        Self::Simulation {
            context: context.into(),
            source: None,
        }
    }

    /// Creates a simulation error wrapping a transport failure
    pub fn simulation<E>(context: impl Into<String>, error: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Simulation {
            context: context.into(),
            source: Some(error.into()),
        }
    }

    /// Creates a token minting error
    pub fn token<E>(context: impl Into<String>, error: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Token {
            context: context.into(),
            source: error.into(),
        }
    }

    /// Creates a launch error
    pub fn launch(context: impl Into<String>, source: Option<std::io::Error>) -> Self {
        Self::Launch {
            context: context.into(),
            source,
        }
    }

    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates an I/O error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Returns true if this error was caused by an interrupt.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
