//! Core library for rds-iam-connect.
//!
//! This crate finds tagged Aurora/RDS clusters that accept IAM database
//! authentication, caches what it found per environment, optionally checks
//! that the caller may `rds-db:connect` as the chosen user, mints a
//! short-lived auth token and hands it to the native database client.
//!
//! # Security Guarantees
//! - Minted tokens are held in zeroizing buffers and never logged
//! - Client arguments are validated and passed as a vector, never via a shell
//! - Cache and configuration files are owner-only (0600 in a 0700 directory)
//!
//! # Architecture
//! Every remote operation sits behind a trait ([`InventoryApi`],
//! [`IdentityApi`], [`TokenIssuer`], [`ProcessRunner`]). [`AwsSession`]
//! implements the first three over the AWS SDK and is passed explicitly to
//! each entry point.

pub mod aws;
pub mod cache;
pub mod config;
pub mod discovery;
pub mod error;
pub mod identity;
pub mod launcher;
pub mod logging;
pub mod models;
pub mod security;
pub mod service;
pub mod token;
pub mod validation;

// Re-export commonly used types
pub use aws::AwsSession;
pub use cache::{CacheFileStatus, CacheStore};
pub use config::{ClientSettings, Config, EnvironmentConfig};
pub use discovery::{ClusterPage, ClusterRecord, DiscoveryOptions, InventoryApi, discover};
pub use error::{RdsConnectError, Result};
pub use identity::{CallerIdentity, EvaluationResult, IdentityApi};
pub use launcher::{ProcessRunner, TokioProcessRunner};
pub use models::{AuthorizationDecision, ConnectionTarget, ResourceTag, TagFilters};
pub use security::{AuthToken, redact_auth_token};
pub use service::DiscoveryService;
pub use token::TokenIssuer;
