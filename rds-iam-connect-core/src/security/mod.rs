//! Security utilities for auth token handling.
//!
//! This module provides:
//! - A zeroizing container for minted auth tokens
//! - Redaction of presigned token query parameters for logging
//!
//! # Security Guarantees
//! - Tokens are stored in `Zeroizing` containers and cleared on drop
//! - `Debug` output of a token never includes its contents
//! - Signatures, access key ids and session tokens are masked before logging

mod redact;
mod token;

// Re-export public types
pub use redact::redact_auth_token;
pub use token::AuthToken;
