//! IAM database auth token minting.
//!
//! Tokens are minted fresh for every connection attempt and never cached.

use crate::error::{RdsConnectError, Result};
use crate::models::ConnectionTarget;
use crate::security::AuthToken;
use async_trait::async_trait;
use tracing::debug;

/// Remote credential issuance.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Signs a connect token for `user` at `endpoint:port` using the active
    /// credentials and region.
    async fn build_auth_token(&self, endpoint: &str, port: i32, user: &str) -> Result<AuthToken>;
}

/// Mints a token for `user` on `target`.
pub async fn mint(
    issuer: &dyn TokenIssuer,
    target: &ConnectionTarget,
    user: &str,
) -> Result<AuthToken> {
    if user.is_empty() {
        return Err(RdsConnectError::validation("user", "user cannot be empty"));
    }

    debug!(
        "Generating auth token for endpoint: {}, user: {}",
        target.locator(),
        user
    );
    let token = issuer
        .build_auth_token(&target.endpoint, target.port, user)
        .await?;
    if token.is_empty() {
        return Err(RdsConnectError::token(
            format!("signing token for {}", target.locator()),
            "issuer returned an empty token",
        ));
    }
    Ok(token)
}
