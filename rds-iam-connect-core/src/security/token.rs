//! Zeroizing container for minted auth tokens.
//!
//! An RDS IAM auth token is a bearer credential for roughly fifteen minutes.
//! It is held in a `Zeroizing` buffer so the bytes are cleared as soon as
//! the launcher has handed it to the client.

use zeroize::{Zeroize, Zeroizing};

/// Short-lived database credential produced by the token minter.
///
/// # Example
///
/// ```rust
/// use rds_iam_connect_core::security::AuthToken;
///
/// let token = AuthToken::new("db.example.com:3306/?Action=connect".to_string());
/// assert!(!token.is_empty());
/// assert!(!format!("{:?}", token).contains("Action"));
/// ```
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct AuthToken {
    value: Zeroizing<String>,
}

impl AuthToken {
    /// Wraps a freshly minted token.
    pub fn new(value: String) -> Self {
        Self {
            value: Zeroizing::new(value),
        }
    }

    /// Returns the raw token for handing to the database client.
    pub fn expose(&self) -> &str {
        &self.value
    }

    /// True if the token is empty.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("len", &self.value.len())
            .finish_non_exhaustive()
    }
}
