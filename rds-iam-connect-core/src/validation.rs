//! Shape checks applied to caller input before any I/O.
//!
//! The launcher hands the endpoint, user and minted token to an external
//! client as separate arguments. These checks keep values that could be read
//! as extra options or split into several words from ever reaching it.

use crate::error::{RdsConnectError, Result};
use crate::models::TagFilters;

/// Maximum hostname length accepted by DNS.
pub const MAX_HOSTNAME_LEN: usize = 253;

/// Maximum MySQL user name length.
pub const MAX_USERNAME_LEN: usize = 32;

/// Validates an endpoint hostname.
///
/// The hostname must be at most 253 bytes, contain at least one `.` and no
/// whitespace. Label structure is not checked.
pub fn validate_hostname(hostname: &str) -> Result<()> {
    if hostname.len() > MAX_HOSTNAME_LEN {
        return Err(RdsConnectError::validation(
            "hostname",
            format!("longer than {} characters", MAX_HOSTNAME_LEN),
        ));
    }
    if !hostname.contains('.') {
        return Err(RdsConnectError::validation(
            "hostname",
            format!("'{}' has no domain separator", hostname),
        ));
    }
    if hostname.chars().any(char::is_whitespace) {
        return Err(RdsConnectError::validation(
            "hostname",
            format!("'{}' contains whitespace", hostname.escape_debug()),
        ));
    }
    Ok(())
}

/// Validates a database user name.
pub fn validate_username(username: &str) -> Result<()> {
    if username.len() > MAX_USERNAME_LEN {
        return Err(RdsConnectError::validation(
            "username",
            format!("longer than {} characters", MAX_USERNAME_LEN),
        ));
    }
    if username.chars().any(char::is_whitespace) {
        return Err(RdsConnectError::validation(
            "username",
            format!("'{}' contains whitespace", username.escape_debug()),
        ));
    }
    Ok(())
}

/// Validates a listener port (1-65535).
pub fn validate_port(port: i32) -> Result<()> {
    if port > 0 && port < 65536 {
        Ok(())
    } else {
        Err(RdsConnectError::validation(
            "port",
            format!("{} is outside 1-65535", port),
        ))
    }
}

/// Rejects filters with any empty tag name or value.
pub fn validate_filters(filters: &TagFilters) -> Result<()> {
    let fields = [
        ("tag_name", &filters.tag_name),
        ("tag_value", &filters.tag_value),
        ("env_tag_name", &filters.env_tag_name),
        ("env_tag_value", &filters.env_tag_value),
    ];
    for (field, value) in fields {
        if value.is_empty() {
            return Err(RdsConnectError::validation(
                field,
                "tag parameters cannot be empty",
            ));
        }
    }
    Ok(())
}
