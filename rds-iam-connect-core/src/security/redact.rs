//! Redaction of presigned auth tokens for logging.

/// Query parameters of a presigned token that must never be logged.
const SENSITIVE_PARAMS: &[&str] = &[
    "X-Amz-Signature",
    "X-Amz-Credential",
    "X-Amz-Security-Token",
];

/// Safely redacts an RDS auth token for logging and error messages.
///
/// The endpoint, action and user stay readable; signature, credential scope
/// and session token values are masked as `****`. Input that does not parse
/// as a presigned locator is replaced entirely.
///
/// # Example
///
/// ```rust
/// use rds_iam_connect_core::security::redact_auth_token;
///
/// let redacted = redact_auth_token(
///     "db.example.com:3306/?Action=connect&DBUser=app&X-Amz-Signature=f00d",
/// );
/// assert_eq!(
///     redacted,
///     "db.example.com:3306/?Action=connect&DBUser=app&X-Amz-Signature=****"
/// );
/// ```
pub fn redact_auth_token(token: &str) -> String {
    let Ok(mut parsed) = url::Url::parse(&format!("https://{}", token)) else {
        return "<redacted>".to_string();
    };

    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(key, value)| {
            if SENSITIVE_PARAMS
                .iter()
                .any(|sensitive| key.eq_ignore_ascii_case(sensitive))
            {
                (key.into_owned(), "****".to_string())
            } else {
                (key.into_owned(), value.into_owned())
            }
        })
        .collect();

    if pairs.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(pairs);
    }

    let rendered = parsed.to_string();
    rendered
        .strip_prefix("https://")
        .map(str::to_string)
        .unwrap_or(rendered)
}
