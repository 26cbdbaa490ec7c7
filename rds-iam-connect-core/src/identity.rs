//! Caller identity resolution and the `rds-db:connect` policy check.

use crate::error::{RdsConnectError, Result};
use crate::models::AuthorizationDecision;
use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, info};

/// IAM action simulated before connecting.
pub const CONNECT_ACTION: &str = "rds-db:connect";

/// Decision string the policy simulator returns for a permitted action.
pub const ALLOWED_DECISION: &str = "allowed";

/// Who the active credentials belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub account: Option<String>,
    pub arn: String,
}

/// One entry of a policy simulation response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationResult {
    pub action: String,
    pub resource: Option<String>,
    /// `allowed`, `explicitDeny` or `implicitDeny`
    pub decision: String,
}

/// Remote identity operations.
#[async_trait]
pub trait IdentityApi: Send + Sync {
    /// Returns the identity behind the active credentials.
    async fn caller_identity(&self) -> Result<CallerIdentity>;

    /// Simulates `action` for `source_arn` against `resource_arns`.
    ///
    /// Results are returned in the order the simulator produced them.
    async fn simulate_principal_policy(
        &self,
        source_arn: &str,
        action: &str,
        resource_arns: &[String],
    ) -> Result<Vec<EvaluationResult>>;
}

fn assumed_role_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^arn:(aws[a-z-]*):sts::(\d+):assumed-role/([^/]+)/.+$")
            .expect("Invalid assumed-role pattern")
    })
}

/// Rewrites an STS assumed-role session ARN to the IAM role it belongs to.
///
/// `arn:aws:sts::123456789012:assumed-role/Admin/alice` becomes
/// `arn:aws:iam::123456789012:role/Admin`. Anything that is not an
/// assumed-role session (IAM users, federated users, roles already in IAM
/// form) is returned unchanged.
///
/// # Example
///
/// ```rust
/// use rds_iam_connect_core::identity::role_arn_from_caller_arn;
///
/// assert_eq!(
///     role_arn_from_caller_arn("arn:aws-us-gov:sts::123456789012:assumed-role/Ops/bob"),
///     "arn:aws-us-gov:iam::123456789012:role/Ops"
/// );
/// assert_eq!(
///     role_arn_from_caller_arn("arn:aws:iam::123456789012:user/carol"),
///     "arn:aws:iam::123456789012:user/carol"
/// );
/// ```
pub fn role_arn_from_caller_arn(caller_arn: &str) -> String {
    match assumed_role_pattern().captures(caller_arn) {
        Some(captures) => format!(
            "arn:{}:iam::{}:role/{}",
            &captures[1], &captures[2], &captures[3]
        ),
        None => caller_arn.to_string(),
    }
}

/// Resolves the principal to simulate policies for.
pub async fn current_principal(api: &dyn IdentityApi) -> Result<String> {
    let identity = api.caller_identity().await?;
    debug!("Caller identity: {}", identity.arn);
    Ok(role_arn_from_caller_arn(&identity.arn))
}

/// Builds the `rds-db` resource ARN for a database user on a cluster.
pub fn resource_user_arn(resource_id: &str, user: &str) -> String {
    format!("arn:aws:rds-db:*:*:dbuser:{}/{}", resource_id, user)
}

/// Simulates `rds-db:connect` for `principal` as `user` on a cluster.
///
/// Only the last evaluation result is consulted. An empty result set cannot
/// be read as either allowed or denied and is reported as a simulation
/// failure.
pub async fn check_access(
    api: &dyn IdentityApi,
    principal: &str,
    resource_id: &str,
    user: &str,
) -> Result<AuthorizationDecision> {
    let resource = resource_user_arn(resource_id, user);
    info!(
        "Checking IAM access for role {} to resource {}",
        principal, resource
    );

    let results = api
        .simulate_principal_policy(principal, CONNECT_ACTION, std::slice::from_ref(&resource))
        .await?;

    let Some(last) = results.last() else {
        return Err(RdsConnectError::inconclusive(format!(
            "no evaluation results for {} on {}",
            principal, resource
        )));
    };

    if last.decision != ALLOWED_DECISION {
        return Err(RdsConnectError::AccessDenied {
            principal: principal.to_string(),
            resource,
            decision: last.decision.clone(),
        });
    }

    Ok(AuthorizationDecision {
        principal_role_arn: principal.to_string(),
        resource_user_arn: resource,
        allowed: true,
    })
}


#[cfg(test)]
mod tests {
    use super::fakes::FakeIdentity;
    use super::*;

    const ROLE: &str = "arn:aws:iam::123456789012:role/DbAccess";

    #[test]
    fn test_assumed_role_is_rewritten() {
        assert_eq!(
            role_arn_from_caller_arn("arn:aws:sts::123456789012:assumed-role/DbAccess/alice"),
            ROLE
        );
        assert_eq!(
            role_arn_from_caller_arn(
                "arn:aws-cn:sts::123456789012:assumed-role/AWSReservedSSO_Admin_1a2b/bob@example.com"
            ),
            "arn:aws-cn:iam::123456789012:role/AWSReservedSSO_Admin_1a2b"
        );
    }

    #[test]
    fn test_other_principal_shapes_pass_through() {
        for arn in [
            "arn:aws:iam::123456789012:user/carol",
            "arn:aws:sts::123456789012:federated-user/dave",
            "arn:aws:iam::123456789012:role/DbAccess",
            "arn:aws:sts::123456789012:assumed-role/NoSession",
            "not-an-arn",
        ] {
            assert_eq!(role_arn_from_caller_arn(arn), arn);
        }
    }

    #[test]
    fn test_resource_user_arn() {
        assert_eq!(
            resource_user_arn("cluster-ABCDEFG", "app_ro"),
            "arn:aws:rds-db:*:*:dbuser:cluster-ABCDEFG/app_ro"
        );
    }

    #[tokio::test]
    async fn test_current_principal_uses_role_arn() {
        let api = FakeIdentity::with_decisions(&[]);
        assert_eq!(current_principal(&api).await.unwrap(), ROLE);
    }

    #[tokio::test]
    async fn test_current_principal_propagates_identity_error() {
        let api = FakeIdentity {
            fail_identity: true,
            ..FakeIdentity::with_decisions(&[])
        };
        assert!(matches!(
            current_principal(&api).await,
            Err(RdsConnectError::Identity { .. })
        ));
    }

    #[tokio::test]
    async fn test_allowed_decision() {
        let api = FakeIdentity::with_decisions(&["allowed"]);
        let decision = check_access(&api, ROLE, "cluster-ABC", "app_ro").await.unwrap();
        assert!(decision.allowed);
        assert_eq!(
            decision.resource_user_arn,
            "arn:aws:rds-db:*:*:dbuser:cluster-ABC/app_ro"
        );

        let request = api.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.0, ROLE);
        assert_eq!(request.1, CONNECT_ACTION);
        assert_eq!(request.2, vec![decision.resource_user_arn.clone()]);
    }

    #[tokio::test]
    async fn test_denied_decision_carries_decision_string() {
        let api = FakeIdentity::with_decisions(&["implicitDeny"]);
        match check_access(&api, ROLE, "cluster-ABC", "app_rw").await {
            Err(RdsConnectError::AccessDenied {
                principal,
                resource,
                decision,
            }) => {
                assert_eq!(principal, ROLE);
                assert_eq!(resource, "arn:aws:rds-db:*:*:dbuser:cluster-ABC/app_rw");
                assert_eq!(decision, "implicitDeny");
            }
            other => panic!("expected access denied, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_only_last_result_counts() {
        let api = FakeIdentity::with_decisions(&["explicitDeny", "allowed"]);
        assert!(check_access(&api, ROLE, "cluster-ABC", "app_ro").await.is_ok());

        let api = FakeIdentity::with_decisions(&["allowed", "explicitDeny"]);
        assert!(matches!(
            check_access(&api, ROLE, "cluster-ABC", "app_ro").await,
            Err(RdsConnectError::AccessDenied { .. })
        ));
    }

    #[tokio::test]
    async fn test_zero_results_is_inconclusive() {
        let api = FakeIdentity::with_decisions(&[]);
        match check_access(&api, ROLE, "cluster-ABC", "app_ro").await {
            Err(RdsConnectError::Simulation { source, .. }) => assert!(source.is_none()),
            other => panic!("expected simulation error, got {:?}", other),
        }
    }
}
