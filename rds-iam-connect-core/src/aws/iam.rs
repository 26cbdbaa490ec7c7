//! Caller identity over STS and policy simulation over IAM.

use super::AwsSession;
use crate::error::{RdsConnectError, Result};
use crate::identity::{CallerIdentity, EvaluationResult, IdentityApi};
use async_trait::async_trait;

#[async_trait]
impl IdentityApi for AwsSession {
    async fn caller_identity(&self) -> Result<CallerIdentity> {
        let output = self
            .sts
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| RdsConnectError::identity("failed to get caller identity", e))?;

        let arn = output.arn().ok_or_else(|| {
            RdsConnectError::identity("failed to get caller identity", "response has no ARN")
        })?;
        Ok(CallerIdentity {
            account: output.account().map(str::to_string),
            arn: arn.to_string(),
        })
    }

    async fn simulate_principal_policy(
        &self,
        source_arn: &str,
        action: &str,
        resource_arns: &[String],
    ) -> Result<Vec<EvaluationResult>> {
        let output = self
            .iam
            .simulate_principal_policy()
            .policy_source_arn(source_arn)
            .action_names(action)
            .set_resource_arns(Some(resource_arns.to_vec()))
            .send()
            .await
            .map_err(|e| RdsConnectError::simulation("failed to simulate IAM policy", e))?;

        Ok(output
            .evaluation_results()
            .iter()
            .map(|result| EvaluationResult {
                action: result.eval_action_name().to_string(),
                resource: result.eval_resource_name().map(str::to_string),
                decision: result.eval_decision().as_str().to_string(),
            })
            .collect())
    }
}
