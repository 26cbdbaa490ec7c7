//! Presigned `connect` tokens via the RDS auth token generator.

use super::AwsSession;
use crate::error::{RdsConnectError, Result};
use crate::security::AuthToken;
use crate::token::TokenIssuer;
use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_rds::auth_token::{AuthTokenGenerator, Config as AuthTokenConfig};

#[async_trait]
impl TokenIssuer for AwsSession {
    async fn build_auth_token(&self, endpoint: &str, port: i32, user: &str) -> Result<AuthToken> {
        let context = || format!("signing token for {}:{}", endpoint, port);

        let port = u64::try_from(port).map_err(|e| RdsConnectError::token(context(), e))?;
        let config = AuthTokenConfig::builder()
            .hostname(endpoint)
            .port(port)
            .username(user)
            .region(Region::new(self.region.clone()))
            .build()
            .map_err(|e| RdsConnectError::token(context(), e))?;

        let token = AuthTokenGenerator::new(config)
            .auth_token(&self.sdk_config)
            .await
            .map_err(|e| RdsConnectError::token(context(), e))?;

        Ok(AuthToken::new(token.as_str().to_string()))
    }
}
