use async_trait::async_trait;
use aws_sdk_rds::{
    auth_token::{AuthTokenGenerator, Config as AuthTokenConfig},
    config::Region,
};
use std::fmt;
use tracing::{debug, info};

use super::credentials::ResolvedCredentialContext;
use crate::{
    constants::WRITE_USER_SUFFIX,
    error::{RdsAuthError, Result},
};

/// Signed, time-limited database password
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// `host:port` of the database instance or cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseEndpoint {
    pub hostname: String,
    pub port: u64,
}

impl DatabaseEndpoint {
    pub fn parse(endpoint: &str) -> Result<Self> {
        let invalid = |reason: &str| RdsAuthError::TokenIssuanceFailed {
            reason: format!("endpoint '{endpoint}' {reason}"),
        };

        let (hostname, port) = endpoint
            .rsplit_once(':')
            .ok_or_else(|| invalid("is missing a port"))?;
        if hostname.is_empty() {
            return Err(invalid("is missing a hostname"));
        }
        let port = port
            .parse::<u64>()
            .ok()
            .filter(|port| *port > 0 && *port <= u64::from(u16::MAX))
            .ok_or_else(|| invalid("has an invalid port"))?;

        Ok(Self {
            hostname: hostname.to_string(),
            port,
        })
    }
}

/// What gets signed: one principal on one endpoint in one region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRequest {
    pub endpoint: DatabaseEndpoint,
    pub region: String,
    pub username: String,
}

/// Produces the signed token for a request
#[async_trait]
pub trait TokenSigner {
    async fn sign(
        &self,
        context: &ResolvedCredentialContext,
        request: &TokenRequest,
    ) -> Result<AuthToken>;
}

/// Signs with the RDS auth token generator using the resolved AWS profile.
/// Tokens stay valid for 15 minutes.
#[derive(Debug, Clone, Default)]
pub struct RdsTokenSigner;

#[async_trait]
impl TokenSigner for RdsTokenSigner {
    async fn sign(
        &self,
        context: &ResolvedCredentialContext,
        request: &TokenRequest,
    ) -> Result<AuthToken> {
        let sdk_config = context.load_sdk_config().await?;

        let generator_config = AuthTokenConfig::builder()
            .hostname(&request.endpoint.hostname)
            .port(request.endpoint.port)
            .username(&request.username)
            .region(Region::new(request.region.clone()))
            .build()
            .map_err(|e| RdsAuthError::TokenIssuanceFailed {
                reason: e.to_string(),
            })?;

        let token = AuthTokenGenerator::new(generator_config)
            .auth_token(&sdk_config)
            .await
            .map_err(|e| RdsAuthError::TokenIssuanceFailed {
                reason: e.to_string(),
            })?;

        Ok(AuthToken::new(token.as_str()))
    }
}

/// Username the token is issued for
pub fn effective_username(username: &str, write_mode: bool) -> String {
    if write_mode && !username.is_empty() {
        format!("{username}{WRITE_USER_SUFFIX}")
    } else {
        username.to_string()
    }
}

pub struct TokenIssuer<S> {
    signer: S,
}

impl<S: TokenSigner> TokenIssuer<S> {
    pub fn new(signer: S) -> Self {
        Self { signer }
    }

    pub fn signer(&self) -> &S {
        &self.signer
    }

    pub async fn issue(
        &self,
        context: &ResolvedCredentialContext,
        endpoint: &str,
        region: &str,
        username: &str,
        write_mode: bool,
    ) -> Result<AuthToken> {
        let username = effective_username(username, write_mode);
        info!("Fetching token for user: {}", username);

        if username.is_empty() {
            return Err(RdsAuthError::MissingUsername);
        }

        let request = TokenRequest {
            endpoint: DatabaseEndpoint::parse(endpoint)?,
            region: region.to_string(),
            username,
        };
        debug!(
            "Signing token for {}:{} in {}",
            request.endpoint.hostname, request.endpoint.port, request.region
        );

        self.signer.sign(context, &request).await
    }
}
