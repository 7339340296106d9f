//! Token provider capability and delegated-identity exchange.
//!
//! Credential acquisition is an opaque capability supplied to the
//! engine client: the client only ever asks a [`TokenProvider`] for a
//! bearer token. Delegated identity is a one-shot exchange against the
//! IAM Credentials API performed before the client is constructed; with
//! no principal configured that code path is never taken.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Environment variable holding the base OAuth access token, e.g. the
/// output of `gcloud auth print-access-token`.
pub const DEFAULT_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// Production IAM Credentials endpoint.
pub const IAM_CREDENTIALS_BASE_URL: &str = "https://iamcredentials.googleapis.com/v1";

const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Capability that produces bearer tokens for engine calls.
///
/// Implementations must be `Send + Sync` for use behind
/// `Arc<dyn TokenProvider>`.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Return a currently-valid OAuth access token.
    ///
    /// # Errors
    ///
    /// Returns an error when no credential can be produced.
    async fn access_token(&self) -> anyhow::Result<String>;
}

/// Fixed token, typically the result of a prior exchange.
#[derive(Debug, Clone)]
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> anyhow::Result<String> {
        Ok(self.token.clone())
    }
}

/// Reads the token from an environment variable on every call.
#[derive(Debug, Clone)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new() -> Self {
        Self::from_var(DEFAULT_TOKEN_ENV)
    }

    pub fn from_var(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvToken {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenProvider for EnvToken {
    async fn access_token(&self) -> anyhow::Result<String> {
        match std::env::var(&self.var) {
            Ok(token) if !token.trim().is_empty() => Ok(token),
            _ => anyhow::bail!(
                "environment variable {} is not set; export an OAuth access token \
                 (e.g. `gcloud auth print-access-token`)",
                self.var
            ),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateAccessTokenRequest<'a> {
    scope: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateAccessTokenResponse {
    access_token: String,
}

/// Exchange the base credential for a token scoped to `principal` via
/// the IAM Credentials `generateAccessToken` endpoint. Called once,
/// before the engine client is constructed; the returned token is used
/// for the whole run.
///
/// # Errors
///
/// Returns an error when the base credential is unavailable, the
/// exchange call fails, or the response cannot be decoded.
pub async fn exchange_impersonated_token(
    http: &reqwest::Client,
    base: &dyn TokenProvider,
    principal: &str,
    base_url: &str,
) -> anyhow::Result<StaticToken> {
    use anyhow::Context as _;

    let base_token = base
        .access_token()
        .await
        .context("acquire base credential for impersonation")?;

    let url = format!("{base_url}/projects/-/serviceAccounts/{principal}:generateAccessToken");
    let response = http
        .post(&url)
        .bearer_auth(base_token)
        .json(&GenerateAccessTokenRequest {
            scope: [CLOUD_PLATFORM_SCOPE],
        })
        .send()
        .await
        .with_context(|| format!("call generateAccessToken for {principal}"))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("impersonation of {principal} failed with HTTP {status}: {body}");
    }

    let body: GenerateAccessTokenResponse = response
        .json()
        .await
        .context("decode generateAccessToken response")?;
    Ok(StaticToken::new(body.access_token))
}
