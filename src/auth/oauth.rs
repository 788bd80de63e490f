use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::errors::AuthError;
use super::token::TokenGrant;
use crate::config::OAuthConfig;

pub const TAG_MANAGER_SCOPE: &str = "https://www.googleapis.com/auth/tagmanager.edit.containers";
pub const BIGQUERY_SCOPE: &str = "https://www.googleapis.com/auth/bigquery";

/// Issuer of OAuth grants. Split from the authenticator so the consent and
/// refresh logic can be exercised without a live identity provider.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// URL the operator opens to grant access.
    fn consent_url(&self) -> Result<String, AuthError>;

    /// Exchanges the code pasted by the operator for a grant.
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, AuthError>;

    /// Silent refresh with a previously issued refresh token.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, AuthError>;
}

#[derive(Debug, Deserialize)]
struct TokenErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Installed-application OAuth flow against Google's endpoints.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    http: reqwest::Client,
    config: OAuthConfig,
    scopes: Vec<String>,
}

impl OAuthClient {
    pub fn new(config: OAuthConfig, scopes: &[&str]) -> Result<Self, AuthError> {
        if config.client_id.trim().is_empty() {
            return Err(AuthError::InvalidConfig("client_id is required".to_string()));
        }
        if config.client_secret.trim().is_empty() {
            return Err(AuthError::InvalidConfig("client_secret is required".to_string()));
        }

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            config,
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
        })
    }

    async fn post_token_request(&self, form: &[(&str, &str)]) -> Result<TokenGrant, AuthError> {
        let response = self
            .http
            .post(&self.config.token_uri)
            .form(form)
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<TokenErrorBody>(&body).unwrap_or(TokenErrorBody {
                error: format!("HTTP {}", status.as_u16()),
                error_description: Some(body.trim().to_string()).filter(|b| !b.is_empty()),
            });
            return Err(AuthError::TokenExchange {
                error: detail.error,
                description: detail.error_description,
            });
        }

        serde_json::from_str::<TokenGrant>(&body).map_err(|e| AuthError::TokenExchange {
            error: "malformed_response".to_string(),
            description: Some(e.to_string()),
        })
    }
}

#[async_trait]
impl TokenSource for OAuthClient {
    fn consent_url(&self) -> Result<String, AuthError> {
        let scope = self.scopes.join(" ");
        let url = Url::parse_with_params(
            &self.config.auth_uri,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| AuthError::InvalidConfig(format!("auth_uri: {e}")))?;
        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, AuthError> {
        debug!("Exchanging authorization code for an access token");
        self.post_token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ])
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, AuthError> {
        debug!("Refreshing access token");
        self.post_token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ])
        .await
    }
}

/// Stand-in when only a pre-issued access token was supplied. Once that token
/// expires every attempt to obtain a new one fails.
#[derive(Debug, Default)]
pub struct PreIssuedTokenSource;

impl PreIssuedTokenSource {
    fn unavailable() -> AuthError {
        AuthError::InvalidConfig(
            "the supplied access token expired and no OAuth client is configured".to_string(),
        )
    }
}

#[async_trait]
impl TokenSource for PreIssuedTokenSource {
    fn consent_url(&self) -> Result<String, AuthError> {
        Err(Self::unavailable())
    }

    async fn exchange_code(&self, _code: &str) -> Result<TokenGrant, AuthError> {
        Err(Self::unavailable())
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<TokenGrant, AuthError> {
        Err(Self::unavailable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OAuthConfig {
        OAuthConfig {
            client_id: "client-123".to_string(),
            client_secret: "shh".to_string(),
            ..OAuthConfig::default()
        }
    }

    #[test]
    fn test_consent_url_carries_scope_and_offline_access() {
        let client = OAuthClient::new(config(), &[TAG_MANAGER_SCOPE]).unwrap();
        let url = Url::parse(&client.consent_url().unwrap()).unwrap();
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(params["client_id"], "client-123");
        assert_eq!(params["scope"], TAG_MANAGER_SCOPE);
        assert_eq!(params["access_type"], "offline");
        assert_eq!(params["response_type"], "code");
    }

    #[test]
    fn test_missing_client_credentials_rejected() {
        let err = OAuthClient::new(OAuthConfig::default(), &[TAG_MANAGER_SCOPE]).unwrap_err();
        assert!(matches!(err, AuthError::InvalidConfig(_)));
    }
}
