use chrono::{Duration, Utc};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::consent::ConsentPrompt;
use super::errors::AuthError;
use super::oauth::TokenSource;
use super::token::{AccessToken, HeldToken};

/// Tokens this close to expiry are treated as already expired.
const DEFAULT_REFRESH_SKEW_SECS: i64 = 60;

/// Owns the process-lifetime access token and decides between interactive
/// consent (nothing held yet) and silent refresh (a refresh token is held).
pub struct Authenticator {
    source: Arc<dyn TokenSource>,
    prompt: Arc<dyn ConsentPrompt>,
    held: Mutex<Option<HeldToken>>,
    refresh_skew: Duration,
}

impl Authenticator {
    pub fn new(source: Arc<dyn TokenSource>, prompt: Arc<dyn ConsentPrompt>) -> Self {
        Self {
            source,
            prompt,
            held: Mutex::new(None),
            refresh_skew: Duration::seconds(DEFAULT_REFRESH_SKEW_SECS),
        }
    }

    pub fn with_refresh_skew(mut self, skew: Duration) -> Self {
        self.refresh_skew = skew;
        self
    }

    /// Seeds a token obtained elsewhere (e.g. `gcloud auth print-access-token`).
    /// There is no refresh token, so expiry falls back to the consent flow.
    pub fn with_initial_token(mut self, token: AccessToken, lifetime: Duration) -> Self {
        *self.held.get_mut() = Some(HeldToken {
            access: token,
            refresh: None,
            expires_at: Utc::now() + lifetime,
        });
        self
    }

    /// Returns a token that is valid right now, obtaining one if needed.
    pub async fn ensure_token(&self) -> Result<AccessToken, AuthError> {
        let mut held = self.held.lock().await;

        if let Some(token) = held
            .as_ref()
            .filter(|t| t.is_valid(Utc::now(), self.refresh_skew))
        {
            return Ok(token.access.clone());
        }

        let previous_refresh = held.as_ref().and_then(|t| t.refresh.clone());
        let grant = match previous_refresh.as_deref() {
            Some(refresh_token) => {
                info!("Access token expired, refreshing silently");
                match self.source.refresh(refresh_token).await {
                    Ok(grant) => grant,
                    Err(err) => {
                        warn!(error = %err, "Silent refresh failed, dropping held credentials");
                        *held = None;
                        return Err(err);
                    }
                }
            }
            None => self.request_consent().await?,
        };

        let token = HeldToken::from_grant(grant, previous_refresh, Utc::now());
        let access = token.access.clone();
        info!(expires_at = %token.expires_at, "Access token granted");
        *held = Some(token);
        Ok(access)
    }

    /// Runs `continuation` exactly once, after a valid token is available.
    /// On authentication failure the continuation is never invoked.
    pub async fn with_token<F, Fut, R>(&self, continuation: F) -> Result<R, AuthError>
    where
        F: FnOnce(AccessToken) -> Fut,
        Fut: Future<Output = R>,
    {
        let token = self.ensure_token().await?;
        Ok(continuation(token).await)
    }

    /// Forces the next `ensure_token` to refresh (or re-consent).
    pub async fn invalidate(&self) {
        if let Some(token) = self.held.lock().await.as_mut() {
            token.expire();
        }
    }

    pub async fn has_valid_token(&self) -> bool {
        self.held
            .lock()
            .await
            .as_ref()
            .is_some_and(|t| t.is_valid(Utc::now(), self.refresh_skew))
    }

    async fn request_consent(&self) -> Result<super::token::TokenGrant, AuthError> {
        let url = self.source.consent_url()?;
        let prompt = Arc::clone(&self.prompt);
        let code = tokio::task::spawn_blocking(move || prompt.request_code(&url))
            .await
            .map_err(|e| AuthError::Prompt(e.to_string()))??;
        self.source.exchange_code(&code).await
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("refresh_skew", &self.refresh_skew)
            .finish_non_exhaustive()
    }
}
