use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::fmt;

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_LIFETIME_SECS: i64 = 3600;

/// Upper bound on an advertised lifetime; Google never issues tokens longer
/// than a day.
const MAX_LIFETIME_SECS: i64 = 86_400;

/// Bearer credential for Google APIs. Debug output never shows the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Successful response of the OAuth token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// The token currently held by the authenticator.
#[derive(Debug, Clone)]
pub(crate) struct HeldToken {
    pub(crate) access: AccessToken,
    pub(crate) refresh: Option<String>,
    pub(crate) expires_at: DateTime<Utc>,
}

impl HeldToken {
    /// Refresh responses usually omit the refresh token, so the previous one
    /// is carried over.
    pub(crate) fn from_grant(grant: TokenGrant, previous_refresh: Option<String>, now: DateTime<Utc>) -> Self {
        let lifetime = grant
            .expires_in
            .unwrap_or(DEFAULT_LIFETIME_SECS)
            .clamp(0, MAX_LIFETIME_SECS);
        Self {
            access: AccessToken::new(grant.access_token),
            refresh: grant.refresh_token.or(previous_refresh),
            expires_at: now + Duration::seconds(lifetime),
        }
    }

    pub(crate) fn is_valid(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        now + skew < self.expires_at
    }

    pub(crate) fn expire(&mut self) {
        self.expires_at = DateTime::<Utc>::MIN_UTC;
    }
}
