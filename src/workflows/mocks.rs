use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::auth::consent::MockConsentPrompt;
use crate::auth::{AccessToken, AuthError, Authenticator, TokenGrant, TokenSource};
use crate::tagmanager::{CreationError, ResourceApi, ResourceId, ResourceKind, ResourceRequest};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub kind: ResourceKind,
    pub name: String,
    pub body: Value,
    pub token: String,
}

#[derive(Debug, Clone, Default)]
struct Script {
    delay: Duration,
    failure: Option<CreationError>,
    expires: Option<Arc<Authenticator>>,
}

/// Resource API double. Calls are recorded when issued, before any scripted
/// delay, so "was this request sent" does not depend on completion.
#[derive(Debug, Default)]
pub struct ScriptedResourceApi {
    calls: Mutex<Vec<RecordedCall>>,
    scripts: HashMap<String, Script>,
    next_id: AtomicU64,
}

impl ScriptedResourceApi {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(100),
            ..Self::default()
        }
    }

    /// Fails the request whose resource name is `name`.
    pub fn failing(mut self, name: &str, error: CreationError) -> Self {
        self.scripts.entry(name.to_string()).or_default().failure = Some(error);
        self
    }

    /// Delays the response for `name`; combine with paused time to control
    /// completion order.
    pub fn delayed(mut self, name: &str, delay: Duration) -> Self {
        self.scripts.entry(name.to_string()).or_default().delay = delay;
        self
    }

    /// Expires the token held by `auth` once the request for `name` has
    /// succeeded, so the next stage has to authenticate again.
    pub fn expiring_token_after(mut self, name: &str, auth: Arc<Authenticator>) -> Self {
        self.scripts.entry(name.to_string()).or_default().expires = Some(auth);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_of(&self, kind: ResourceKind) -> Vec<RecordedCall> {
        self.calls().into_iter().filter(|c| c.kind == kind).collect()
    }
}

#[async_trait]
impl ResourceApi for ScriptedResourceApi {
    async fn create(
        &self,
        token: &AccessToken,
        request: &ResourceRequest,
    ) -> Result<ResourceId, CreationError> {
        self.calls.lock().unwrap().push(RecordedCall {
            kind: request.kind(),
            name: request.name.clone(),
            body: request.to_body(),
            token: token.secret().to_string(),
        });

        let script = self.scripts.get(&request.name).cloned().unwrap_or_default();
        if !script.delay.is_zero() {
            tokio::time::sleep(script.delay).await;
        }
        match script.failure {
            Some(error) => Err(error),
            None => {
                if let Some(auth) = &script.expires {
                    auth.invalidate().await;
                }
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                Ok(ResourceId(id.to_string()))
            }
        }
    }
}

/// Token source that is never expected to be reached.
pub struct UnreachableTokenSource;

#[async_trait]
impl TokenSource for UnreachableTokenSource {
    fn consent_url(&self) -> Result<String, AuthError> {
        Ok("https://accounts.example/consent".to_string())
    }

    async fn exchange_code(&self, _code: &str) -> Result<TokenGrant, AuthError> {
        Err(AuthError::Transport("token source should not be called".to_string()))
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<TokenGrant, AuthError> {
        Err(AuthError::Transport("token source should not be called".to_string()))
    }
}

/// Authenticator already holding a valid token; any consent attempt panics.
pub fn seeded_authenticator(token: &str) -> Arc<Authenticator> {
    Arc::new(
        Authenticator::new(Arc::new(UnreachableTokenSource), Arc::new(MockConsentPrompt::new()))
            .with_initial_token(AccessToken::new(token), chrono::Duration::hours(1)),
    )
}

/// Seeded authenticator that cannot renew: once the token expires, the
/// operator declines consent.
pub fn non_renewing_authenticator(token: &str) -> Arc<Authenticator> {
    let mut prompt = MockConsentPrompt::new();
    prompt
        .expect_request_code()
        .returning(|_| Err(AuthError::ConsentDenied("operator declined".to_string())));
    Arc::new(
        Authenticator::new(Arc::new(UnreachableTokenSource), Arc::new(prompt))
            .with_initial_token(AccessToken::new(token), chrono::Duration::hours(1)),
    )
}

/// Authenticator whose operator declines consent.
pub fn denying_authenticator() -> Arc<Authenticator> {
    let mut prompt = MockConsentPrompt::new();
    prompt
        .expect_request_code()
        .returning(|_| Err(AuthError::ConsentDenied("operator declined".to_string())));
    Arc::new(Authenticator::new(Arc::new(UnreachableTokenSource), Arc::new(prompt)))
}
