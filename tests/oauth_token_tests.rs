//! Consent, refresh and error handling against a mock OAuth token endpoint.

use cwv_deploy::auth::{
    AuthError, Authenticator, ConsentPrompt, OAuthClient, TokenSource, TAG_MANAGER_SCOPE,
};
use cwv_deploy::config::OAuthConfig;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Hands out a fixed authorization code and counts how often it was asked.
struct PastedCode {
    code: &'static str,
    asked: AtomicUsize,
}

impl PastedCode {
    fn new(code: &'static str) -> Arc<Self> {
        Arc::new(Self {
            code,
            asked: AtomicUsize::new(0),
        })
    }
}

impl ConsentPrompt for PastedCode {
    fn request_code(&self, consent_url: &str) -> Result<String, AuthError> {
        assert!(consent_url.contains("access_type=offline"));
        self.asked.fetch_add(1, Ordering::SeqCst);
        Ok(self.code.to_string())
    }
}

fn client(server: &MockServer) -> OAuthClient {
    OAuthClient::new(
        OAuthConfig {
            client_id: "client-123.apps.googleusercontent.com".to_string(),
            client_secret: "shh".to_string(),
            token_uri: format!("{}/token", server.uri()),
            ..OAuthConfig::default()
        },
        &[TAG_MANAGER_SCOPE],
    )
    .unwrap()
}

async fn mock_code_exchange(server: &MockServer, expires_in: i64) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=4%2Fpasted"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.first",
            "expires_in": expires_in,
            "refresh_token": "1//refresh",
            "token_type": "Bearer",
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_consent_then_cached_token() {
    let server = MockServer::start().await;
    mock_code_exchange(&server, 3600).await;
    let prompt = PastedCode::new("4/pasted");
    let auth = Authenticator::new(Arc::new(client(&server)), prompt.clone());

    let first = auth.ensure_token().await.unwrap();
    let second = auth.ensure_token().await.unwrap();

    assert_eq!(first.secret(), "ya29.first");
    assert_eq!(second, first);
    assert_eq!(prompt.asked.load(Ordering::SeqCst), 1);
    server.verify().await;
}

#[tokio::test]
async fn test_expired_token_refreshed_silently() {
    let server = MockServer::start().await;
    mock_code_exchange(&server, 3600).await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=1%2F%2Frefresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.second",
            "expires_in": 3600,
        })))
        .expect(1)
        .mount(&server)
        .await;
    let prompt = PastedCode::new("4/pasted");
    let auth = Authenticator::new(Arc::new(client(&server)), prompt.clone());

    auth.ensure_token().await.unwrap();
    auth.invalidate().await;
    let refreshed = auth.with_token(|token| async move { token }).await.unwrap();

    assert_eq!(refreshed.secret(), "ya29.second");
    assert_eq!(prompt.asked.load(Ordering::SeqCst), 1);
    assert!(auth.has_valid_token().await);
    server.verify().await;
}

#[tokio::test]
async fn test_rejected_code_surfaces_oauth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Malformed auth code.",
        })))
        .mount(&server)
        .await;
    let auth = Authenticator::new(Arc::new(client(&server)), PastedCode::new("4/pasted"));

    let invoked = AtomicBool::new(false);
    let flag = &invoked;
    let result = auth
        .with_token(|_| async move { flag.store(true, Ordering::SeqCst) })
        .await;

    let err = result.unwrap_err();
    assert!(matches!(err, AuthError::TokenExchange { ref error, .. } if error == "invalid_grant"));
    assert_eq!(
        err.to_string(),
        "Token exchange failed: invalid_grant (Malformed auth code.)"
    );
    assert!(!invoked.load(Ordering::SeqCst));
    assert!(!auth.has_valid_token().await);
}

#[tokio::test]
async fn test_non_json_error_body_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let err = client(&server).refresh("1//refresh").await.unwrap_err();

    assert_eq!(err.to_string(), "Token exchange failed: HTTP 502 (upstream down)");
}

#[tokio::test]
async fn test_malformed_grant_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token_type": "Bearer"})))
        .mount(&server)
        .await;

    let err = client(&server).exchange_code("4/pasted").await.unwrap_err();

    assert!(matches!(err, AuthError::TokenExchange { ref error, .. } if error == "malformed_response"));
}

#[tokio::test]
async fn test_oversized_expiry_is_accepted() {
    let server = MockServer::start().await;
    mock_code_exchange(&server, i64::MAX).await;
    let auth = Authenticator::new(Arc::new(client(&server)), PastedCode::new("4/pasted"));

    let token = auth.ensure_token().await.unwrap();

    assert_eq!(token.secret(), "ya29.first");
    assert!(auth.has_valid_token().await);
}
