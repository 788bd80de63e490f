use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Consent was not granted: {0}")]
    ConsentDenied(String),
    #[error("Could not read the authorization code: {0}")]
    Prompt(String),
    #[error("Token exchange failed: {error}{}", describe(.description))]
    TokenExchange {
        error: String,
        description: Option<String>,
    },
    #[error("Token endpoint unreachable: {0}")]
    Transport(String),
    #[error("Invalid OAuth configuration: {0}")]
    InvalidConfig(String),
}

fn describe(description: &Option<String>) -> String {
    description
        .as_deref()
        .map(|d| format!(" ({d})"))
        .unwrap_or_default()
}
