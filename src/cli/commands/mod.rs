use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::sync::Arc;

use crate::auth::{
    AccessToken, Authenticator, OAuthClient, PreIssuedTokenSource, TerminalConsent, TokenSource,
};
use crate::config::{CwvDeployConfig, OAuthConfig};

pub mod alert;
pub mod init;
pub mod provision;
pub mod template;

pub use alert::AlertCommand;
pub use init::InitCommand;
pub use provision::ProvisionCommand;
pub use template::TemplateCommand;

/// Tokens passed on the command line are assumed to be freshly minted.
const PRE_ISSUED_TOKEN_MINUTES: i64 = 55;

#[allow(async_fn_in_trait)]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}

/// Applies `--client-id` / `--client-secret` over the loaded configuration.
pub fn apply_oauth_overrides(
    config: &mut CwvDeployConfig,
    client_id: Option<String>,
    client_secret: Option<String>,
) {
    if let Some(id) = client_id {
        config.oauth.client_id = id;
    }
    if let Some(secret) = client_secret {
        config.oauth.client_secret = secret;
    }
}

/// Authenticator for the given scopes. With `--access-token` the token is used
/// as-is and the OAuth client is only needed once it expires.
pub fn build_authenticator(
    oauth: &OAuthConfig,
    scopes: &[&str],
    access_token: Option<String>,
) -> Result<Arc<Authenticator>> {
    let source: Arc<dyn TokenSource> = match (OAuthClient::new(oauth.clone(), scopes), &access_token) {
        (Ok(client), _) => Arc::new(client),
        (Err(err), Some(_)) => {
            tracing::debug!(error = %err, "No OAuth client configured, relying on the supplied token");
            Arc::new(PreIssuedTokenSource)
        }
        (Err(err), None) => {
            return Err(err).context(
                "An OAuth client is required: pass --client-id and --client-secret, or --access-token",
            )
        }
    };

    let mut auth = Authenticator::new(source, Arc::new(TerminalConsent));
    if let Some(token) = access_token {
        auth = auth.with_initial_token(
            AccessToken::new(token),
            chrono::Duration::minutes(PRE_ISSUED_TOKEN_MINUTES),
        );
    }
    Ok(Arc::new(auth))
}

/// Returns `value`, or asks the operator for it when missing or blank.
pub fn value_or_prompt(value: Option<String>, label: &str) -> Result<String> {
    if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
        return Ok(value);
    }

    print!("📝 {label}: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .with_context(|| format!("Failed to read {label}"))?;
    Ok(line.trim().to_string())
}
