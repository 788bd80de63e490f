//! OAuth access for the Google APIs the tool talks to.

pub mod consent;
pub mod controller;
pub mod errors;
pub mod oauth;
pub mod token;

pub use consent::{ConsentPrompt, TerminalConsent};
pub use controller::Authenticator;
pub use errors::AuthError;
pub use oauth::{OAuthClient, PreIssuedTokenSource, TokenSource, BIGQUERY_SCOPE, TAG_MANAGER_SCOPE};
pub use token::{AccessToken, TokenGrant};
