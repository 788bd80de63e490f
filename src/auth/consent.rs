use std::io::{BufRead, Write};

use super::errors::AuthError;

/// Interactive step of the consent flow: show the URL, collect the code.
#[cfg_attr(test, mockall::automock)]
pub trait ConsentPrompt: Send + Sync {
    fn request_code(&self, consent_url: &str) -> Result<String, AuthError>;
}

/// Prompts on the controlling terminal. Blocks until the operator answers.
#[derive(Debug, Default)]
pub struct TerminalConsent;

impl ConsentPrompt for TerminalConsent {
    fn request_code(&self, consent_url: &str) -> Result<String, AuthError> {
        println!("🔑 Please visit this URL to authorise the tool:");
        println!("   {consent_url}");
        print!("📋 Please enter the authorization code: ");
        std::io::stdout()
            .flush()
            .map_err(|e| AuthError::Prompt(e.to_string()))?;

        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| AuthError::Prompt(e.to_string()))?;

        parse_code(&line)
    }
}

/// An empty answer is treated as the operator declining.
pub(crate) fn parse_code(input: &str) -> Result<String, AuthError> {
    let code = input.trim();
    if code.is_empty() {
        return Err(AuthError::ConsentDenied(
            "no authorization code entered".to_string(),
        ));
    }
    Ok(code.to_string())
}
