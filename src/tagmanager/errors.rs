use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreationErrorKind {
    /// The request never produced an HTTP response.
    Transport,
    /// The API answered with an error document.
    Api { code: u16, status: Option<String> },
    /// The API answered 2xx but the body did not carry an identifier.
    InvalidResponse,
}

/// Failure of a single create call. `message` is the remote text, verbatim.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct CreationError {
    pub kind: CreationErrorKind,
    pub message: String,
}

impl CreationError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: CreationErrorKind::Transport,
            message: message.into(),
        }
    }

    pub fn api(code: u16, status: Option<String>, message: impl Into<String>) -> Self {
        Self {
            kind: CreationErrorKind::Api { code, status },
            message: message.into(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self {
            kind: CreationErrorKind::InvalidResponse,
            message: message.into(),
        }
    }

    /// Builds an API error from a non-2xx response body. Google APIs wrap the
    /// detail in `{"error": {"code", "message", "status"}}`; anything else is
    /// passed through as raw text.
    pub fn from_response(http_status: u16, body: &str) -> Self {
        match serde_json::from_str::<ApiErrorEnvelope>(body) {
            Ok(envelope) => Self::api(
                envelope.error.code.unwrap_or(http_status),
                envelope.error.status,
                envelope.error.message,
            ),
            Err(_) => {
                let text = body.trim();
                let message = if text.is_empty() {
                    format!("HTTP {http_status} with empty body")
                } else {
                    text.to_string()
                };
                Self::api(http_status, None, message)
            }
        }
    }

    pub fn code(&self) -> Option<u16> {
        match &self.kind {
            CreationErrorKind::Api { code, .. } => Some(*code),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    code: Option<u16>,
    message: String,
    status: Option<String>,
}
