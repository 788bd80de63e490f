use thiserror::Error;

use crate::auth::AuthError;

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("Could not decode event: {0}")]
    InvalidEvent(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("Warehouse query failed: {0}")]
    Warehouse(String),
    #[error("Could not deliver alert: {0}")]
    Transport(String),
    #[error("Invalid alerting configuration: {0}")]
    InvalidConfig(String),
}
