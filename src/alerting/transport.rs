use async_trait::async_trait;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing::info;

use super::errors::AlertError;
use super::message::AlertMessage;

/// Delivery of a composed alert to its recipients.
#[async_trait]
pub trait AlertTransport: Send + Sync {
    async fn send(&self, message: &AlertMessage) -> Result<(), AlertError>;
}

/// Writes rendered messages to stdout or appends them to a file, for a mail
/// relay or a human to pick up.
#[derive(Debug, Clone)]
pub enum OutboxTransport {
    Stdout,
    File(PathBuf),
}

#[async_trait]
impl AlertTransport for OutboxTransport {
    async fn send(&self, message: &AlertMessage) -> Result<(), AlertError> {
        if message.to.is_empty() {
            return Err(AlertError::InvalidConfig("no alert recipients configured".to_string()));
        }
        let rendered = format!("{}\r\n", message.render());

        match self {
            OutboxTransport::Stdout => {
                let mut stdout = tokio::io::stdout();
                stdout
                    .write_all(rendered.as_bytes())
                    .await
                    .map_err(|e| AlertError::Transport(e.to_string()))?;
                stdout
                    .flush()
                    .await
                    .map_err(|e| AlertError::Transport(e.to_string()))?;
            }
            OutboxTransport::File(path) => {
                let mut file = tokio::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .await
                    .map_err(|e| AlertError::Transport(format!("{}: {e}", path.display())))?;
                file.write_all(rendered.as_bytes())
                    .await
                    .map_err(|e| AlertError::Transport(format!("{}: {e}", path.display())))?;
                file.flush()
                    .await
                    .map_err(|e| AlertError::Transport(format!("{}: {e}", path.display())))?;
            }
        }

        info!(recipients = message.to.len(), "Alert written to outbox");
        Ok(())
    }
}
