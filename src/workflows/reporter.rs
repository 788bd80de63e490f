use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub stage: String,
    pub detail: String,
}

/// Append-only success and error streams shown to the operator.
///
/// Reports arrive from the driver in the order they were produced, which for
/// the variables stage is completion order. With `echo` enabled every report
/// is also printed as it arrives.
#[derive(Debug, Default)]
pub struct StatusReporter {
    successes: Mutex<Vec<StatusMessage>>,
    errors: Mutex<Vec<StatusMessage>>,
    echo: bool,
}

impl StatusReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_echo() -> Self {
        Self {
            echo: true,
            ..Self::default()
        }
    }

    pub fn report_success(&self, stage: &str, detail: impl Into<String>) {
        let message = StatusMessage {
            stage: stage.to_string(),
            detail: detail.into(),
        };
        tracing::info!(stage = %message.stage, detail = %message.detail, "Stage succeeded");
        if self.echo {
            println!("✅ {}: {}", message.stage, message.detail);
        }
        lock(&self.successes).push(message);
    }

    pub fn report_failure(&self, stage: &str, detail: impl Into<String>) {
        let message = StatusMessage {
            stage: stage.to_string(),
            detail: detail.into(),
        };
        tracing::error!(stage = %message.stage, detail = %message.detail, "Stage failed");
        if self.echo {
            println!("❌ {}: {}", message.stage, message.detail);
        }
        lock(&self.errors).push(message);
    }

    pub fn successes(&self) -> Vec<StatusMessage> {
        lock(&self.successes).clone()
    }

    pub fn errors(&self) -> Vec<StatusMessage> {
        lock(&self.errors).clone()
    }

    /// Only called when a run restarts.
    pub(crate) fn clear(&self) {
        lock(&self.successes).clear();
        lock(&self.errors).clear();
    }
}

fn lock(stream: &Mutex<Vec<StatusMessage>>) -> std::sync::MutexGuard<'_, Vec<StatusMessage>> {
    // A poisoned stream still holds every message appended before the panic.
    stream.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
