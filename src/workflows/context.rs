use thiserror::Error;

use crate::tagmanager::WorkspacePath;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
}

/// Operator inputs for one provisioning run. Fields are private so the
/// context cannot change once a run has started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowContext {
    account_id: String,
    container_id: String,
    workspace_id: String,
    measurement_id: String,
}

impl WorkflowContext {
    pub fn new(
        account_id: &str,
        container_id: &str,
        workspace_id: &str,
        measurement_id: &str,
    ) -> Result<Self, ContextError> {
        Ok(Self {
            account_id: required("account", account_id)?,
            container_id: required("container", container_id)?,
            workspace_id: required("workspace", workspace_id)?,
            measurement_id: required("measurement id", measurement_id)?,
        })
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }

    /// GA4 measurement id the event tag sends to.
    pub fn measurement_id(&self) -> &str {
        &self.measurement_id
    }

    pub fn workspace_path(&self) -> WorkspacePath {
        WorkspacePath::new(&self.account_id, &self.container_id, &self.workspace_id)
    }
}

fn required(field: &'static str, value: &str) -> Result<String, ContextError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ContextError::Empty { field });
    }
    Ok(value.to_string())
}
