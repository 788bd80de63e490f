// cwv-deploy library - Core Web Vitals provisioning for Google Tag Manager
// This exposes the core components for the binary and integration tests

pub mod alerting;
pub mod auth;
pub mod cli;
pub mod config;
pub mod tagmanager;
pub mod telemetry;
pub mod workflows;

// Re-export key types for easy access
pub use alerting::{AlertDecision, AlertError, AlertService};
pub use auth::{AccessToken, AuthError, Authenticator};
pub use config::CwvDeployConfig;
pub use tagmanager::{CreationError, ResourceApi, TagManagerClient};
pub use telemetry::{create_provisioning_span, generate_correlation_id, init_telemetry};
pub use workflows::{
    ProvisioningOutcome, ProvisioningPhase, ProvisioningWorkflow, StatusReporter, WorkflowContext,
};
