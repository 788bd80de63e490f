//! Provisioning workflow: operator context, stage machine, driver and reporter.

pub mod context;
pub mod provisioning;
pub mod reporter;
pub mod state_machine;

#[cfg(test)]
pub mod mocks;

pub use context::{ContextError, WorkflowContext};
pub use provisioning::{CreatedResource, ProvisioningOutcome, ProvisioningWorkflow};
pub use reporter::{StatusMessage, StatusReporter};
pub use state_machine::{ProvisioningEvent, ProvisioningMachine, ProvisioningPhase};
