use statig::prelude::*;
use std::collections::BTreeMap;
use std::fmt;

use crate::tagmanager::{ResourceId, VitalsVariable};

/// Observable stage of a provisioning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProvisioningPhase {
    Init,
    Authenticating,
    CreateTag,
    CreateTrigger,
    CreateVariables,
    CreateEventTag,
    Done,
    Failed,
}

impl ProvisioningPhase {
    pub fn label(&self) -> &'static str {
        match self {
            ProvisioningPhase::Init => "INIT",
            ProvisioningPhase::Authenticating => "AUTHENTICATING",
            ProvisioningPhase::CreateTag => "CREATE_TAG",
            ProvisioningPhase::CreateTrigger => "CREATE_TRIGGER",
            ProvisioningPhase::CreateVariables => "CREATE_VARIABLES",
            ProvisioningPhase::CreateEventTag => "CREATE_EVENT_TAG",
            ProvisioningPhase::Done => "DONE",
            ProvisioningPhase::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProvisioningPhase::Done | ProvisioningPhase::Failed)
    }
}

impl fmt::Display for ProvisioningPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningEvent {
    Start,
    TokenGranted,
    AuthFailed { reason: String },
    TagCreated { id: ResourceId },
    TriggerCreated { id: ResourceId },
    VariableCreated { variable: VitalsVariable, id: ResourceId },
    EventTagCreated { id: ResourceId },
    StageFailed { reason: String },
}

/// Stage transitions and the identifiers threaded between stages. Holds no
/// I/O; the async driver performs the calls and feeds results back as events.
#[derive(Debug, Default)]
pub struct ProvisioningMachine {
    phase: Option<ProvisioningPhase>,
    failed_at: Option<ProvisioningPhase>,
    failure: Option<String>,
    tag_id: Option<ResourceId>,
    trigger_id: Option<ResourceId>,
    variable_ids: BTreeMap<VitalsVariable, ResourceId>,
    /// Join counter for the variables stage.
    outstanding_variables: usize,
    event_tag_id: Option<ResourceId>,
}

impl ProvisioningMachine {
    pub fn new() -> Self {
        Self::default()
    }

    fn fail(&mut self, reason: &str) -> Outcome<State> {
        let at = self.phase();
        tracing::warn!(stage = %at, reason = %reason, "Provisioning failed");
        self.failed_at = Some(at);
        self.failure = Some(reason.to_string());
        self.phase = Some(ProvisioningPhase::Failed);
        Transition(State::failed())
    }

    fn enter(&mut self, phase: ProvisioningPhase) {
        tracing::info!(stage = %phase, "Entering stage");
        self.phase = Some(phase);
    }
}

#[state_machine(initial = "State::idle()")]
impl ProvisioningMachine {
    #[state]
    fn idle(&mut self, event: &ProvisioningEvent) -> Outcome<State> {
        match event {
            ProvisioningEvent::Start => {
                self.enter(ProvisioningPhase::Authenticating);
                Transition(State::authenticating())
            }
            _ => Handled,
        }
    }

    #[state]
    fn authenticating(&mut self, event: &ProvisioningEvent) -> Outcome<State> {
        match event {
            ProvisioningEvent::TokenGranted => {
                self.enter(ProvisioningPhase::CreateTag);
                Transition(State::create_tag())
            }
            ProvisioningEvent::AuthFailed { reason } => self.fail(reason),
            _ => Handled,
        }
    }

    #[state]
    fn create_tag(&mut self, event: &ProvisioningEvent) -> Outcome<State> {
        match event {
            ProvisioningEvent::TagCreated { id } => {
                tracing::info!(resource_id = %id, "Tag created");
                self.tag_id = Some(id.clone());
                self.enter(ProvisioningPhase::CreateTrigger);
                Transition(State::create_trigger())
            }
            ProvisioningEvent::StageFailed { reason } | ProvisioningEvent::AuthFailed { reason } => {
                self.fail(reason)
            }
            _ => Handled,
        }
    }

    #[state]
    fn create_trigger(&mut self, event: &ProvisioningEvent) -> Outcome<State> {
        match event {
            ProvisioningEvent::TriggerCreated { id } => {
                tracing::info!(resource_id = %id, "Trigger created");
                self.trigger_id = Some(id.clone());
                self.variable_ids.clear();
                self.outstanding_variables = VitalsVariable::ALL.len();
                self.enter(ProvisioningPhase::CreateVariables);
                Transition(State::create_variables())
            }
            ProvisioningEvent::StageFailed { reason } | ProvisioningEvent::AuthFailed { reason } => {
                self.fail(reason)
            }
            _ => Handled,
        }
    }

    #[state]
    fn create_variables(&mut self, event: &ProvisioningEvent) -> Outcome<State> {
        match event {
            ProvisioningEvent::VariableCreated { variable, id } => {
                // A repeated report for the same variable must not count twice.
                if self.variable_ids.insert(*variable, id.clone()).is_none() {
                    self.outstanding_variables = self.outstanding_variables.saturating_sub(1);
                }
                tracing::info!(
                    variable = variable.name(),
                    resource_id = %id,
                    outstanding = self.outstanding_variables,
                    "Variable created"
                );
                if self.outstanding_variables == 0 {
                    self.enter(ProvisioningPhase::CreateEventTag);
                    Transition(State::create_event_tag())
                } else {
                    Handled
                }
            }
            ProvisioningEvent::StageFailed { reason } | ProvisioningEvent::AuthFailed { reason } => {
                self.outstanding_variables = 0;
                self.fail(reason)
            }
            _ => Handled,
        }
    }

    #[state]
    fn create_event_tag(&mut self, event: &ProvisioningEvent) -> Outcome<State> {
        match event {
            ProvisioningEvent::EventTagCreated { id } => {
                tracing::info!(resource_id = %id, "Event tag created");
                self.event_tag_id = Some(id.clone());
                self.enter(ProvisioningPhase::Done);
                Transition(State::done())
            }
            ProvisioningEvent::StageFailed { reason } | ProvisioningEvent::AuthFailed { reason } => {
                self.fail(reason)
            }
            _ => Handled,
        }
    }

    #[state]
    fn done(&mut self, event: &ProvisioningEvent) -> Outcome<State> {
        tracing::debug!(?event, "Ignoring event after completion");
        Handled
    }

    #[state]
    fn failed(&mut self, event: &ProvisioningEvent) -> Outcome<State> {
        tracing::debug!(?event, "Ignoring event after failure");
        Handled
    }
}

impl ProvisioningMachine {
    pub fn phase(&self) -> ProvisioningPhase {
        self.phase.unwrap_or(ProvisioningPhase::Init)
    }

    /// Stage that was active when the run failed.
    pub fn failed_at(&self) -> Option<ProvisioningPhase> {
        self.failed_at
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn tag_id(&self) -> Option<&ResourceId> {
        self.tag_id.as_ref()
    }

    pub fn trigger_id(&self) -> Option<&ResourceId> {
        self.trigger_id.as_ref()
    }

    pub fn variable_ids(&self) -> &BTreeMap<VitalsVariable, ResourceId> {
        &self.variable_ids
    }

    pub fn outstanding_variables(&self) -> usize {
        self.outstanding_variables
    }

    pub fn event_tag_id(&self) -> Option<&ResourceId> {
        self.event_tag_id.as_ref()
    }
}
