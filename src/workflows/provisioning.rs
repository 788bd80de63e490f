use statig::prelude::*;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, Instrument};

use super::context::WorkflowContext;
use super::reporter::StatusReporter;
use super::state_machine::{ProvisioningEvent, ProvisioningMachine, ProvisioningPhase};
use crate::auth::Authenticator;
use crate::tagmanager::resources::{
    event_tag_request, trigger_request, variable_request, vitals_tag_request,
};
use crate::tagmanager::{ResourceApi, ResourceId, ResourceKind, ResourceRequest, VitalsVariable, WorkspacePath};
use crate::telemetry::{create_provisioning_span, generate_correlation_id};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedResource {
    pub kind: ResourceKind,
    pub name: String,
    pub id: ResourceId,
}

/// Where a run ended and what it left behind in the workspace.
#[derive(Debug, Clone)]
pub struct ProvisioningOutcome {
    pub phase: ProvisioningPhase,
    pub failed_at: Option<ProvisioningPhase>,
    pub failure: Option<String>,
    pub trigger_id: Option<ResourceId>,
    /// Created resources in the order their creation was confirmed.
    pub resources: Vec<CreatedResource>,
}

impl ProvisioningOutcome {
    pub fn is_done(&self) -> bool {
        self.phase == ProvisioningPhase::Done
    }

    pub fn created(&self, kind: ResourceKind) -> impl Iterator<Item = &CreatedResource> {
        self.resources.iter().filter(move |r| r.kind == kind)
    }
}

/// Drives a [`ProvisioningMachine`] against the Tag Manager API.
///
/// Runs are not idempotent: running twice against the same workspace
/// creates a second copy of every resource.
pub struct ProvisioningWorkflow {
    context: WorkflowContext,
    api: Arc<dyn ResourceApi>,
    auth: Arc<Authenticator>,
    reporter: Arc<StatusReporter>,
}

impl ProvisioningWorkflow {
    pub fn new(
        context: WorkflowContext,
        api: Arc<dyn ResourceApi>,
        auth: Arc<Authenticator>,
        reporter: Arc<StatusReporter>,
    ) -> Self {
        Self {
            context,
            api,
            auth,
            reporter,
        }
    }

    pub fn context(&self) -> &WorkflowContext {
        &self.context
    }

    pub fn reporter(&self) -> &Arc<StatusReporter> {
        &self.reporter
    }

    /// Runs every stage until DONE or FAILED. Remote resources created before
    /// a failure are left in place.
    pub async fn run(&self) -> ProvisioningOutcome {
        let correlation_id = generate_correlation_id();
        let parent = self.context.workspace_path();
        let span = create_provisioning_span(&parent.to_string(), &correlation_id);
        self.drive(parent).instrument(span).await
    }

    async fn drive(&self, parent: WorkspacePath) -> ProvisioningOutcome {
        self.reporter.clear();
        let mut resources = Vec::new();
        let mut sm = ProvisioningMachine::new().state_machine();
        sm.handle(&ProvisioningEvent::Start);

        loop {
            let phase = sm.inner().phase();
            let event = match phase {
                ProvisioningPhase::Authenticating => self.authorize().await,
                ProvisioningPhase::CreateTag => {
                    match self.create_one(phase, vitals_tag_request(&parent), &mut resources).await {
                        Ok(id) => ProvisioningEvent::TagCreated { id },
                        Err(failed) => failed,
                    }
                }
                ProvisioningPhase::CreateTrigger => {
                    match self.create_one(phase, trigger_request(&parent), &mut resources).await {
                        Ok(id) => ProvisioningEvent::TriggerCreated { id },
                        Err(failed) => failed,
                    }
                }
                ProvisioningPhase::CreateVariables => {
                    self.create_variables(&parent, &mut sm, &mut resources).await;
                    continue;
                }
                ProvisioningPhase::CreateEventTag => match sm.inner().trigger_id().cloned() {
                    Some(trigger_id) => {
                        let request =
                            event_tag_request(&parent, self.context.measurement_id(), &trigger_id);
                        match self.create_one(phase, request, &mut resources).await {
                            Ok(id) => ProvisioningEvent::EventTagCreated { id },
                            Err(failed) => failed,
                        }
                    }
                    None => {
                        let reason = "no trigger id was captured".to_string();
                        self.reporter.report_failure(phase.label(), reason.clone());
                        ProvisioningEvent::StageFailed { reason }
                    }
                },
                ProvisioningPhase::Init | ProvisioningPhase::Done | ProvisioningPhase::Failed => {
                    break
                }
            };
            sm.handle(&event);
        }

        let machine = sm.inner();
        info!(phase = %machine.phase(), created = resources.len(), "Provisioning finished");
        ProvisioningOutcome {
            phase: machine.phase(),
            failed_at: machine.failed_at(),
            failure: machine.failure().map(str::to_string),
            trigger_id: machine.trigger_id().cloned(),
            resources,
        }
    }

    async fn authorize(&self) -> ProvisioningEvent {
        match self.auth.ensure_token().await {
            Ok(_) => ProvisioningEvent::TokenGranted,
            Err(err) => {
                let reason = format!("Authentication failed: {err}");
                self.reporter
                    .report_failure(ProvisioningPhase::Authenticating.label(), reason.clone());
                ProvisioningEvent::AuthFailed { reason }
            }
        }
    }

    /// Issues a single creation call once a token is available. The error
    /// side is the event that moves the machine to FAILED.
    async fn create_one(
        &self,
        phase: ProvisioningPhase,
        request: ResourceRequest,
        resources: &mut Vec<CreatedResource>,
    ) -> Result<ResourceId, ProvisioningEvent> {
        let kind = request.kind();
        let name = request.name.clone();
        let api = Arc::clone(&self.api);

        let result = self
            .auth
            .with_token(|token| async move { api.create(&token, &request).await })
            .await;

        match result {
            Ok(Ok(id)) => {
                self.reporter
                    .report_success(phase.label(), format!("Created {kind} \"{name}\" ({id})"));
                resources.push(CreatedResource { kind, name, id: id.clone() });
                Ok(id)
            }
            Ok(Err(err)) => {
                let reason = format!("Failed to create {kind} \"{name}\": {err}");
                self.reporter.report_failure(phase.label(), reason.clone());
                Err(ProvisioningEvent::StageFailed { reason })
            }
            Err(err) => {
                let reason = format!("Authentication failed: {err}");
                self.reporter.report_failure(phase.label(), reason.clone());
                Err(ProvisioningEvent::AuthFailed { reason })
            }
        }
    }

    /// Fan-out/join: every variable is created concurrently and the machine is
    /// fed results in completion order. The first failure ends the stage;
    /// siblings already in flight are detached and their results dropped.
    async fn create_variables(
        &self,
        parent: &WorkspacePath,
        sm: &mut StateMachine<ProvisioningMachine>,
        resources: &mut Vec<CreatedResource>,
    ) {
        let stage = ProvisioningPhase::CreateVariables.label();

        let token = match self.auth.ensure_token().await {
            Ok(token) => token,
            Err(err) => {
                let reason = format!("Authentication failed: {err}");
                self.reporter.report_failure(stage, reason.clone());
                sm.handle(&ProvisioningEvent::AuthFailed { reason });
                return;
            }
        };

        let mut pending = JoinSet::new();
        for variable in VitalsVariable::ALL {
            let api = Arc::clone(&self.api);
            let token = token.clone();
            let request = variable_request(parent, variable);
            pending.spawn(async move { (variable, api.create(&token, &request).await) });
        }

        while let Some(joined) = pending.join_next().await {
            let event = match joined {
                Ok((variable, Ok(id))) => {
                    self.reporter.report_success(
                        stage,
                        format!("Created variable \"{}\" ({id})", variable.name()),
                    );
                    resources.push(CreatedResource {
                        kind: ResourceKind::Variable,
                        name: variable.name().to_string(),
                        id: id.clone(),
                    });
                    ProvisioningEvent::VariableCreated { variable, id }
                }
                Ok((variable, Err(err))) => {
                    let reason = format!("Failed to create variable \"{}\": {err}", variable.name());
                    self.reporter.report_failure(stage, reason.clone());
                    ProvisioningEvent::StageFailed { reason }
                }
                Err(join_err) => {
                    let reason = format!("Variable creation task did not complete: {join_err}");
                    self.reporter.report_failure(stage, reason.clone());
                    ProvisioningEvent::StageFailed { reason }
                }
            };

            sm.handle(&event);
            if sm.inner().phase() != ProvisioningPhase::CreateVariables {
                break;
            }
        }
        pending.detach_all();

        if sm.inner().phase() == ProvisioningPhase::CreateVariables {
            let reason = format!(
                "{} variable creations never reported back",
                sm.inner().outstanding_variables()
            );
            self.reporter.report_failure(stage, reason.clone());
            sm.handle(&ProvisioningEvent::StageFailed { reason });
        }
    }
}

impl std::fmt::Debug for ProvisioningWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisioningWorkflow")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
