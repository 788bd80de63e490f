use anyhow::{bail, Result};
use std::sync::Arc;

use super::{build_authenticator, value_or_prompt, Command};
use crate::auth::TAG_MANAGER_SCOPE;
use crate::config::CwvDeployConfig;
use crate::tagmanager::{ResourceKind, TagManagerClient};
use crate::workflows::{ProvisioningWorkflow, StatusReporter, WorkflowContext};

pub struct ProvisionCommand {
    pub config: CwvDeployConfig,
    pub account: Option<String>,
    pub container: Option<String>,
    pub workspace: Option<String>,
    pub measurement_id: Option<String>,
    pub access_token: Option<String>,
}

impl Command for ProvisionCommand {
    async fn execute(&self) -> Result<()> {
        let context = WorkflowContext::new(
            &value_or_prompt(self.account.clone(), "Tag Manager account id")?,
            &value_or_prompt(self.container.clone(), "Container id")?,
            &value_or_prompt(self.workspace.clone(), "Workspace id")?,
            &value_or_prompt(self.measurement_id.clone(), "GA4 measurement id")?,
        )?;

        println!("🔄 Provisioning Core Web Vitals in {}", context.workspace_path());
        println!();

        let auth = build_authenticator(
            &self.config.oauth,
            &[TAG_MANAGER_SCOPE],
            self.access_token.clone(),
        )?;
        let client = TagManagerClient::new(&self.config.tag_manager)?;
        let reporter = Arc::new(StatusReporter::with_echo());

        let workflow = ProvisioningWorkflow::new(context, Arc::new(client), auth, reporter);
        let outcome = workflow.run().await;

        println!();
        if outcome.is_done() {
            println!("🎉 Core Web Vitals provisioning complete");
            println!(
                "   {} variables, trigger {}, event tag {}",
                outcome.created(ResourceKind::Variable).count(),
                outcome
                    .trigger_id
                    .as_ref()
                    .map(|id| id.to_string())
                    .unwrap_or_default(),
                outcome
                    .created(ResourceKind::EventTag)
                    .next()
                    .map(|r| r.id.to_string())
                    .unwrap_or_default(),
            );
            return Ok(());
        }

        if !outcome.resources.is_empty() {
            println!("⚠️  These resources were created before the failure and remain in the workspace:");
            for resource in &outcome.resources {
                println!("   • {} \"{}\" ({})", resource.kind, resource.name, resource.id);
            }
        }
        bail!(
            "Provisioning failed during {}",
            outcome
                .failed_at
                .map(|phase| phase.label())
                .unwrap_or("an unknown stage")
        )
    }
}
