use anyhow::{Context, Result};
use std::path::PathBuf;

use super::{build_authenticator, value_or_prompt, Command};
use crate::auth::TAG_MANAGER_SCOPE;
use crate::config::CwvDeployConfig;
use crate::tagmanager::resources::{template_request, BUNDLED_TEMPLATE, TEMPLATE_NAME};
use crate::tagmanager::{ResourceApi, TagManagerClient, WorkspacePath};

pub struct TemplateCommand {
    pub config: CwvDeployConfig,
    pub account: Option<String>,
    pub container: Option<String>,
    pub workspace: Option<String>,
    pub template_file: Option<PathBuf>,
    pub name: Option<String>,
    pub access_token: Option<String>,
}

impl TemplateCommand {
    async fn template_data(&self) -> Result<String> {
        match &self.template_file {
            Some(path) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read template {}", path.display())),
            None => Ok(BUNDLED_TEMPLATE.to_string()),
        }
    }
}

impl Command for TemplateCommand {
    async fn execute(&self) -> Result<()> {
        let account = value_or_prompt(self.account.clone(), "Tag Manager account id")?;
        let container = value_or_prompt(self.container.clone(), "Container id")?;
        let workspace = value_or_prompt(self.workspace.clone(), "Workspace id")?;
        for (field, value) in [("account", &account), ("container", &container), ("workspace", &workspace)] {
            anyhow::ensure!(!value.is_empty(), "{field} must not be empty");
        }
        let parent = WorkspacePath::new(account, container, workspace);
        let name = self.name.as_deref().unwrap_or(TEMPLATE_NAME);
        let request = template_request(&parent, name, self.template_data().await?);

        println!("🔄 Deploying template \"{name}\" to {parent}");

        let auth = build_authenticator(
            &self.config.oauth,
            &[TAG_MANAGER_SCOPE],
            self.access_token.clone(),
        )?;
        let client = TagManagerClient::new(&self.config.tag_manager)?;

        let created = auth
            .with_token(|token| async move { client.create(&token, &request).await })
            .await?;

        match created {
            Ok(id) => {
                println!("✅ Template created ({id})");
                Ok(())
            }
            Err(err) => {
                println!("❌ Unable to deploy CWV template: {err}");
                Err(err).context("Template deployment failed")
            }
        }
    }
}
