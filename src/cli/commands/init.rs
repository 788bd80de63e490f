use anyhow::{bail, Context, Result};
use std::path::PathBuf;

use super::Command;
use crate::config::CwvDeployConfig;

/// Writes a starter configuration file with every setting at its default.
pub struct InitCommand {
    pub output: PathBuf,
    pub force: bool,
}

impl Command for InitCommand {
    async fn execute(&self) -> Result<()> {
        if self.output.exists() && !self.force {
            bail!(
                "{} already exists, pass --force to overwrite it",
                self.output.display()
            );
        }

        CwvDeployConfig::default()
            .save_to_file(&self.output)
            .with_context(|| format!("Failed to write {}", self.output.display()))?;

        println!("✅ Wrote starter configuration to {}", self.output.display());
        println!("   Set oauth.client_id and oauth.client_secret before running provision");
        println!("   Set alerting.project_id, property_id and recipients before running alert");
        Ok(())
    }
}
