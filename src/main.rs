use anyhow::Result;
use clap::Parser;

use cwv_deploy::cli::commands::{
    apply_oauth_overrides, AlertCommand, Command, InitCommand, ProvisionCommand, TemplateCommand,
};
use cwv_deploy::cli::{Cli, Commands};
use cwv_deploy::{init_telemetry, CwvDeployConfig};

fn main() -> Result<()> {
    let cli = Cli::parse();

    CwvDeployConfig::load_env_file()?;
    let mut config = CwvDeployConfig::load(cli.config.as_deref())?;
    apply_oauth_overrides(&mut config, cli.client_id, cli.client_secret);
    init_telemetry(
        &config.observability.log_level,
        cli.log_json || config.observability.json_logs,
    )?;

    match cli.command {
        Commands::Provision {
            account,
            container,
            workspace,
            measurement_id,
            access_token,
        } => {
            let command = ProvisionCommand {
                config,
                account,
                container,
                workspace,
                measurement_id,
                access_token,
            };
            tokio::runtime::Runtime::new()?.block_on(async { command.execute().await })
        }
        Commands::Template {
            account,
            container,
            workspace,
            template_file,
            name,
            access_token,
        } => {
            let command = TemplateCommand {
                config,
                account,
                container,
                workspace,
                template_file,
                name,
                access_token,
            };
            tokio::runtime::Runtime::new()?.block_on(async { command.execute().await })
        }
        Commands::Alert {
            event,
            date,
            outbox,
            access_token,
        } => {
            let command = AlertCommand {
                config,
                event,
                date,
                outbox,
                access_token,
            };
            tokio::runtime::Runtime::new()?.block_on(async { command.execute().await })
        }
        Commands::Init { output, force } => {
            let command = InitCommand { output, force };
            tokio::runtime::Runtime::new()?.block_on(async { command.execute().await })
        }
    }
}
