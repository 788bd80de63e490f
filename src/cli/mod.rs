use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

#[derive(Parser)]
#[command(name = "cwv-deploy")]
#[command(about = "Provision Core Web Vitals monitoring in Google Tag Manager")]
#[command(long_about = "cwv-deploy creates the tag, trigger, variables and GA4 event tag that \
                       send Core Web Vitals from a Tag Manager container to Google Analytics, \
                       and checks the exported values against performance budgets.")]
pub struct Cli {
    /// Configuration file (defaults to ./cwv-deploy.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// OAuth client id for the consent flow
    #[arg(long, global = true)]
    pub client_id: Option<String>,

    /// OAuth client secret for the consent flow
    #[arg(long, global = true)]
    pub client_secret: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the CWV tag, trigger, variables and GA4 event tag in a workspace
    Provision {
        /// Tag Manager account id
        #[arg(short = 'a', long)]
        account: Option<String>,
        /// Tag Manager container id
        #[arg(short = 'c', long)]
        container: Option<String>,
        /// Tag Manager workspace id
        #[arg(short = 'w', long)]
        workspace: Option<String>,
        /// GA4 measurement id the event tag sends to (G-XXXXXXX)
        #[arg(short = 'm', long)]
        measurement_id: Option<String>,
        /// Use an already issued access token instead of the consent flow
        #[arg(long)]
        access_token: Option<String>,
    },
    /// Deploy the CWV custom tag template to a workspace
    Template {
        #[arg(short = 'a', long)]
        account: Option<String>,
        #[arg(short = 'c', long)]
        container: Option<String>,
        #[arg(short = 'w', long)]
        workspace: Option<String>,
        /// Template file to upload instead of the bundled one
        #[arg(long)]
        template_file: Option<PathBuf>,
        /// Template name shown in Tag Manager
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        access_token: Option<String>,
    },
    /// Check exported Core Web Vitals against budgets and write an alert if any is over
    Alert {
        /// Audit-log event JSON to filter on ("-" reads stdin); omit to check unconditionally
        #[arg(long)]
        event: Option<PathBuf>,
        /// Day the window ends before (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
        /// Append the alert to this file instead of printing it
        #[arg(long)]
        outbox: Option<PathBuf>,
        #[arg(long)]
        access_token: Option<String>,
    },
    /// Write a starter configuration file
    Init {
        /// Where to write the configuration
        #[arg(short, long, default_value = "cwv-deploy.toml")]
        output: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
