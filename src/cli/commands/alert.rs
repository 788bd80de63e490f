use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use super::{build_authenticator, Command};
use crate::alerting::{
    AlertDecision, AlertService, BigQuerySource, Budgets, CloudEvent, OutboxTransport,
};
use crate::auth::BIGQUERY_SCOPE;
use crate::config::CwvDeployConfig;

pub struct AlertCommand {
    pub config: CwvDeployConfig,
    pub event: Option<PathBuf>,
    pub date: Option<String>,
    pub outbox: Option<PathBuf>,
    pub access_token: Option<String>,
}

impl AlertCommand {
    fn today(&self) -> Result<NaiveDate> {
        match &self.date {
            Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .with_context(|| format!("Invalid --date {raw:?}, expected YYYY-MM-DD")),
            None => Ok(Local::now().date_naive()),
        }
    }

    async fn read_event(&self) -> Result<Option<CloudEvent>> {
        let Some(path) = &self.event else {
            return Ok(None);
        };
        let body = if path.as_os_str() == "-" {
            let mut body = String::new();
            std::io::stdin()
                .read_to_string(&mut body)
                .context("Failed to read event from stdin")?;
            body
        } else {
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read event {}", path.display()))?
        };
        Ok(Some(CloudEvent::parse(&body)?))
    }
}

impl Command for AlertCommand {
    async fn execute(&self) -> Result<()> {
        let today = self.today()?;
        let event = self.read_event().await?;

        let alerting = &self.config.alerting;
        let budgets = Budgets::from_config(alerting).with_overrides(|key| std::env::var(key).ok());
        let auth = build_authenticator(&self.config.oauth, &[BIGQUERY_SCOPE], self.access_token.clone())?;
        let source = BigQuerySource::new(alerting, auth)?;
        let transport = match &self.outbox {
            Some(path) => OutboxTransport::File(path.clone()),
            None => OutboxTransport::Stdout,
        };
        let service = AlertService::new(alerting, budgets, Arc::new(source), Arc::new(transport));

        let decision = match &event {
            Some(event) => service.handle_event(event, today).await?,
            None => service.check(today).await?,
        };

        match decision {
            AlertDecision::Ignored => {
                println!("⏭️  Event is not a GA4 daily export, nothing to check");
            }
            AlertDecision::WithinBudget(_) => {
                println!("✅ Core Web Vitals are within budget");
            }
            AlertDecision::Sent(breaches) => {
                println!("🚨 {} metric(s) over budget, alert written", breaches.len());
                for breach in breaches {
                    println!(
                        "   • {} at {} ({:.0}% of {})",
                        breach.metric,
                        breach.metric.format_value(breach.value),
                        breach.percent,
                        breach.metric.format_value(breach.budget)
                    );
                }
            }
        }
        Ok(())
    }
}
