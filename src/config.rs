use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for cwv-deploy
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CwvDeployConfig {
    /// OAuth client used for consent and refresh
    pub oauth: OAuthConfig,
    /// Tag Manager API settings
    pub tag_manager: TagManagerConfig,
    /// Budget check settings
    pub alerting: AlertingConfig,
    /// Observability settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Installed-app client id (can be set via env var)
    pub client_id: String,
    /// Installed-app client secret (can be set via env var)
    pub client_secret: String,
    pub auth_uri: String,
    pub token_uri: String,
    pub redirect_uri: String,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            auth_uri: "https://accounts.google.com/o/oauth2/auth".to_string(),
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
            redirect_uri: "http://localhost".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TagManagerConfig {
    pub api_base_url: String,
    /// Client-side throttle for create calls
    pub requests_per_second: u32,
    pub timeout_seconds: u64,
}

impl Default for TagManagerConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://tagmanager.googleapis.com/tagmanager/v2".to_string(),
            requests_per_second: 5,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AlertingConfig {
    /// Good-threshold for LCP in milliseconds
    pub lcp_budget_ms: f64,
    /// Good-threshold for CLS (unitless)
    pub cls_budget: f64,
    /// Good-threshold for FID in milliseconds
    pub fid_budget_ms: f64,
    /// Length of the rolling p75 window
    pub window_days: u32,
    pub email_from: String,
    pub recipients: Vec<String>,
    /// GA4 property id; the export dataset is `analytics_{property_id}`
    pub property_id: String,
    /// GCP project holding the export dataset
    pub project_id: String,
    pub bigquery_base_url: String,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            lcp_budget_ms: 2500.0,
            cls_budget: 0.1,
            fid_budget_ms: 100.0,
            window_days: 7,
            email_from: String::new(),
            recipients: Vec::new(),
            property_id: String::new(),
            project_id: String::new(),
            bigquery_base_url: "https://bigquery.googleapis.com/bigquery/v2".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level
    pub log_level: String,
    /// Emit JSON lines instead of the compact formatter
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl CwvDeployConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (cwv-deploy.toml, or `explicit` when given)
    /// 3. Environment variables (prefixed with CWV_DEPLOY_, `__` between sections)
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        match explicit {
            Some(path) => {
                builder = builder.add_source(File::from(path).required(true));
            }
            None if Path::new("cwv-deploy.toml").exists() => {
                builder = builder.add_source(File::with_name("cwv-deploy"));
            }
            None => {}
        }

        builder = builder.add_source(
            Environment::with_prefix("CWV_DEPLOY")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("alerting.recipients")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_match_published_budgets() {
        let config = CwvDeployConfig::default();
        assert_eq!(config.alerting.lcp_budget_ms, 2500.0);
        assert_eq!(config.alerting.cls_budget, 0.1);
        assert_eq!(config.alerting.fid_budget_ms, 100.0);
        assert_eq!(config.alerting.window_days, 7);
        assert_eq!(config.oauth.token_uri, "https://oauth2.googleapis.com/token");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[tag_manager]\nrequests_per_second = 2\n\n[alerting]\nproperty_id = \"123456\"\n",
        )
        .unwrap();

        let config = CwvDeployConfig::load(Some(&path)).unwrap();
        assert_eq!(config.tag_manager.requests_per_second, 2);
        assert_eq!(config.alerting.property_id, "123456");
        assert_eq!(
            config.tag_manager.api_base_url,
            TagManagerConfig::default().api_base_url
        );
    }

    #[test]
    fn test_save_round_trips_through_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let mut config = CwvDeployConfig::default();
        config.alerting.recipients = vec!["ops@example.com".to_string()];
        config.save_to_file(&path).unwrap();

        let loaded = CwvDeployConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.alerting.recipients, vec!["ops@example.com"]);
    }
}
