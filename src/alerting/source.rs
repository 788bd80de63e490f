use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::errors::AlertError;
use super::evaluation::P75Row;
use crate::auth::{AccessToken, Authenticator};
use crate::config::AlertingConfig;

/// Warehouse side of the budget check: p75 per metric for the `num_days`
/// days before `start_date`.
#[async_trait]
pub trait P75Source: Send + Sync {
    async fn p75_rows(&self, start_date: NaiveDate, num_days: u32) -> Result<Vec<P75Row>, AlertError>;
}

/// Calls the `get_cwv_p75_for_date` procedure through the BigQuery REST
/// `jobs.query` endpoint.
pub struct BigQuerySource {
    http: reqwest::Client,
    base_url: String,
    project_id: String,
    property_id: String,
    auth: Arc<Authenticator>,
}

impl BigQuerySource {
    pub fn new(config: &AlertingConfig, auth: Arc<Authenticator>) -> Result<Self, AlertError> {
        if config.project_id.trim().is_empty() {
            return Err(AlertError::InvalidConfig("alerting.project_id is required".to_string()));
        }
        if config.property_id.trim().is_empty() {
            return Err(AlertError::InvalidConfig("alerting.property_id is required".to_string()));
        }

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| AlertError::Warehouse(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.bigquery_base_url.trim_end_matches('/').to_string(),
            project_id: config.project_id.trim().to_string(),
            property_id: config.property_id.trim().to_string(),
            auth,
        })
    }

    pub fn procedure_call(&self, start_date: NaiveDate, num_days: u32) -> String {
        format!(
            "CALL `{}.analytics_{}.get_cwv_p75_for_date`(DATE '{}', {})",
            self.project_id,
            self.property_id,
            start_date.format("%Y-%m-%d"),
            num_days
        )
    }

    async fn query(&self, token: &AccessToken, sql: &str) -> Result<Vec<P75Row>, AlertError> {
        let url = format!("{}/projects/{}/queries", self.base_url, self.project_id);
        debug!(%url, %sql, "Querying warehouse");

        let response = self
            .http
            .post(&url)
            .bearer_auth(token.secret())
            .json(&json!({
                "query": sql,
                "useLegacySql": false,
                "timeoutMs": 60_000,
            }))
            .send()
            .await
            .map_err(|e| AlertError::Warehouse(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AlertError::Warehouse(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("HTTP {}: {}", status.as_u16(), body.trim()));
            return Err(AlertError::Warehouse(message));
        }

        let parsed: QueryResponse =
            serde_json::from_str(&body).map_err(|e| AlertError::Warehouse(e.to_string()))?;
        parse_rows(parsed)
    }
}

#[async_trait]
impl P75Source for BigQuerySource {
    async fn p75_rows(&self, start_date: NaiveDate, num_days: u32) -> Result<Vec<P75Row>, AlertError> {
        let sql = self.procedure_call(start_date, num_days);
        self.auth
            .with_token(|token| async move { self.query(&token, &sql).await })
            .await?
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct QueryResponse {
    job_complete: bool,
    schema: Option<TableSchema>,
    rows: Vec<TableRow>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TableSchema {
    fields: Vec<FieldSchema>,
}

#[derive(Debug, Deserialize)]
struct FieldSchema {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TableRow {
    f: Vec<TableCell>,
}

#[derive(Debug, Deserialize)]
struct TableCell {
    v: Value,
}

/// BigQuery returns every cell as a string; columns are located by name.
fn parse_rows(response: QueryResponse) -> Result<Vec<P75Row>, AlertError> {
    if !response.job_complete {
        return Err(AlertError::Warehouse(
            "query did not complete before the timeout".to_string(),
        ));
    }
    let Some(schema) = response.schema else {
        return Ok(Vec::new());
    };

    let column = |name: &str| {
        schema
            .fields
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| AlertError::Warehouse(format!("result has no {name} column")))
    };
    let name_at = column("metric_name")?;
    let p75_at = column("p75")?;
    let count_at = column("count")?;

    response
        .rows
        .iter()
        .map(|row| {
            let cell = |at: usize| row.f.get(at).map(|c| &c.v).unwrap_or(&Value::Null);
            Ok(P75Row {
                metric_name: cell(name_at).as_str().unwrap_or_default().to_string(),
                p75: number(cell(p75_at))?,
                count: count(cell(count_at))?,
            })
        })
        .collect()
}

fn count(value: &Value) -> Result<u64, AlertError> {
    match value {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| AlertError::Warehouse(format!("{n} is not a row count"))),
        Value::String(s) => s
            .parse()
            .map_err(|_| AlertError::Warehouse(format!("{s:?} is not a row count"))),
        other => Err(AlertError::Warehouse(format!("{other} is not a row count"))),
    }
}

fn number(value: &Value) -> Result<f64, AlertError> {
    match value {
        Value::Null => Ok(0.0),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| AlertError::Warehouse(format!("{n} is not a number"))),
        Value::String(s) => s
            .parse()
            .map_err(|_| AlertError::Warehouse(format!("{s:?} is not a number"))),
        other => Err(AlertError::Warehouse(format!("{other} is not a number"))),
    }
}
