use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

use super::errors::AlertError;

pub const BIGQUERY_SERVICE: &str = "bigquery.googleapis.com";
pub const INSERT_JOB_METHOD: &str = "google.cloud.bigquery.v2.JobService.InsertJob";

/// GA4 daily export tables are named `events_YYYYMMDD`.
static DAILY_EXPORT_TABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"events_\d{8}").expect("static regex"));

/// Audit-log event delivered when a BigQuery table is written. Only the
/// fields needed to recognise a finished daily export are decoded.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CloudEvent {
    #[serde(alias = "ProtoPayload")]
    pub proto_payload: ProtoPayload,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProtoPayload {
    #[serde(alias = "ServiceName")]
    pub service_name: String,
    #[serde(alias = "MethodName")]
    pub method_name: String,
    #[serde(alias = "ResourceName")]
    pub resource_name: String,
    #[serde(alias = "Metadata", alias = "MetaData")]
    pub metadata: EventMetadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EventMetadata {
    /// Present only for table creation, which is what marks a new export.
    #[serde(alias = "TableCreation")]
    pub table_creation: Option<TableCreation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TableCreation {
    #[serde(alias = "Table")]
    pub table: TableRef,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableRef {
    #[serde(alias = "TableName")]
    pub table_name: String,
}

impl CloudEvent {
    pub fn parse(body: &str) -> Result<Self, AlertError> {
        serde_json::from_str(body).map_err(|e| AlertError::InvalidEvent(e.to_string()))
    }

    pub fn table_name(&self) -> &str {
        self.proto_payload
            .metadata
            .table_creation
            .as_ref()
            .map(|c| c.table.table_name.as_str())
            .unwrap_or_default()
    }

    /// True when a GA4 daily export table was just created by an insert job.
    pub fn is_daily_export(&self) -> bool {
        self.proto_payload.service_name == BIGQUERY_SERVICE
            && self.proto_payload.method_name == INSERT_JOB_METHOD
            && DAILY_EXPORT_TABLE.is_match(self.table_name())
    }
}
