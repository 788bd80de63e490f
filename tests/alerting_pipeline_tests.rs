//! Export event to outbox: BigQuery served by wiremock, alerts written to a temp file.

use chrono::{Duration, NaiveDate};
use cwv_deploy::alerting::{
    AlertDecision, AlertError, AlertService, BigQuerySource, Budgets, CloudEvent, Metric,
    OutboxTransport, P75Source,
};
use cwv_deploy::auth::{AccessToken, AuthError, Authenticator, ConsentPrompt, PreIssuedTokenSource};
use cwv_deploy::config::AlertingConfig;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::tempdir;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROCEDURE_CALL: &str =
    "CALL `web-perf.analytics_123456.get_cwv_p75_for_date`(DATE '2024-03-15', 7)";

struct NoConsent;

impl ConsentPrompt for NoConsent {
    fn request_code(&self, _consent_url: &str) -> Result<String, AuthError> {
        Err(AuthError::ConsentDenied("not interactive".to_string()))
    }
}

fn alerting_config(server: &MockServer) -> AlertingConfig {
    AlertingConfig {
        project_id: "web-perf".to_string(),
        property_id: "123456".to_string(),
        email_from: "alerts@example.com".to_string(),
        recipients: vec!["perf@example.com".to_string()],
        bigquery_base_url: server.uri(),
        ..AlertingConfig::default()
    }
}

fn authenticator() -> Arc<Authenticator> {
    Arc::new(
        Authenticator::new(Arc::new(PreIssuedTokenSource), Arc::new(NoConsent))
            .with_initial_token(AccessToken::new("ya29.bq"), Duration::minutes(30)),
    )
}

fn query_result(rows: &[(&str, &str, &str)]) -> Value {
    json!({
        "kind": "bigquery#queryResponse",
        "jobComplete": true,
        "schema": {"fields": [
            {"name": "metric_name", "type": "STRING"},
            {"name": "p75", "type": "FLOAT"},
            {"name": "count", "type": "INTEGER"},
        ]},
        "rows": rows
            .iter()
            .map(|(name, p75, count)| json!({"f": [{"v": name}, {"v": p75}, {"v": count}]}))
            .collect::<Vec<_>>(),
        "totalRows": rows.len().to_string(),
    })
}

async fn mock_query(server: &MockServer, status: u16, body: Value) {
    Mock::given(method("POST"))
        .and(path("/projects/web-perf/queries"))
        .and(header("authorization", "Bearer ya29.bq"))
        .and(body_partial_json(json!({"query": PROCEDURE_CALL, "useLegacySql": false})))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

fn daily_export_event() -> CloudEvent {
    CloudEvent::parse(
        r#"{
            "protoPayload": {
                "serviceName": "bigquery.googleapis.com",
                "methodName": "google.cloud.bigquery.v2.JobService.InsertJob",
                "resourceName": "projects/web-perf/datasets/analytics_123456/tables/events_20240314",
                "metadata": {"tableCreation": {"table": {"tableName": "projects/web-perf/datasets/analytics_123456/tables/events_20240314"}}}
            }
        }"#,
    )
    .unwrap()
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
}

#[tokio::test]
async fn test_breach_writes_alert_to_outbox() {
    let server = MockServer::start().await;
    mock_query(
        &server,
        200,
        query_result(&[("LCP", "3000", "812"), ("CLS", "0.05", "812"), ("FID", "40", "640")]),
    )
    .await;
    let dir = tempdir().unwrap();
    let outbox = dir.path().join("outbox.eml");
    let config = alerting_config(&server);
    let source = BigQuerySource::new(&config, authenticator()).unwrap();
    let service = AlertService::new(
        &config,
        Budgets::from_config(&config),
        Arc::new(source),
        Arc::new(OutboxTransport::File(outbox.clone())),
    );

    let decision = service.handle_event(&daily_export_event(), today()).await.unwrap();

    let AlertDecision::Sent(breaches) = &decision else {
        panic!("expected an alert, got {decision:?}");
    };
    assert_eq!(breaches.len(), 1);
    assert_eq!(breaches[0].metric, Metric::Lcp);
    assert!((breaches[0].percent - 120.0).abs() < 1e-9);

    let written = std::fs::read_to_string(&outbox).unwrap();
    assert!(written.contains("To: perf@example.com"));
    assert!(written.contains("Subject: Core Web Vitals are not meeting thresholds"));
    assert!(written.contains("LCP of 3000 ms is 120% of 2500 ms budget."));
}

#[tokio::test]
async fn test_within_budget_leaves_outbox_untouched() {
    let server = MockServer::start().await;
    mock_query(
        &server,
        200,
        query_result(&[("LCP", "1800", "812"), ("CLS", "0.02", "812"), ("FID", "12", "640")]),
    )
    .await;
    let dir = tempdir().unwrap();
    let outbox = dir.path().join("outbox.eml");
    let config = alerting_config(&server);
    let service = AlertService::new(
        &config,
        Budgets::from_config(&config),
        Arc::new(BigQuerySource::new(&config, authenticator()).unwrap()),
        Arc::new(OutboxTransport::File(outbox.clone())),
    );

    let decision = service.check(today()).await.unwrap();

    assert!(matches!(decision, AlertDecision::WithinBudget(ref s) if s.value(Metric::Lcp) == 1800.0));
    assert!(!outbox.exists());
}

#[tokio::test]
async fn test_unrelated_event_skips_warehouse() {
    let server = MockServer::start().await;
    let config = alerting_config(&server);
    let service = AlertService::new(
        &config,
        Budgets::from_config(&config),
        Arc::new(BigQuerySource::new(&config, authenticator()).unwrap()),
        Arc::new(OutboxTransport::Stdout),
    );
    let event = CloudEvent::parse(
        r#"{"protoPayload": {"serviceName": "bigquery.googleapis.com", "methodName": "google.cloud.bigquery.v2.JobService.InsertJob", "metadata": {"tableCreation": {"table": {"tableName": "events_intraday_20240314"}}}}}"#,
    )
    .unwrap();

    let decision = service.handle_event(&event, today()).await.unwrap();

    assert_eq!(decision, AlertDecision::Ignored);
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_warehouse_error_message_surfaces() {
    let server = MockServer::start().await;
    mock_query(
        &server,
        404,
        json!({"error": {"code": 404, "message": "Not found: Dataset web-perf:analytics_123456", "status": "NOT_FOUND"}}),
    )
    .await;
    let config = alerting_config(&server);
    let source = BigQuerySource::new(&config, authenticator()).unwrap();

    let err = source.p75_rows(today(), 7).await.unwrap_err();

    assert!(matches!(err, AlertError::Warehouse(ref m) if m == "Not found: Dataset web-perf:analytics_123456"));
}

#[tokio::test]
async fn test_incomplete_job_is_an_error() {
    let server = MockServer::start().await;
    mock_query(&server, 200, json!({"jobComplete": false, "jobReference": {"jobId": "job_1"}})).await;
    let config = alerting_config(&server);
    let source = BigQuerySource::new(&config, authenticator()).unwrap();

    let err = source.p75_rows(today(), 7).await.unwrap_err();

    assert!(err.to_string().contains("did not complete"));
}
