//! Budget check run when a new GA4 daily export lands in the warehouse.

pub mod errors;
pub mod evaluation;
pub mod event;
pub mod message;
pub mod source;
pub mod thresholds;
pub mod transport;

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::info;

pub use errors::AlertError;
pub use evaluation::{evaluate, Breach, P75Row, VitalsSnapshot};
pub use event::CloudEvent;
pub use message::AlertMessage;
pub use source::{BigQuerySource, P75Source};
pub use thresholds::{Budgets, Metric};
pub use transport::{AlertTransport, OutboxTransport};

use crate::config::AlertingConfig;

#[derive(Debug, Clone, PartialEq)]
pub enum AlertDecision {
    /// The event was not a daily export table creation.
    Ignored,
    WithinBudget(VitalsSnapshot),
    Sent(Vec<Breach>),
}

pub struct AlertService {
    source: Arc<dyn P75Source>,
    transport: Arc<dyn AlertTransport>,
    budgets: Budgets,
    window_days: u32,
    from: String,
    recipients: Vec<String>,
}

impl AlertService {
    pub fn new(
        config: &AlertingConfig,
        budgets: Budgets,
        source: Arc<dyn P75Source>,
        transport: Arc<dyn AlertTransport>,
    ) -> Self {
        Self {
            source,
            transport,
            budgets,
            window_days: config.window_days.max(1),
            from: config.email_from.clone(),
            recipients: config.recipients.clone(),
        }
    }

    pub fn budgets(&self) -> &Budgets {
        &self.budgets
    }

    /// Filters the event, then runs the budget check for the window ending
    /// the day before `today`.
    pub async fn handle_event(
        &self,
        event: &CloudEvent,
        today: NaiveDate,
    ) -> Result<AlertDecision, AlertError> {
        if !event.is_daily_export() {
            info!(
                service = %event.proto_payload.service_name,
                method = %event.proto_payload.method_name,
                table = event.table_name(),
                "Ignoring event"
            );
            return Ok(AlertDecision::Ignored);
        }
        self.check(today).await
    }

    /// Budget check without an event, e.g. on a schedule or by hand.
    pub async fn check(&self, today: NaiveDate) -> Result<AlertDecision, AlertError> {
        let rows = self.source.p75_rows(today, self.window_days).await?;
        let snapshot = VitalsSnapshot::from_rows(&rows);
        let breaches = evaluate(&snapshot, &self.budgets);

        if breaches.is_empty() {
            info!(
                lcp = snapshot.value(Metric::Lcp),
                cls = snapshot.value(Metric::Cls),
                fid = snapshot.value(Metric::Fid),
                "Core Web Vitals within budget"
            );
            return Ok(AlertDecision::WithinBudget(snapshot));
        }

        let message = AlertMessage::compose(&self.from, &self.recipients, &breaches);
        self.transport.send(&message).await?;
        info!(breaches = breaches.len(), "Alert sent");
        Ok(AlertDecision::Sent(breaches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedSource {
        rows: Vec<P75Row>,
        calls: Mutex<Vec<(NaiveDate, u32)>>,
    }

    #[async_trait]
    impl P75Source for FixedSource {
        async fn p75_rows(&self, start_date: NaiveDate, num_days: u32) -> Result<Vec<P75Row>, AlertError> {
            self.calls.lock().unwrap().push((start_date, num_days));
            Ok(self.rows.clone())
        }
    }

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<AlertMessage>>,
    }

    #[async_trait]
    impl AlertTransport for RecordingTransport {
        async fn send(&self, message: &AlertMessage) -> Result<(), AlertError> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    fn rows(lcp: f64, cls: f64, fid: f64) -> Vec<P75Row> {
        [("LCP", lcp), ("CLS", cls), ("FID", fid)]
            .into_iter()
            .map(|(name, p75)| P75Row {
                metric_name: name.to_string(),
                p75,
                count: 50,
            })
            .collect()
    }

    fn service(rows: Vec<P75Row>) -> (AlertService, Arc<FixedSource>, Arc<RecordingTransport>) {
        let source = Arc::new(FixedSource {
            rows,
            calls: Mutex::new(Vec::new()),
        });
        let transport = Arc::new(RecordingTransport::default());
        let config = AlertingConfig {
            email_from: "alerts@example.com".to_string(),
            recipients: vec!["ops@example.com".to_string()],
            ..AlertingConfig::default()
        };
        let service = AlertService::new(&config, Budgets::default(), source.clone(), transport.clone());
        (service, source, transport)
    }

    fn export_event() -> CloudEvent {
        CloudEvent::parse(
            r#"{"protoPayload": {"serviceName": "bigquery.googleapis.com",
                "methodName": "google.cloud.bigquery.v2.JobService.InsertJob",
                "metadata": {"tableCreation": {"table": {"tableName": "events_20240301"}}}}}"#,
        )
        .unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()
    }

    #[tokio::test]
    async fn test_breach_sends_one_alert() {
        let (service, source, transport) = service(rows(3100.0, 0.05, 80.0));

        let decision = service.handle_event(&export_event(), today()).await.unwrap();

        let AlertDecision::Sent(breaches) = decision else {
            panic!("expected an alert");
        };
        assert_eq!(breaches.len(), 1);
        assert_eq!(breaches[0].metric, Metric::Lcp);
        assert_eq!(source.calls.lock().unwrap().as_slice(), &[(today(), 7)]);

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["ops@example.com"]);
    }

    #[tokio::test]
    async fn test_within_budget_sends_nothing() {
        let (service, _, transport) = service(rows(2500.0, 0.1, 100.0));

        let decision = service.handle_event(&export_event(), today()).await.unwrap();

        assert!(matches!(decision, AlertDecision::WithinBudget(_)));
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unrelated_event_skips_query() {
        let (service, source, _) = service(rows(9000.0, 1.0, 900.0));

        let decision = service.handle_event(&CloudEvent::default(), today()).await.unwrap();

        assert_eq!(decision, AlertDecision::Ignored);
        assert!(source.calls.lock().unwrap().is_empty());
    }
}
