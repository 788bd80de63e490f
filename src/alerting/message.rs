use super::evaluation::Breach;
use super::thresholds::Metric;

pub const SUBJECT: &str = "Core Web Vitals are not meeting thresholds";
const BOUNDARY: &str = "part_boundary";
const CRLF: &str = "\r\n";

/// Composed alert: envelope fields plus a multipart/alternative body with a
/// plain-text and an HTML part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

impl AlertMessage {
    /// Lists every breach; callers only compose when there is at least one.
    pub fn compose(from: &str, to: &[String], breaches: &[Breach]) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_vec(),
            subject: SUBJECT.to_string(),
            body: multipart_body(breaches),
        }
    }

    pub fn content_type() -> String {
        format!("multipart/alternative; boundary=\"{BOUNDARY}\"")
    }

    /// Full RFC 5322 message, headers included.
    pub fn render(&self) -> String {
        let headers = [
            format!("From: CWV Alerter <{}>", self.from),
            format!("To: {}", self.to.join(", ")),
            format!("Subject: {}", self.subject),
            "MIME-Version: 1.0".to_string(),
            format!("Content-Type: {}", Self::content_type()),
        ];
        format!("{}{CRLF}{CRLF}{}", headers.join(CRLF), self.body)
    }
}

fn multipart_body(breaches: &[Breach]) -> String {
    let mut lines: Vec<String> = vec![
        format!("--{BOUNDARY}"),
        "Content-Type: text/plain; charset=\"UTF-8\"".to_string(),
        "Content-Transfer-Encoding: 8bit".to_string(),
        String::new(),
        "Your Core Web Vitals values are not meeting your budgeted values:".to_string(),
        String::new(),
    ];
    lines.extend(breaches.iter().map(plain_line));

    lines.extend([
        String::new(),
        format!("--{BOUNDARY}"),
        "Content-Type: text/html; charset=\"UTF-8\"".to_string(),
        "Content-Transfer-Encoding: 8bit".to_string(),
        String::new(),
        "<h1>Core Web Vitals Alert</h1>".to_string(),
        "<p>Your Core Web Vitals scores are not meeting your budgeted values:</p>".to_string(),
        "<table style=\"border-spacing: 0.5em\">".to_string(),
        "<caption>Core Web Vitals Issues</caption>".to_string(),
        "<thead><tr><th>Metric</th><th>Value</th><th>Budget</th><th>% of Budget</th></tr></thead>"
            .to_string(),
        "<tbody>".to_string(),
    ]);
    lines.extend(breaches.iter().map(html_row));
    lines.extend([
        "</tbody></table>".to_string(),
        format!("--{BOUNDARY}--"),
        String::new(),
    ]);

    lines.join(CRLF)
}

fn plain_line(breach: &Breach) -> String {
    format!(
        "{metric} of {value} is {percent:.0}% of {budget} budget.",
        metric = breach.metric,
        value = breach.metric.format_value(breach.value),
        percent = breach.percent,
        budget = breach.metric.format_value(breach.budget),
    )
}

fn html_row(breach: &Breach) -> String {
    format!(
        "<tr><td style=\"background: lightgray; font-weight: bolder; text-align: center\">{metric}</td>\
         <td>{value}</td><td>{budget}</td><td style=\"color: red\">{percent:.0}%</td></tr>",
        metric = breach.metric,
        value = compact(breach.metric, breach.value),
        budget = compact(breach.metric, breach.budget),
        percent = breach.percent,
    )
}

/// Table cells drop the space before the unit.
fn compact(metric: Metric, value: f64) -> String {
    metric.format_value(value).replace(' ', "")
}
