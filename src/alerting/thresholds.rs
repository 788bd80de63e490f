use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::config::AlertingConfig;

/// Core Web Vitals covered by the budget check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Metric {
    Lcp,
    Cls,
    Fid,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Lcp, Metric::Cls, Metric::Fid];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Lcp => "LCP",
            Metric::Cls => "CLS",
            Metric::Fid => "FID",
        }
    }

    /// Warehouse rows name metrics exactly `LCP`, `CLS` or `FID`.
    pub fn from_name(name: &str) -> Option<Self> {
        Metric::ALL.into_iter().find(|m| m.name() == name)
    }

    /// Environment variable that overrides the budget.
    pub fn env_var(&self) -> &'static str {
        match self {
            Metric::Lcp => "GOOD_LCP",
            Metric::Cls => "GOOD_CLS",
            Metric::Fid => "GOOD_FID",
        }
    }

    /// Human formatting: milliseconds as integers, CLS with two decimals.
    pub fn format_value(&self, value: f64) -> String {
        match self {
            Metric::Lcp | Metric::Fid => format!("{value:.0} ms"),
            Metric::Cls => format!("{value:.2}"),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// "Good" thresholds per metric. A value at or under its budget is good.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Budgets {
    pub lcp_ms: f64,
    pub cls: f64,
    pub fid_ms: f64,
}

impl Default for Budgets {
    fn default() -> Self {
        Self {
            lcp_ms: 2500.0,
            cls: 0.1,
            fid_ms: 100.0,
        }
    }
}

impl Budgets {
    pub fn from_config(config: &AlertingConfig) -> Self {
        Self {
            lcp_ms: config.lcp_budget_ms,
            cls: config.cls_budget,
            fid_ms: config.fid_budget_ms,
        }
    }

    /// Applies `GOOD_LCP` / `GOOD_CLS` / `GOOD_FID` overrides. A value that does
    /// not parse as a number keeps the current budget and logs a warning.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        for metric in Metric::ALL {
            let Some(raw) = lookup(metric.env_var()) else {
                continue;
            };
            match raw.trim().parse::<f64>() {
                Ok(value) if value.is_finite() => self.set(metric, value),
                _ => warn!(
                    variable = metric.env_var(),
                    value = %raw,
                    fallback = self.budget(metric),
                    "Problem converting threshold, using default"
                ),
            }
        }
        self
    }

    pub fn budget(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Lcp => self.lcp_ms,
            Metric::Cls => self.cls,
            Metric::Fid => self.fid_ms,
        }
    }

    pub fn is_good(&self, metric: Metric, value: f64) -> bool {
        value <= self.budget(metric)
    }

    fn set(&mut self, metric: Metric, value: f64) {
        match metric {
            Metric::Lcp => self.lcp_ms = value,
            Metric::Cls => self.cls = value,
            Metric::Fid => self.fid_ms = value,
        }
    }
}
