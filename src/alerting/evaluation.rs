use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use super::thresholds::{Budgets, Metric};

/// One row of the p75 aggregation procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct P75Row {
    pub metric_name: String,
    pub p75: f64,
    pub count: u64,
}

/// p75 per metric over the window. Metrics without rows count as 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VitalsSnapshot {
    values: BTreeMap<Metric, f64>,
}

impl VitalsSnapshot {
    pub fn from_rows(rows: &[P75Row]) -> Self {
        let mut values = BTreeMap::new();
        for row in rows {
            match Metric::from_name(&row.metric_name) {
                Some(metric) => {
                    values.insert(metric, row.p75);
                }
                None => debug!(metric = %row.metric_name, "Skipping metric without a budget"),
            }
        }
        Self { values }
    }

    pub fn value(&self, metric: Metric) -> f64 {
        self.values.get(&metric).copied().unwrap_or(0.0)
    }
}

/// A metric whose p75 exceeded its budget.
#[derive(Debug, Clone, PartialEq)]
pub struct Breach {
    pub metric: Metric,
    pub value: f64,
    pub budget: f64,
    /// Value as a percentage of the budget.
    pub percent: f64,
}

pub fn evaluate(snapshot: &VitalsSnapshot, budgets: &Budgets) -> Vec<Breach> {
    Metric::ALL
        .into_iter()
        .filter_map(|metric| {
            let value = snapshot.value(metric);
            let budget = budgets.budget(metric);
            if budgets.is_good(metric, value) {
                return None;
            }
            let percent = if budget > 0.0 {
                value / budget * 100.0
            } else {
                f64::INFINITY
            };
            Some(Breach {
                metric,
                value,
                budget,
                percent,
            })
        })
        .collect()
}
