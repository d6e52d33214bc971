use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::layer::ZctaLayer;
use crate::metrics::{column_max, column_min, mean, stddev};

/// Descriptive statistics for one numeric column.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub missing: usize,
    pub mean: Option<f64>,
    pub stddev: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl ColumnSummary {
    pub fn from_values(column: &str, values: &[Option<f64>]) -> Self {
        let present: Vec<f64> = values
            .iter()
            .flatten()
            .copied()
            .filter(|v| v.is_finite())
            .collect();

        let (avg, sd) = if present.is_empty() {
            (None, None)
        } else {
            let m = mean(&present);
            (Some(m), Some(stddev(&present, m)))
        };

        ColumnSummary {
            column: column.to_string(),
            count: present.len(),
            missing: values.len() - present.len(),
            mean: avg,
            stddev: sd,
            min: column_min(values),
            max: column_max(values),
        }
    }
}

/// Per-column report over a whole layer.
#[derive(Debug, Serialize)]
pub struct LayerSummary {
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub records: usize,
    pub keyed_records: usize,
    pub columns: Vec<ColumnSummary>,
}

impl LayerSummary {
    /// Summarises every column that holds at least one number. Text
    /// columns such as labels are skipped.
    pub fn from_layer(source: &str, layer: &ZctaLayer) -> Self {
        let columns = layer
            .column_names()
            .iter()
            .filter(|name| {
                layer
                    .records
                    .iter()
                    .any(|r| r.properties.get(name.as_str()).is_some_and(|v| v.is_number()))
            })
            .map(|name| ColumnSummary::from_values(name, &layer.column(name)))
            .collect();

        LayerSummary {
            generated_at: Utc::now(),
            source: source.to_string(),
            records: layer.len(),
            keyed_records: layer.records.iter().filter(|r| r.zcta.is_some()).count(),
            columns,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSummary> {
        self.columns.iter().find(|c| c.column == name)
    }
}
