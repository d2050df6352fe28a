//! Descriptive statistics, logged at load time and written to `dataset_info.txt`.

use std::fmt;

use hpp_core::{FEATURE_NAMES, TARGET_COLUMN};

use crate::dataset::Dataset;

/// Statistics of one numeric column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    /// Column name.
    pub name: String,
    /// Number of values.
    pub count: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator).
    pub std: f64,
    /// Smallest value.
    pub min: f64,
    /// First quartile.
    pub q25: f64,
    /// Median.
    pub median: f64,
    /// Third quartile.
    pub q75: f64,
    /// Largest value.
    pub max: f64,
}

impl ColumnSummary {
    /// Summarize `values`. Returns `None` for an empty column.
    pub fn of(name: &str, values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len();
        let mean = values.iter().sum::<f64>() / n as f64;
        let std = if n > 1 {
            (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt()
        } else {
            0.0
        };
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        Some(Self {
            name: name.to_string(),
            count: n,
            mean,
            std,
            min: sorted[0],
            q25: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            q75: quantile(&sorted, 0.75),
            max: sorted[n - 1],
        })
    }
}

/// Linear-interpolated quantile of an ascending, non-empty slice.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Summary of a whole dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSummary {
    /// Number of rows.
    pub rows: usize,
    /// Rows discarded while importing, if known.
    pub dropped_rows: usize,
    /// One entry per feature, then the target.
    pub columns: Vec<ColumnSummary>,
}

impl DataSummary {
    /// Summarize every feature column and the target.
    pub fn of(dataset: &Dataset, dropped_rows: usize) -> Self {
        let mut columns: Vec<ColumnSummary> = FEATURE_NAMES
            .iter()
            .enumerate()
            .filter_map(|(i, name)| ColumnSummary::of(name, &dataset.column(i)))
            .collect();
        columns.extend(ColumnSummary::of(TARGET_COLUMN, dataset.targets()));
        Self {
            rows: dataset.len(),
            dropped_rows,
            columns,
        }
    }

    /// Summary of one column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnSummary> {
        self.columns.iter().find(|c| c.name == name)
    }
}

impl fmt::Display for DataSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "California Housing Dataset")?;
        writeln!(f, "Rows: {}", self.rows)?;
        writeln!(f, "Columns: {}", self.columns.len())?;
        writeln!(f, "Dropped rows: {}", self.dropped_rows)?;
        writeln!(f, "Features: {}", FEATURE_NAMES.join(", "))?;
        writeln!(f, "Target: {TARGET_COLUMN} (units of $100,000)")?;
        writeln!(f)?;
        writeln!(
            f,
            "{:<20} {:>8} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12}",
            "column", "count", "mean", "std", "min", "25%", "50%", "75%", "max"
        )?;
        for c in &self.columns {
            writeln!(
                f,
                "{:<20} {:>8} {:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>12.4}",
                c.name, c.count, c.mean, c.std, c.min, c.q25, c.median, c.q75, c.max
            )?;
        }
        Ok(())
    }
}
