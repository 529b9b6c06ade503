//! Dataset summary, per-column drift and missing-value metrics comparing a
//! reference table with current data.
use statrs::statistics::Statistics;

use crate::data::Table;
use crate::error::{PipelineError, Result};
use crate::stats::{ks_2samp, wasserstein_distance};

/// Reference columns with at most this many values are tested with KS;
/// larger ones use the normed Wasserstein distance.
pub const KS_MAX_REFERENCE_SIZE: usize = 1000;
pub const KS_P_VALUE_THRESHOLD: f64 = 0.05;
pub const WASSERSTEIN_THRESHOLD: f64 = 0.1;
/// Share of drifted columns at which the whole dataset counts as drifted.
pub const DATASET_DRIFT_SHARE: f64 = 0.5;

const MIN_WASSERSTEIN_NORM: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriftMethod {
    KolmogorovSmirnov,
    Wasserstein,
}

impl DriftMethod {
    pub fn name(&self) -> &'static str {
        match self {
            DriftMethod::KolmogorovSmirnov => "K-S p_value",
            DriftMethod::Wasserstein => "Wasserstein distance (normed)",
        }
    }

    pub fn threshold(&self) -> f64 {
        match self {
            DriftMethod::KolmogorovSmirnov => KS_P_VALUE_THRESHOLD,
            DriftMethod::Wasserstein => WASSERSTEIN_THRESHOLD,
        }
    }

    /// Lower p-values and larger distances both mean drift.
    pub fn is_drift(&self, score: f64) -> bool {
        match self {
            DriftMethod::KolmogorovSmirnov => score < self.threshold(),
            DriftMethod::Wasserstein => score >= self.threshold(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDrift {
    pub column: String,
    pub method: DriftMethod,
    /// p-value for KS, normed distance for Wasserstein.
    pub score: f64,
    pub drifted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataDrift {
    pub columns: Vec<ColumnDrift>,
    /// Common columns that had no values on one side and were not tested.
    pub skipped: Vec<String>,
    pub n_drifted: usize,
    pub share_drifted: f64,
    pub dataset_drift: bool,
}

/// Shape and quality counters of one table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSummary {
    pub rows: usize,
    pub columns: usize,
    pub missing_cells: usize,
    pub missing_share: f64,
    pub constant_columns: usize,
    pub empty_columns: usize,
}

impl TableSummary {
    pub fn of(table: &Table) -> Self {
        let cells = table.nrows() * table.ncols();
        let missing_cells = table.missing_count();
        let mut constant_columns = 0;
        let mut empty_columns = 0;
        for c in 0..table.ncols() {
            let values = present(&table.column_at(c));
            if values.is_empty() {
                empty_columns += 1;
            } else if values.iter().all(|&v| v == values[0]) {
                constant_columns += 1;
            }
        }
        Self {
            rows: table.nrows(),
            columns: table.ncols(),
            missing_cells,
            missing_share: share(missing_cells, cells),
            constant_columns,
            empty_columns,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSummary {
    pub reference: TableSummary,
    pub current: TableSummary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMissing {
    pub column: String,
    pub reference_missing: usize,
    pub reference_share: f64,
    pub current_missing: usize,
    pub current_share: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MissingValues {
    pub columns: Vec<ColumnMissing>,
    pub reference_total: usize,
    pub current_total: usize,
}

/// Everything the monitoring page shows.
#[derive(Debug, Clone, PartialEq)]
pub struct DriftReport {
    pub common_columns: Vec<String>,
    pub summary: DatasetSummary,
    pub drift: DataDrift,
    pub missing: MissingValues,
}

fn present(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| !v.is_nan()).collect()
}

fn share(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Test one column; `None` when either side has no values.
pub fn column_drift(column: &str, reference: &[f64], current: &[f64]) -> Option<ColumnDrift> {
    let reference = present(reference);
    let current = present(current);
    if reference.is_empty() || current.is_empty() {
        return None;
    }

    let (method, score) = if reference.len() <= KS_MAX_REFERENCE_SIZE {
        let (_, p_value) = ks_2samp(&reference, &current);
        (DriftMethod::KolmogorovSmirnov, p_value)
    } else {
        let norm = reference.iter().population_std_dev().max(MIN_WASSERSTEIN_NORM);
        (
            DriftMethod::Wasserstein,
            wasserstein_distance(&reference, &current) / norm,
        )
    };

    Some(ColumnDrift {
        column: column.to_string(),
        method,
        score,
        drifted: method.is_drift(score),
    })
}

/// Compare `current` against `reference` over the columns both tables share,
/// in reference order.
pub fn compute_report(reference: &Table, current: &Table) -> Result<DriftReport> {
    let common_columns: Vec<String> = reference
        .columns()
        .iter()
        .filter(|c| current.has_column(c))
        .cloned()
        .collect();
    if common_columns.is_empty() {
        return Err(PipelineError::Validation(
            "reference and current data share no columns".to_string(),
        ));
    }

    let mut columns = Vec::new();
    let mut skipped = Vec::new();
    let mut missing = Vec::new();
    for name in &common_columns {
        let ref_values = reference.column(name)?;
        let cur_values = current.column(name)?;

        match column_drift(name, &ref_values, &cur_values) {
            Some(result) => {
                log::debug!(
                    "{}: {} = {:.4} (drift: {})",
                    name,
                    result.method.name(),
                    result.score,
                    result.drifted
                );
                columns.push(result);
            }
            None => {
                log::warn!("Column '{}' has no values on one side; drift not tested", name);
                skipped.push(name.clone());
            }
        }

        let reference_missing = ref_values.iter().filter(|v| v.is_nan()).count();
        let current_missing = cur_values.iter().filter(|v| v.is_nan()).count();
        missing.push(ColumnMissing {
            column: name.clone(),
            reference_missing,
            reference_share: share(reference_missing, ref_values.len()),
            current_missing,
            current_share: share(current_missing, cur_values.len()),
        });
    }

    let n_drifted = columns.iter().filter(|c| c.drifted).count();
    let share_drifted = share(n_drifted, columns.len());
    let dataset_drift = !columns.is_empty() && share_drifted >= DATASET_DRIFT_SHARE;
    log::info!(
        "Drift detected in {} of {} columns (dataset drift: {})",
        n_drifted,
        columns.len(),
        dataset_drift
    );

    Ok(DriftReport {
        common_columns,
        summary: DatasetSummary {
            reference: TableSummary::of(reference),
            current: TableSummary::of(current),
        },
        drift: DataDrift {
            columns,
            skipped,
            n_drifted,
            share_drifted,
            dataset_drift,
        },
        missing: MissingValues {
            reference_total: missing.iter().map(|m| m.reference_missing).sum(),
            current_total: missing.iter().map(|m| m.current_missing).sum(),
            columns: missing,
        },
    })
}
