//! Stratified train/test split.
use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::config::PipelineConfig;
use crate::data::table::Table;
use crate::error::{PipelineError, Result};

/// Features and labels of both halves of a split.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub x_train: Table,
    pub x_test: Table,
    pub y_train: Vec<i32>,
    pub y_test: Vec<i32>,
}

/// Splits a labelled table into train and test subsets.
#[derive(Debug, Clone)]
pub struct DataTransform {
    table: Table,
    target: String,
    test_size: f64,
    random_state: u64,
}

impl DataTransform {
    pub fn new(table: Table, config: &PipelineConfig) -> Self {
        Self::with_params(
            table,
            &config.target_column,
            config.test_size,
            config.random_state,
        )
    }

    pub fn with_params(table: Table, target: &str, test_size: f64, random_state: u64) -> Self {
        Self {
            table,
            target: target.to_string(),
            test_size,
            random_state,
        }
    }

    /// Split into `(x_train, x_test, y_train, y_test)`, preserving the class
    /// ratio of the label column in both halves. The same seed and input
    /// always produce the same split.
    pub fn train_test_split(&self) -> Result<Split> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(PipelineError::Config(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }

        let x = self.table.drop_column(&self.target)?;
        let y = labels_from_column(&self.table.column(&self.target)?, &self.target)?;

        let mut rng = StdRng::seed_from_u64(self.random_state);
        let mut train_idx = Vec::new();
        let mut test_idx = Vec::new();

        for (label, mut indices) in class_indices(&y) {
            if indices.len() < 2 {
                return Err(PipelineError::Validation(format!(
                    "the least populated class in '{}' ({}) has only {} member; \
                     stratified split needs at least 2",
                    self.target,
                    label,
                    indices.len()
                )));
            }
            indices.shuffle(&mut rng);
            let n_test = ((indices.len() as f64) * self.test_size).round() as usize;
            let n_test = n_test.clamp(1, indices.len() - 1);
            test_idx.extend_from_slice(&indices[..n_test]);
            train_idx.extend_from_slice(&indices[n_test..]);
        }

        train_idx.shuffle(&mut rng);
        test_idx.shuffle(&mut rng);

        log::debug!(
            "Split {} rows into {} train / {} test (seed {})",
            y.len(),
            train_idx.len(),
            test_idx.len(),
            self.random_state
        );

        Ok(Split {
            x_train: x.select_rows(&train_idx),
            x_test: x.select_rows(&test_idx),
            y_train: train_idx.iter().map(|&i| y[i]).collect(),
            y_test: test_idx.iter().map(|&i| y[i]).collect(),
        })
    }
}

/// Row positions grouped by label, in ascending label order.
pub(crate) fn class_indices(y: &[i32]) -> BTreeMap<i32, Vec<usize>> {
    let mut classes: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (i, &label) in y.iter().enumerate() {
        classes.entry(label).or_default().push(i);
    }
    classes
}

/// Read a label column as integers; missing or fractional labels are rejected.
pub fn labels_from_column(values: &[f64], name: &str) -> Result<Vec<i32>> {
    values
        .iter()
        .enumerate()
        .map(|(row, &v)| {
            if v.is_nan() || v.fract() != 0.0 {
                Err(PipelineError::Validation(format!(
                    "label column '{}' has non-integer value {} at row {}",
                    name, v, row
                )))
            } else {
                Ok(v as i32)
            }
        })
        .collect()
}
