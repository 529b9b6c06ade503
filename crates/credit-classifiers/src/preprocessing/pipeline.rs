use serde::{Deserialize, Serialize};

use crate::data::Table;
use crate::error::{PipelineError, Result};
use crate::preprocessing::steps::{FittedStep, StepSpec};

/// An ordered list of named, unfitted steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub steps: Vec<(String, StepSpec)>,
}

impl Pipeline {
    pub fn new(steps: Vec<(String, StepSpec)>) -> Self {
        Self { steps }
    }

    /// Name each spec after its kind.
    pub fn from_specs(specs: &[StepSpec]) -> Self {
        Self::new(
            specs
                .iter()
                .map(|s| (s.name().to_string(), s.clone()))
                .collect(),
        )
    }

    /// Fit each step on the output of the previous one.
    pub fn fit(&self, x: &Table) -> Result<FittedPipeline> {
        let mut current = x.clone();
        let mut fitted = Vec::with_capacity(self.steps.len());
        for (name, spec) in &self.steps {
            log::debug!("Fitting step '{}' on {} rows", name, current.nrows());
            let step = spec.fit(&current)?;
            current = step.transform(&current)?;
            fitted.push((name.clone(), step));
        }
        Ok(FittedPipeline {
            columns: x.columns().to_vec(),
            steps: fitted,
        })
    }
}

/// A pipeline whose steps carry learned parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPipeline {
    /// Feature columns seen during fitting, in order.
    pub columns: Vec<String>,
    pub steps: Vec<(String, FittedStep)>,
}

impl FittedPipeline {
    /// Apply every step. Columns are matched by name, so extra or reordered
    /// columns in `x` are fine as long as all fitted columns are present.
    pub fn transform(&self, x: &Table) -> Result<Table> {
        let mut current = x.select_named(&self.columns).map_err(|e| match e {
            PipelineError::NotFound(what) => {
                PipelineError::Shape(format!("input is missing fitted {}", what))
            }
            other => other,
        })?;
        for (_, step) in &self.steps {
            current = step.transform(&current)?;
        }
        Ok(current)
    }
}
