//! Feature preprocessing: imputation, discretisation and scaling steps
//! composed into a [`Pipeline`], plus the [`DataPreprocess`] wrapper that
//! guards against transforming with an unfitted pipeline.
pub mod pipeline;
pub mod steps;

pub use pipeline::{FittedPipeline, Pipeline};
pub use steps::{BinMethod, ImputeMethod, ScaleMethod, StepSpec};

use crate::data::Table;
use crate::error::{PipelineError, Result};

/// Holds a caller-supplied pipeline and, once trained, its fitted state.
#[derive(Debug, Clone)]
pub struct DataPreprocess {
    pipe: Pipeline,
    pipe_trained: Option<FittedPipeline>,
}

impl DataPreprocess {
    pub fn new(pipe: Pipeline) -> Self {
        Self {
            pipe,
            pipe_trained: None,
        }
    }

    /// Fit the pipeline on `x`. Training again replaces the previous fit.
    pub fn train(&mut self, x: &Table) -> Result<&FittedPipeline> {
        log::info!("Preprocessing started");
        let fitted = self.pipe.fit(x)?;
        let fitted: &FittedPipeline = self.pipe_trained.insert(fitted);
        Ok(fitted)
    }

    /// Apply the trained pipeline; fails with `NotTrained` before `train`.
    pub fn transform(&self, x: &Table) -> Result<Table> {
        let fitted = self.pipe_trained.as_ref().ok_or(PipelineError::NotTrained)?;
        log::info!("Transforming data");
        let out = fitted.transform(x)?;
        log::info!("Preprocessing finished");
        Ok(out)
    }

    pub fn is_trained(&self) -> bool {
        self.pipe_trained.is_some()
    }
}
