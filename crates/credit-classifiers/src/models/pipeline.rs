use crate::data::Table;
use crate::error::{PipelineError, Result};
use crate::models::artifact::ModelArtifact;
use crate::models::classifier_trait::ClassifierModel;
use crate::preprocessing::{FittedPipeline, Pipeline};

/// Named transformation steps followed by a terminal estimator.
///
/// Untrained until `fit`; afterwards every prediction runs the fitted steps
/// before the estimator.
pub struct ModelPipeline {
    pipeline: Pipeline,
    fitted: Option<FittedPipeline>,
    estimator: Box<dyn ClassifierModel>,
}

impl ModelPipeline {
    pub fn new(pipeline: Pipeline, estimator: Box<dyn ClassifierModel>) -> Self {
        Self {
            pipeline,
            fitted: None,
            estimator,
        }
    }

    pub fn from_fitted(
        pipeline: Pipeline,
        fitted: FittedPipeline,
        estimator: Box<dyn ClassifierModel>,
    ) -> Self {
        Self {
            pipeline,
            fitted: Some(fitted),
            estimator,
        }
    }

    /// Names of the transformation steps, in order.
    pub fn step_names(&self) -> Vec<&str> {
        self.pipeline.steps.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn estimator(&self) -> &dyn ClassifierModel {
        self.estimator.as_ref()
    }
}

impl ClassifierModel for ModelPipeline {
    fn fit(&mut self, x: &Table, y: &[i32]) -> Result<()> {
        let fitted = self.pipeline.fit(x)?;
        let transformed = fitted.transform(x)?;
        self.estimator.fit(&transformed, y)?;
        self.fitted = Some(fitted);
        Ok(())
    }

    fn predict_proba(&self, x: &Table) -> Result<Vec<f64>> {
        let fitted = self.fitted.as_ref().ok_or(PipelineError::NotTrained)?;
        self.estimator.predict_proba(&fitted.transform(x)?)
    }

    fn to_artifact(&self) -> Result<ModelArtifact> {
        let fitted = self.fitted.as_ref().ok_or(PipelineError::NotTrained)?;
        Ok(ModelArtifact::Pipeline {
            spec: self.pipeline.clone(),
            steps: fitted.clone(),
            estimator: Box::new(self.estimator.to_artifact()?),
        })
    }

    fn name(&self) -> &str {
        "Pipeline"
    }
}
