use crate::config::{ModelConfig, ModelType};
use crate::models::classifier_trait::ClassifierModel;
use crate::models::gbdt::GBDTClassifier;
use crate::models::pipeline::ModelPipeline;
use crate::preprocessing::{Pipeline, StepSpec};

/// Build a boxed classifier model from a `ModelConfig`.
pub fn build_model(params: ModelConfig) -> Box<dyn ClassifierModel> {
    match params.model_type {
        ModelType::GBDT { .. } => Box::new(GBDTClassifier::new(params)),
    }
}

/// Build the estimator behind `steps`, e.g. imputer, discretiser, scaler.
pub fn build_pipeline(steps: &[StepSpec], params: ModelConfig) -> Box<dyn ClassifierModel> {
    Box::new(ModelPipeline::new(
        Pipeline::from_specs(steps),
        build_model(params),
    ))
}
