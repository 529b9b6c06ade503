//! Serializable model artifacts.
use gbdt::gradient_boost::GBDT;
use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::error::Result;
use crate::models::classifier_trait::ClassifierModel;
use crate::models::gbdt::GBDTClassifier;
use crate::models::pipeline::ModelPipeline;
use crate::preprocessing::{FittedPipeline, Pipeline};

/// A fitted model as written to disk, tagged by kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    Gbdt {
        config: ModelConfig,
        feature_size: usize,
        model: serde_json::Value,
    },
    Pipeline {
        spec: Pipeline,
        steps: FittedPipeline,
        estimator: Box<ModelArtifact>,
    },
}

impl ModelArtifact {
    /// Rehydrate the fitted classifier.
    pub fn into_model(self) -> Result<Box<dyn ClassifierModel>> {
        match self {
            ModelArtifact::Gbdt {
                config,
                feature_size,
                model,
            } => {
                let model: GBDT = serde_json::from_value(model)?;
                Ok(Box::new(GBDTClassifier::from_fitted(
                    config,
                    feature_size,
                    model,
                )))
            }
            ModelArtifact::Pipeline {
                spec,
                steps,
                estimator,
            } => Ok(Box::new(ModelPipeline::from_fitted(
                spec,
                steps,
                estimator.into_model()?,
            ))),
        }
    }
}
