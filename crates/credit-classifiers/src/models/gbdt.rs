use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;

use crate::config::{ModelConfig, ModelType};
use crate::data::Table;
use crate::error::{PipelineError, Result};
use crate::models::artifact::ModelArtifact;
use crate::models::classifier_trait::ClassifierModel;

/// Loss under which the boosting library expects -1/1 labels and returns
/// probabilities from `predict`.
const LOG_LIKELIHOOD: &str = "LogLikelyhood";

/// Gradient Boosting Decision Tree (GBDT) classifier
pub struct GBDTClassifier {
    model: Option<GBDT>,
    feature_size: usize,
    params: ModelConfig,
}

impl GBDTClassifier {
    pub fn new(params: ModelConfig) -> Self {
        GBDTClassifier {
            model: None,
            feature_size: 0,
            params,
        }
    }

    /// Rebuild a fitted classifier from a persisted model.
    pub fn from_fitted(params: ModelConfig, feature_size: usize, model: GBDT) -> Self {
        GBDTClassifier {
            model: Some(model),
            feature_size,
            params,
        }
    }

    pub fn params(&self) -> &ModelConfig {
        &self.params
    }

    fn loss_type(&self) -> &str {
        match &self.params.model_type {
            ModelType::GBDT { loss_type, .. } => loss_type,
        }
    }

    fn to_data(&self, x: &Table) -> Result<DataVec> {
        if x.ncols() != self.feature_size {
            return Err(PipelineError::Shape(format!(
                "model was fitted on {} features, got {}",
                self.feature_size,
                x.ncols()
            )));
        }
        Ok(x.to_f32_rows()
            .into_iter()
            .map(|row| Data::new_training_data(row, 1.0, 0.0, None))
            .collect())
    }
}

impl ClassifierModel for GBDTClassifier {
    fn fit(&mut self, x: &Table, y: &[i32]) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(PipelineError::Shape(format!(
                "{} feature rows but {} labels",
                x.nrows(),
                y.len()
            )));
        }
        if x.is_empty() {
            return Err(PipelineError::Model("cannot fit on an empty table".to_string()));
        }
        if let Some(bad) = y.iter().find(|&&v| v != 0 && v != 1) {
            return Err(PipelineError::Model(format!(
                "labels must be 0 or 1, found {}",
                bad
            )));
        }
        if x.missing_count() > 0 {
            return Err(PipelineError::Model(
                "features contain missing values; impute them first".to_string(),
            ));
        }

        let ModelType::GBDT {
            max_depth,
            num_boost_round,
            debug,
            training_optimization_level,
            loss_type,
        } = &self.params.model_type;

        let mut config = Config::new();
        config.set_feature_size(x.ncols());
        config.set_shrinkage(self.params.learning_rate);
        config.set_max_depth(*max_depth);
        config.set_iterations(*num_boost_round as usize);
        config.set_debug(*debug);
        config.set_training_optimization_level(*training_optimization_level);
        config.set_loss(loss_type);

        let log_likelihood = loss_type == LOG_LIKELIHOOD;
        let mut train_x = DataVec::new();
        for (row, &label) in x.to_f32_rows().into_iter().zip(y) {
            let label = match (log_likelihood, label) {
                (true, 0) => -1.0,
                (_, l) => l as f32,
            };
            train_x.push(Data::new_training_data(row, 1.0, label, None));
        }

        let mut gbdt = GBDT::new(&config);
        gbdt.fit(&mut train_x);

        self.feature_size = x.ncols();
        self.model = Some(gbdt);
        Ok(())
    }

    fn predict_proba(&self, x: &Table) -> Result<Vec<f64>> {
        let model = self.model.as_ref().ok_or(PipelineError::NotTrained)?;
        let test_x = self.to_data(x)?;
        let predictions = model.predict(&test_x);
        let clamp = self.loss_type() != LOG_LIKELIHOOD;
        Ok(predictions
            .into_iter()
            .map(|p| {
                let p = p as f64;
                if clamp {
                    p.clamp(0.0, 1.0)
                } else {
                    p
                }
            })
            .collect())
    }

    fn to_artifact(&self) -> Result<ModelArtifact> {
        let model = self.model.as_ref().ok_or(PipelineError::NotTrained)?;
        Ok(ModelArtifact::Gbdt {
            config: self.params.clone(),
            feature_size: self.feature_size,
            model: serde_json::to_value(model)?,
        })
    }

    fn name(&self) -> &str {
        "GBDTClassifier"
    }
}
