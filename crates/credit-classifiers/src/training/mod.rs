//! Model training: a direct fit-and-persist mode and a best-of-search mode
//! that rebuilds the strongest tracked configuration and registers it.
pub mod params;

pub use params::{BestParams, BEST_PARAM_KEYS};

use std::path::PathBuf;

use crate::config::PipelineConfig;
use crate::data::Table;
use crate::error::{PipelineError, Result};
use crate::evaluation::roc_auc_scorer;
use crate::models::factory::build_pipeline;
use crate::models::ClassifierModel;
use crate::tracking::{ModelVersion, RunStatus, TrackingStore};
use crate::utils::save_model;

/// What best-of-search training produced.
pub struct TrainingOutcome {
    pub model: Box<dyn ClassifierModel>,
    pub best_params: BestParams,
    /// Validation score of the tracked run the parameters came from.
    pub best_score: f64,
    /// ROC-AUC of the refitted pipeline on its own training data.
    pub roc_auc: f64,
    pub run_id: String,
    pub artifact_path: PathBuf,
    pub version: ModelVersion,
}

/// Trains models on a fixed feature table and label vector.
pub struct ModelTraining {
    x_data: Table,
    y_data: Vec<i32>,
    config: PipelineConfig,
}

impl ModelTraining {
    pub fn new(x_data: Table, y_data: Vec<i32>, config: PipelineConfig) -> Self {
        Self {
            x_data,
            y_data,
            config,
        }
    }

    /// Fit `model` and write its artifact to `models_dir/model_name`.
    pub fn train(&self, mut model: Box<dyn ClassifierModel>) -> Result<Box<dyn ClassifierModel>> {
        log::info!("Training model {}", model.name());
        model.fit(&self.x_data, &self.y_data).map_err(|e| {
            log::error!("Error training model: {}", e);
            e
        })?;
        log::info!("Model trained successfully.");
        save_model(model.as_ref(), &self.config.models_dir, &self.config.model_name)?;
        Ok(model)
    }

    /// Parameters and score of the best tracked run whose validation metric is
    /// strictly below 1.0.
    pub fn get_best_model(&self, store: &dyn TrackingStore) -> Result<(BestParams, f64)> {
        let experiment = &self.config.mlflow_experiment_name;
        let metric = &self.config.search_metric;

        let runs = store.search_runs(experiment)?;
        let best = runs
            .iter()
            .filter_map(|run| run.metric(metric).map(|score| (run, score)))
            .filter(|(_, score)| *score < 1.0)
            .max_by(|a, b| a.1.total_cmp(&b.1));

        let (run, score) = best.ok_or_else(|| {
            PipelineError::NotFound(format!(
                "no run in experiment '{}' with {} < 1.0",
                experiment, metric
            ))
        })?;
        log::info!("Best run {} has {} = {:.4}", run.run_id, metric, score);
        Ok((BestParams::from_run(run)?, score))
    }

    /// Rebuild, fit, score, log and register the best tracked configuration.
    pub fn run(&self, store: &dyn TrackingStore) -> Result<TrainingOutcome> {
        let (best_params, best_score) = self.get_best_model(store)?;

        let steps = best_params.steps()?;
        let mut model = build_pipeline(&steps, best_params.model_config()?);
        model.fit(&self.x_data, &self.y_data)?;

        // Scored on the fitting data; there is no held-out set at this stage.
        let roc_auc = roc_auc_scorer(model.as_ref(), &self.x_data, &self.y_data)?;
        log::info!("Refitted pipeline ROC-AUC: {:.4}", roc_auc);

        let run_id = store.start_run(&self.config.mlflow_experiment_name)?;
        match self.log_and_register(store, &run_id, model.as_ref(), &best_params, roc_auc) {
            Ok((artifact_path, version)) => {
                store.end_run(&run_id, RunStatus::Finished)?;
                Ok(TrainingOutcome {
                    model,
                    best_params,
                    best_score,
                    roc_auc,
                    run_id,
                    artifact_path,
                    version,
                })
            }
            Err(e) => {
                if let Err(end_err) = store.end_run(&run_id, RunStatus::Failed) {
                    log::warn!("Could not mark run {} as failed: {}", run_id, end_err);
                }
                Err(e)
            }
        }
    }

    fn log_and_register(
        &self,
        store: &dyn TrackingStore,
        run_id: &str,
        model: &dyn ClassifierModel,
        best_params: &BestParams,
        roc_auc: f64,
    ) -> Result<(PathBuf, ModelVersion)> {
        for (key, value) in best_params.iter() {
            store.log_param(run_id, key, value)?;
        }
        store.set_tag(run_id, "source_run_id", &best_params.run_id)?;
        store.log_metric(run_id, "roc_auc", roc_auc)?;

        let artifact_path = save_model(model, &self.config.models_dir, &self.config.model_name)?;
        store.log_artifact(run_id, &artifact_path)?;

        let name = self.config.registered_model_name();
        let version = store.register_model(name, run_id, &artifact_path.display().to_string())?;
        log::info!("Registered model '{}' version {}", name, version.version);
        Ok((artifact_path, version))
    }
}
