//! Hyper-parameters of the best tracked run and the registry that turns
//! their tags back into a model and a preprocessing pipeline.
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::config::{ModelConfig, ModelType};
use crate::error::{PipelineError, Result};
use crate::preprocessing::{ImputeMethod, ScaleMethod, StepSpec};
use crate::tracking::RunRecord;

/// Run parameters consumed when rebuilding the best model.
pub const BEST_PARAM_KEYS: [&str; 9] = [
    "model_type",
    "learning_rate",
    "max_depth",
    "num_boost_round",
    "imputer",
    "imputer_fill_value",
    "discretiser",
    "n_bins",
    "scaler",
];

const OPTIONAL_KEYS: [&str; 1] = ["imputer_fill_value"];

/// The named parameter subset of a tracked run.
#[derive(Debug, Clone, PartialEq)]
pub struct BestParams {
    pub run_id: String,
    values: BTreeMap<String, String>,
}

impl BestParams {
    /// Extract [`BEST_PARAM_KEYS`] from `run`; every key except
    /// `imputer_fill_value` is required.
    pub fn from_run(run: &RunRecord) -> Result<Self> {
        let mut values = BTreeMap::new();
        for key in BEST_PARAM_KEYS {
            match run.param(key) {
                Some(value) => {
                    values.insert(key.to_string(), value.to_string());
                }
                None if OPTIONAL_KEYS.contains(&key) => {}
                None => {
                    return Err(PipelineError::Tracking(format!(
                        "run {} has no '{}' parameter",
                        run.run_id, key
                    )))
                }
            }
        }
        Ok(Self {
            run_id: run.run_id.clone(),
            values,
        })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// All extracted parameters, for logging to a new run.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn parsed<T: FromStr>(&self, key: &str) -> Result<T> {
        let raw = self.get(key).ok_or_else(|| {
            PipelineError::Tracking(format!("missing parameter '{}'", key))
        })?;
        raw.trim().parse().map_err(|_| {
            PipelineError::Tracking(format!("parameter '{}' has invalid value '{}'", key, raw))
        })
    }

    /// Classifier configuration looked up by the `model_type` tag.
    pub fn model_config(&self) -> Result<ModelConfig> {
        let model_type: ModelType = self.tag("model_type")?;
        let model_type = match model_type {
            ModelType::GBDT {
                debug,
                training_optimization_level,
                loss_type,
                ..
            } => ModelType::GBDT {
                max_depth: self.parsed("max_depth")?,
                num_boost_round: self.parsed("num_boost_round")?,
                debug,
                training_optimization_level,
                loss_type,
            },
        };
        Ok(ModelConfig::new(self.parsed("learning_rate")?, model_type))
    }

    /// Imputer, discretiser and scaler looked up by their tags.
    pub fn steps(&self) -> Result<Vec<StepSpec>> {
        let imputer: ImputeMethod = self.tag("imputer")?;
        let fill_value = match self.get("imputer_fill_value") {
            Some(_) => self.parsed("imputer_fill_value")?,
            None => -1.0,
        };
        Ok(vec![
            StepSpec::Imputer {
                method: imputer,
                fill_value,
            },
            StepSpec::Discretiser {
                method: self.tag("discretiser")?,
                n_bins: self.parsed("n_bins")?,
            },
            StepSpec::Scaler {
                method: self.tag::<ScaleMethod>("scaler")?,
            },
        ])
    }

    fn tag<T: FromStr<Err = PipelineError>>(&self, key: &str) -> Result<T> {
        self.get(key)
            .ok_or_else(|| PipelineError::Tracking(format!("missing parameter '{}'", key)))?
            .parse()
    }
}
