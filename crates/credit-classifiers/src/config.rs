//! Pipeline and model configuration.
//!
//! The pipeline configuration is a static key-value file (YAML, or JSON when
//! the file ends in `.json`). Only the handful of keys the stages actually
//! read are required; everything else falls back to the defaults below.
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::data::schema::CREDIT_COLUMNS;
use crate::error::{PipelineError, Result};
use crate::preprocessing::steps::{BinMethod, ImputeMethod, ScaleMethod, StepSpec};

/// Central configuration for models in the crate.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub learning_rate: f32,

    #[serde(flatten)]
    pub model_type: ModelType,
}

/// Supported model types and their hyper-parameters.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub enum ModelType {
    GBDT {
        max_depth: u32,
        num_boost_round: u32,
        debug: bool,
        training_optimization_level: u8,
        loss_type: String,
    },
}

impl Default for ModelType {
    fn default() -> Self {
        ModelType::GBDT {
            max_depth: 6,
            num_boost_round: 3,
            debug: false,
            training_optimization_level: 2,
            loss_type: "LogLikelyhood".to_string(),
        }
    }
}

impl ModelType {
    /// Registry tag stored alongside tracked runs.
    pub fn tag(&self) -> &'static str {
        match self {
            ModelType::GBDT { .. } => "gbdt",
        }
    }
}

impl FromStr for ModelType {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "gbdt" => Ok(ModelType::default()),
            _ => Err(PipelineError::UnknownTag {
                kind: "model",
                tag: s.to_string(),
            }),
        }
    }
}

impl ModelConfig {
    pub fn new(learning_rate: f32, model_type: ModelType) -> Self {
        Self {
            learning_rate,
            model_type,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            model_type: ModelType::GBDT {
                max_depth: 6,
                num_boost_round: 50,
                debug: false,
                training_optimization_level: 2,
                loss_type: "LogLikelyhood".to_string(),
            },
        }
    }
}

/// Where tracked runs live.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrackingBackend {
    /// An MLflow tracking server reached over its REST API.
    Mlflow,
    /// A local SQLite run store.
    Sqlite,
}

/// Static configuration shared by every pipeline stage.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct PipelineConfig {
    pub target_column: String,
    pub test_size: f64,
    pub random_state: u64,
    pub k_fold: usize,
    /// File name of the persisted model artifact inside `models_dir`.
    pub model_name: String,
    pub models_dir: PathBuf,
    /// Registry name used by best-of-search training; falls back to `model_name`.
    pub registered_model_name: Option<String>,
    pub mlflow_uri: String,
    pub mlflow_experiment_name: String,
    pub tracking_backend: TrackingBackend,
    pub tracking_db: PathBuf,
    /// Validation metric used to rank tracked runs.
    pub search_metric: String,
    /// Column names forced onto incoming data, in order.
    pub columns_to_use: Vec<String>,
    pub scoring_endpoint: String,
    /// Number of leading rows sent to the scoring endpoint per request.
    pub batch_size: usize,
    /// Index column of files sent for scoring; `None` sends every column.
    pub scoring_index_col: Option<usize>,
    pub request_timeout_secs: Option<u64>,
    pub predictions_db: PathBuf,
    pub train_data: Option<PathBuf>,
    pub reference_data: Option<PathBuf>,
    pub report_path: PathBuf,
    pub model: ModelConfig,
    pub preprocessing: Vec<StepSpec>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_column: "target".to_string(),
            test_size: 0.2,
            random_state: 42,
            k_fold: 5,
            model_name: "model.json".to_string(),
            models_dir: PathBuf::from("models"),
            registered_model_name: None,
            mlflow_uri: "http://localhost:5000".to_string(),
            mlflow_experiment_name: "prob_loan".to_string(),
            tracking_backend: TrackingBackend::Mlflow,
            tracking_db: PathBuf::from("mlruns.db"),
            search_metric: "val_roc_auc".to_string(),
            columns_to_use: CREDIT_COLUMNS.iter().map(|c| c.to_string()).collect(),
            scoring_endpoint: "http://localhost:5001/invocations".to_string(),
            batch_size: 5,
            scoring_index_col: Some(0),
            request_timeout_secs: None,
            predictions_db: PathBuf::from("preds.db"),
            train_data: None,
            reference_data: None,
            report_path: PathBuf::from("docs/model_monitoring.html"),
            model: ModelConfig::default(),
            preprocessing: default_preprocessing(),
        }
    }
}

/// Imputer, discretiser and scaler, in that order.
pub fn default_preprocessing() -> Vec<StepSpec> {
    vec![
        StepSpec::Imputer {
            method: ImputeMethod::Median,
            fill_value: -1.0,
        },
        StepSpec::Discretiser {
            method: BinMethod::EqualFrequency,
            n_bins: 10,
        },
        StepSpec::Scaler {
            method: ScaleMethod::Standard,
        },
    ]
}

impl PipelineConfig {
    /// Path the trained artifact is written to.
    pub fn model_path(&self) -> PathBuf {
        self.models_dir.join(&self.model_name)
    }

    pub fn registered_model_name(&self) -> &str {
        self.registered_model_name
            .as_deref()
            .unwrap_or(&self.model_name)
    }

    /// Reject values no stage can work with.
    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(PipelineError::Config(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        if self.k_fold < 2 {
            return Err(PipelineError::Config(format!(
                "k_fold must be at least 2, got {}",
                self.k_fold
            )));
        }
        if self.batch_size == 0 {
            return Err(PipelineError::Config("batch_size must be positive".to_string()));
        }
        if self.columns_to_use.is_empty() {
            return Err(PipelineError::Config("columns_to_use is empty".to_string()));
        }
        if self.target_column.is_empty() {
            return Err(PipelineError::Config("target_column is empty".to_string()));
        }
        Ok(())
    }
}

/// Load a pipeline configuration from a YAML or JSON file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PipelineConfig> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(PipelineError::NotFound(format!(
            "config file {}",
            path.display()
        )));
    }
    let content = fs::read_to_string(path)?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let config: PipelineConfig = if is_json {
        serde_json::from_str(&content).map_err(|e| {
            PipelineError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?
    } else {
        serde_yaml::from_str(&content).map_err(|e| {
            PipelineError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?
    };

    config.validate()?;
    log::debug!("Loaded pipeline config from {}", path.display());
    Ok(config)
}
