//! Run tracking: where hyper-parameter searches leave their runs and where
//! trained models are registered.
//!
//! Two stores implement [`TrackingStore`]: [`MlflowClient`] talks to an MLflow
//! tracking server over its REST API, [`SqliteTrackingStore`] keeps the same
//! records in a local SQLite file.
use std::collections::BTreeMap;
use std::path::Path;

use rand::Rng;

use crate::config::{PipelineConfig, TrackingBackend};
use crate::error::Result;

pub mod mlflow;
pub mod sqlite;

pub use mlflow::MlflowClient;
pub use sqlite::SqliteTrackingStore;

/// One tracked run with its string parameters and latest metric values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunRecord {
    pub run_id: String,
    pub params: BTreeMap<String, String>,
    pub metrics: BTreeMap<String, f64>,
}

impl RunRecord {
    pub fn metric(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).copied()
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "RUNNING",
            RunStatus::Finished => "FINISHED",
            RunStatus::Failed => "FAILED",
        }
    }
}

/// A model version created by [`TrackingStore::register_model`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelVersion {
    pub name: String,
    pub version: String,
}

/// Operations the training stage needs from a run-tracking backend.
pub trait TrackingStore {
    /// Every run recorded under `experiment`. Unknown experiment → `NotFound`.
    fn search_runs(&self, experiment: &str) -> Result<Vec<RunRecord>>;

    /// Open a new run under `experiment`, creating the experiment if needed.
    fn start_run(&self, experiment: &str) -> Result<String>;

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()>;

    fn log_metric(&self, run_id: &str, key: &str, value: f64) -> Result<()>;

    fn set_tag(&self, run_id: &str, key: &str, value: &str) -> Result<()>;

    /// Record where a run's artifact was written.
    fn log_artifact(&self, run_id: &str, path: &Path) -> Result<()> {
        self.set_tag(run_id, "model_artifact", &path.display().to_string())
    }

    fn end_run(&self, run_id: &str, status: RunStatus) -> Result<()>;

    /// Register the artifact at `source` as a new version of model `name`.
    fn register_model(&self, name: &str, run_id: &str, source: &str) -> Result<ModelVersion>;
}

/// Open the store selected by `tracking_backend`.
pub fn open_store(config: &PipelineConfig) -> Result<Box<dyn TrackingStore>> {
    match config.tracking_backend {
        TrackingBackend::Mlflow => {
            log::debug!("Tracking runs on MLflow server {}", config.mlflow_uri);
            Ok(Box::new(MlflowClient::from_config(config)?))
        }
        TrackingBackend::Sqlite => {
            log::debug!("Tracking runs in {}", config.tracking_db.display());
            Ok(Box::new(SqliteTrackingStore::open(&config.tracking_db)?))
        }
    }
}

/// 32 hex characters, the shape of an MLflow run id.
pub(crate) fn new_run_id() -> String {
    let mut rng = rand::thread_rng();
    (0..16).map(|_| format!("{:02x}", rng.gen::<u8>())).collect()
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
