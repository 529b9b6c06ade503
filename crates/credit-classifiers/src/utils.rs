//! Model artifact persistence.
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::models::{ClassifierModel, ModelArtifact};

/// Write `model` as a JSON artifact to `models_dir/model_name`, creating the
/// directory when needed. Returns the written path.
pub fn save_model<P: AsRef<Path>>(
    model: &dyn ClassifierModel,
    models_dir: P,
    model_name: &str,
) -> Result<PathBuf> {
    let dir = models_dir.as_ref();
    fs::create_dir_all(dir)?;
    let path = dir.join(model_name);

    let artifact = model.to_artifact()?;
    let bytes = serde_json::to_vec(&artifact)?;
    fs::write(&path, bytes).map_err(|e| {
        log::error!("Error saving model: {}", e);
        e
    })?;

    log::info!("Model saved successfully in {}", path.display());
    Ok(path)
}

/// Read an artifact written by [`save_model`] and rehydrate the model.
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Box<dyn ClassifierModel>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(PipelineError::NotFound(format!(
            "model artifact {}",
            path.display()
        )));
    }
    let bytes = fs::read(path)?;
    let artifact: ModelArtifact = serde_json::from_slice(&bytes)?;
    log::debug!("Loaded model artifact from {}", path.display());
    artifact.into_model()
}
