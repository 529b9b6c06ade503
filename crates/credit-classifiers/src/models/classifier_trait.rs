use crate::data::Table;
use crate::error::Result;
use crate::models::artifact::ModelArtifact;

/// A small trait abstraction for binary classifiers used by training,
/// evaluation and persistence. Labels are 0 (good payer) and 1 (default).
pub trait ClassifierModel {
    /// Fit the model. Fitting again discards the previous fit.
    fn fit(&mut self, x: &Table, y: &[i32]) -> Result<()>;

    /// Probability of the positive class (label 1) for every row.
    fn predict_proba(&self, x: &Table) -> Result<Vec<f64>>;

    /// Hard labels at a 0.5 probability threshold.
    fn predict(&self, x: &Table) -> Result<Vec<i32>> {
        Ok(self
            .predict_proba(x)?
            .into_iter()
            .map(|p| i32::from(p >= 0.5))
            .collect())
    }

    /// Serializable snapshot of the fitted model.
    fn to_artifact(&self) -> Result<ModelArtifact>;

    /// Optional human readable name for the model
    fn name(&self) -> &str {
        "classifier"
    }
}
