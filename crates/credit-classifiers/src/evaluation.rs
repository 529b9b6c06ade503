//! Cross-validated and held-out ROC-AUC evaluation.
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::config::PipelineConfig;
use crate::data::transform::class_indices;
use crate::data::Table;
use crate::error::{PipelineError, Result};
use crate::models::ClassifierModel;
use crate::stats::roc_auc;

/// Builds a fresh, unfitted model for every fold.
pub type ModelFactory = Box<dyn Fn() -> Box<dyn ClassifierModel> + Send + Sync>;

/// Scores a classifier on a labelled training set.
pub struct ClassifierEvaluation {
    factory: ModelFactory,
    x: Table,
    y: Vec<i32>,
    k_fold: usize,
    random_state: u64,
}

impl ClassifierEvaluation {
    pub fn new(factory: ModelFactory, x: Table, y: Vec<i32>, k_fold: usize) -> Self {
        Self {
            factory,
            x,
            y,
            k_fold,
            random_state: 42,
        }
    }

    pub fn from_config(factory: ModelFactory, x: Table, y: Vec<i32>, config: &PipelineConfig) -> Self {
        Self::new(factory, x, y, config.k_fold).with_random_state(config.random_state)
    }

    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = random_state;
        self
    }

    /// Stratified, shuffled k-fold assignment. Returns the held-out row
    /// positions of each fold; the remaining rows form its training set.
    pub fn stratified_folds(&self) -> Result<Vec<Vec<usize>>> {
        if self.k_fold < 2 {
            return Err(PipelineError::Evaluation(format!(
                "k_fold must be at least 2, got {}",
                self.k_fold
            )));
        }
        if self.x.nrows() != self.y.len() {
            return Err(PipelineError::Shape(format!(
                "{} feature rows but {} labels",
                self.x.nrows(),
                self.y.len()
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.random_state);
        let mut folds = vec![Vec::new(); self.k_fold];
        // Each class is dealt round-robin so every fold sees every class.
        let mut next = 0;
        for (label, mut indices) in class_indices(&self.y) {
            if indices.len() < self.k_fold {
                return Err(PipelineError::Evaluation(format!(
                    "class {} has {} members, fewer than k_fold={}",
                    label,
                    indices.len(),
                    self.k_fold
                )));
            }
            indices.shuffle(&mut rng);
            for idx in indices {
                folds[next].push(idx);
                next = (next + 1) % self.k_fold;
            }
        }
        for fold in folds.iter_mut() {
            fold.sort_unstable();
        }
        Ok(folds)
    }

    /// ROC-AUC of each fold, in fold order.
    pub fn cross_val_eval(&self) -> Result<Vec<f64>> {
        let folds = self.stratified_folds()?;
        let n_samples = self.y.len();

        let scores = folds
            .par_iter()
            .enumerate()
            .map(|(fold, test_idx)| {
                let mut held_out = vec![false; n_samples];
                for &i in test_idx {
                    held_out[i] = true;
                }
                let train_idx: Vec<usize> = (0..n_samples).filter(|&i| !held_out[i]).collect();

                log::debug!(
                    "Fold {}: {} training rows, {} held-out rows",
                    fold,
                    train_idx.len(),
                    test_idx.len()
                );

                let x_train = self.x.select_rows(&train_idx);
                let y_train: Vec<i32> = train_idx.iter().map(|&i| self.y[i]).collect();
                let x_test = self.x.select_rows(test_idx);
                let y_test: Vec<i32> = test_idx.iter().map(|&i| self.y[i]).collect();

                let mut model = (self.factory)();
                model.fit(&x_train, &y_train)?;
                roc_auc_scorer(model.as_ref(), &x_test, &y_test)
            })
            .collect::<Result<Vec<f64>>>()?;

        log::info!(
            "Cross-validated ROC-AUC over {} folds: mean {:.4}",
            scores.len(),
            scores.iter().sum::<f64>() / scores.len() as f64
        );
        Ok(scores)
    }

    /// ROC-AUC of `y_pred` scores against `y_true`.
    pub fn evaluate_predictions(y_true: &[i32], y_pred: &[f64]) -> Result<f64> {
        log::info!("Evaluation of predictions started");
        let score = roc_auc(y_true, y_pred).map_err(|e| {
            log::error!("Error evaluating predictions: {}", e);
            e
        })?;
        log::info!("ROC AUC score: {:.4}", score);
        Ok(score)
    }
}

/// Score a fitted model: positive-class probabilities, then ROC-AUC.
pub fn roc_auc_scorer(model: &dyn ClassifierModel, x: &Table, y: &[i32]) -> Result<f64> {
    let proba = model.predict_proba(x)?;
    roc_auc(y, &proba)
}
