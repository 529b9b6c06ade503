//! One handler per subcommand. Each returns `anyhow::Result` so the binary
//! can log the full context chain on failure.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use credit_classifiers::config::PipelineConfig;
use credit_classifiers::data::{DataTransform, DataValidation, Split, Table};
use credit_classifiers::evaluation::{roc_auc_scorer, ClassifierEvaluation, ModelFactory};
use credit_classifiers::models::factory::build_pipeline;
use credit_classifiers::monitor::{DriftReport, ModelMonitor};
use credit_classifiers::predict::{Predict, PredictionStore};
use credit_classifiers::tracking::open_store;
use credit_classifiers::training::ModelTraining;

use crate::util::load_table;

/// Column 0 of every training file is the row index.
const INDEX_COL: Option<usize> = Some(0);

/// Load `path`, force the configured column names and run the schema checks.
///
/// Schema failures are reported but do not stop training: the target check
/// only admits label 1, so a usable training set never passes it.
pub fn load_for_training(config: &PipelineConfig, path: &Path) -> Result<Table> {
    let mut table = load_table(path, INDEX_COL)?;
    let mut validation = DataValidation::new(config.columns_to_use.clone());
    if !validation.check_shape_data(&mut table) {
        anyhow::bail!(
            "{} has {} columns, expected {}",
            path.display(),
            table.ncols(),
            config.columns_to_use.len()
        );
    }
    if !validation.check_columns(&table) {
        log::warn!(
            "{} has {} schema failure case(s); continuing with training",
            path.display(),
            validation.failure_cases().len()
        );
    }
    Ok(table)
}

fn split_data(config: &PipelineConfig, table: Table) -> Result<Split> {
    DataTransform::new(table, config)
        .train_test_split()
        .context("Failed to split data into train and test sets")
}

fn pipeline_factory(config: &PipelineConfig) -> ModelFactory {
    let steps = config.preprocessing.clone();
    let model = config.model.clone();
    Box::new(move || build_pipeline(&steps, model.clone()))
}

/// `validate`: schema-check a data file. Returns whether it passed.
pub fn run_validate(config: &PipelineConfig, path: &Path) -> Result<bool> {
    let mut table = load_table(path, INDEX_COL)?;
    let mut validation = DataValidation::new(config.columns_to_use.clone());
    let passed = validation.run(&mut table);
    if passed {
        log::info!("{} passed validation ({} rows)", path.display(), table.nrows());
    } else {
        log::warn!(
            "{} failed validation with {} failure cases",
            path.display(),
            validation.failure_cases().len()
        );
    }
    Ok(passed)
}

/// `train`: fit the configured pipeline on the train split, persist it and
/// return its ROC-AUC on the test split.
pub fn run_train(config: &PipelineConfig, path: &Path) -> Result<f64> {
    let split = split_data(config, load_for_training(config, path)?)?;

    let model = build_pipeline(&config.preprocessing, config.model.clone());
    let training = ModelTraining::new(split.x_train, split.y_train, config.clone());
    let model = training.train(model).context("Training failed")?;

    let score = roc_auc_scorer(model.as_ref(), &split.x_test, &split.y_test)
        .context("Failed to score the test split")?;
    log::info!("Held-out ROC-AUC: {:.4}", score);
    Ok(score)
}

/// `evaluate`: cross-validate the configured pipeline on the train split.
pub fn run_evaluate(config: &PipelineConfig, path: &Path) -> Result<Vec<f64>> {
    let split = split_data(config, load_for_training(config, path)?)?;
    ClassifierEvaluation::from_config(pipeline_factory(config), split.x_train, split.y_train, config)
        .cross_val_eval()
        .context("Cross-validation failed")
}

/// `best-model`: rebuild the best tracked run, fit it on the train split and
/// register it. Returns the registered version.
pub fn run_best_model(config: &PipelineConfig, path: &Path) -> Result<String> {
    let split = split_data(config, load_for_training(config, path)?)?;
    let store = open_store(config).context("Failed to open the tracking store")?;

    let outcome = ModelTraining::new(split.x_train, split.y_train, config.clone())
        .run(store.as_ref())
        .context("Best-model training failed")?;
    log::info!(
        "Run {} refit best parameters from run {} (search score {:.4}, fit ROC-AUC {:.4})",
        outcome.run_id,
        outcome.best_params.run_id,
        outcome.best_score,
        outcome.roc_auc
    );
    Ok(outcome.version.version)
}

/// Load rows to score. With `scoring_index_col: null` the leading column is
/// sent as `Unnamed: 0`, like the canned connectivity batch.
pub fn load_for_scoring(config: &PipelineConfig, path: &Path) -> Result<Table> {
    load_table(path, config.scoring_index_col)
}

/// `predict`: score the head of a data file and store the scored rows.
pub fn run_predict(config: &PipelineConfig, path: &Path) -> Result<Vec<f64>> {
    let table = load_for_scoring(config, path)?;
    let store = PredictionStore::new(&config.predictions_db);
    let mut predict = Predict::new(table, config)?;
    let probs = predict
        .run(&store)
        .with_context(|| format!("Prediction against {} failed", config.scoring_endpoint))?;
    Ok(probs.column_at(0))
}

/// `ping`: send the canned batch to the scoring endpoint.
pub fn run_ping(config: &PipelineConfig) -> Result<()> {
    Predict::new(Table::default(), config)?
        .test_endpoint_connection()
        .with_context(|| format!("Endpoint {} is not reachable", config.scoring_endpoint))
}

/// `monitor`: write the drift report comparing stored predictions with the
/// reference data.
pub fn run_monitor(
    config: &PipelineConfig,
    reference: Option<&PathBuf>,
    output: Option<&PathBuf>,
) -> Result<DriftReport> {
    let mut config = config.clone();
    if let Some(reference) = reference {
        config.reference_data = Some(reference.clone());
    }
    if let Some(output) = output {
        config.report_path = output.clone();
    }
    let monitor = ModelMonitor::from_config(&config)?;
    let report = monitor.run().context("Monitoring failed")?;
    Ok(report)
}
