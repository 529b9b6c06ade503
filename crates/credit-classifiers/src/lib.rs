//! credit-classifiers: a small credit-risk scoring pipeline.
//!
//! This crate loads and validates the credit dataset, fits preprocessing
//! pipelines and gradient-boosted classifiers, evaluates them with ROC-AUC,
//! talks to a run-tracking service and a model-serving endpoint, persists
//! scored rows to SQLite and renders drift-monitoring reports.
//!
//! Every operation returns [`error::Result`]; the only boolean contracts are
//! the schema checks in [`data::validation`].
pub mod config;
pub mod data;
pub mod error;
pub mod evaluation;
pub mod models;
pub mod monitor;
pub mod predict;
pub mod preprocessing;
pub mod report;
pub mod stats;
pub mod tracking;
pub mod training;
pub mod utils;

pub use error::{PipelineError, Result};
