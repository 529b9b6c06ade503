//! Drift monitoring of scored inputs against the training data.
pub mod drift;

pub use drift::{compute_report, DriftReport};

use std::path::PathBuf;

use maud::html;

use crate::config::PipelineConfig;
use crate::data::{DataLoad, Table};
use crate::error::{PipelineError, Result};
use crate::predict::{PredictionStore, PREDICTION_COLUMN};
use crate::report::plots::{plot_distribution_comparison, plot_score_histogram};
use crate::report::{Report, ReportSection};

/// Builds the monitoring page from the prediction store and reference data.
pub struct ModelMonitor {
    store: PredictionStore,
    reference_data: PathBuf,
    target_column: String,
    report_path: PathBuf,
}

impl ModelMonitor {
    pub fn new(
        store: PredictionStore,
        reference_data: PathBuf,
        target_column: &str,
        report_path: PathBuf,
    ) -> Self {
        Self {
            store,
            reference_data,
            target_column: target_column.to_string(),
            report_path,
        }
    }

    /// Requires `reference_data`, falling back to `train_data`.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let reference = config
            .reference_data
            .clone()
            .or_else(|| config.train_data.clone())
            .ok_or_else(|| {
                PipelineError::Config("monitoring needs reference_data or train_data".to_string())
            })?;
        Ok(Self::new(
            PredictionStore::new(&config.predictions_db),
            reference,
            &config.target_column,
            config.report_path.clone(),
        ))
    }

    pub fn report_path(&self) -> &PathBuf {
        &self.report_path
    }

    /// The whole `predictions` table.
    pub fn get_pred_data(&self) -> Result<Table> {
        self.store.load_all()
    }

    /// Reference data read with column 0 as index.
    pub fn get_training_data(&self) -> Result<Table> {
        DataLoad::new().run(&self.reference_data, Some(0))
    }

    /// Compute the report and write it to `report_path`.
    pub fn run(&self) -> Result<DriftReport> {
        let current = self.get_pred_data()?;
        let reference = self.get_training_data()?.drop_column(&self.target_column)?;
        log::info!(
            "Monitoring {} scored rows against {} reference rows",
            current.nrows(),
            reference.nrows()
        );

        let report = compute_report(&reference, &current)?;
        self.render(&report, &reference, &current)?
            .save_to_file(&self.report_path)?;
        log::info!("Monitoring report written to {}", self.report_path.display());
        Ok(report)
    }

    fn render(&self, report: &DriftReport, reference: &Table, current: &Table) -> Result<Report> {
        let mut page = Report::new(
            "credit",
            env!("CARGO_PKG_VERSION"),
            None,
            "Model Monitoring Report",
        );

        let (r, c) = (&report.summary.reference, &report.summary.current);
        let mut summary = ReportSection::new("Dataset Summary");
        summary.add_content(html! {
            table {
                tr { th { "" } th { "Reference" } th { "Current" } }
                tr { td { "Rows" } td { (r.rows) } td { (c.rows) } }
                tr { td { "Columns" } td { (r.columns) } td { (c.columns) } }
                tr { td { "Missing cells" } td { (r.missing_cells) } td { (c.missing_cells) } }
                tr {
                    td { "Missing share" }
                    td { (format!("{:.2}%", r.missing_share * 100.0)) }
                    td { (format!("{:.2}%", c.missing_share * 100.0)) }
                }
                tr { td { "Constant columns" } td { (r.constant_columns) } td { (c.constant_columns) } }
                tr { td { "Empty columns" } td { (r.empty_columns) } td { (c.empty_columns) } }
            }
        });
        page.add_section(summary);

        let drift = &report.drift;
        let mut drift_section = ReportSection::new("Data Drift");
        drift_section.add_content(html! {
            p {
                "Drift is detected for " (drift.n_drifted) " out of " (drift.columns.len())
                " columns (" (format!("{:.1}%", drift.share_drifted * 100.0)) "). "
                @if drift.dataset_drift {
                    span class="drift" { "Dataset drift detected." }
                } @else {
                    "Dataset drift is not detected."
                }
            }
            table {
                tr { th { "Column" } th { "Stat test" } th { "Score" } th { "Threshold" } th { "Drift" } }
                @for col in &drift.columns {
                    tr {
                        td { (col.column) }
                        td { (col.method.name()) }
                        td { (format!("{:.4}", col.score)) }
                        td { (col.method.threshold()) }
                        @if col.drifted {
                            td class="drift" { "Detected" }
                        } @else {
                            td { "Not detected" }
                        }
                    }
                }
            }
            @if !drift.skipped.is_empty() {
                p { "Not tested (no values): " (drift.skipped.join(", ")) }
            }
        });
        for col in drift.columns.iter().filter(|c| c.drifted) {
            drift_section.add_plot(plot_distribution_comparison(
                &reference.column(&col.column)?,
                &current.column(&col.column)?,
                &col.column,
            ));
        }
        page.add_section(drift_section);

        let missing = &report.missing;
        let mut missing_section = ReportSection::new("Missing Values");
        missing_section.add_content(html! {
            p {
                "Reference: " (missing.reference_total) " missing cells. "
                "Current: " (missing.current_total) " missing cells."
            }
            table {
                tr { th { "Column" } th { "Reference" } th { "Current" } }
                @for m in &missing.columns {
                    tr {
                        td { (m.column) }
                        td { (m.reference_missing) " (" (format!("{:.1}%", m.reference_share * 100.0)) ")" }
                        td { (m.current_missing) " (" (format!("{:.1}%", m.current_share * 100.0)) ")" }
                    }
                }
            }
        });
        page.add_section(missing_section);

        if let Ok(scores) = current.column(PREDICTION_COLUMN) {
            let mut scores_section = ReportSection::new("Predictions");
            scores_section.add_plot(plot_score_histogram(&scores, "Predicted probability of default"));
            page.add_section(scores_section);
        }

        Ok(page)
    }
}
