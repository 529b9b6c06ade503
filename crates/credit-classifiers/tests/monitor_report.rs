use std::fs;
use std::path::Path;

use credit_classifiers::config::PipelineConfig;
use credit_classifiers::data::Table;
use credit_classifiers::monitor::ModelMonitor;
use credit_classifiers::predict::{PredictionStore, PREDICTION_COLUMN};
use credit_classifiers::PipelineError;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn write_reference(path: &Path, rows: usize) {
    let mut csv = String::from("id,target,utilizacao,dependentes\n");
    for i in 0..rows {
        csv.push_str(&format!("{},{},{},{}\n", i, i % 2, (i % 50) as f64 / 50.0, i % 4));
    }
    fs::write(path, csv).unwrap();
}

fn scored_rows(rows: usize, shift: f64) -> Table {
    let utilizacao: Vec<f64> = (0..rows).map(|i| (i % 50) as f64 / 50.0 + shift).collect();
    let dependentes: Vec<f64> = (0..rows).map(|i| (i % 4) as f64).collect();
    let scores: Vec<f64> = (0..rows).map(|i| (i % 10) as f64 / 10.0).collect();
    Table::from_columns(vec![
        ("utilizacao".to_string(), utilizacao),
        ("dependentes".to_string(), dependentes),
        (PREDICTION_COLUMN.to_string(), scores),
    ])
    .unwrap()
}

#[test]
fn report_flags_shifted_column_and_writes_html() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let reference = dir.path().join("train.csv");
    write_reference(&reference, 200);

    let store = PredictionStore::new(dir.path().join("preds.db"));
    store.append(&scored_rows(200, 10.0)).unwrap();

    let report_path = dir.path().join("docs").join("monitoring.html");
    let monitor = ModelMonitor::new(store, reference, "target", report_path.clone());
    let report = monitor.run().unwrap();

    assert_eq!(report.common_columns, vec!["utilizacao", "dependentes"]);
    let flagged: Vec<(&str, bool)> = report
        .drift
        .columns
        .iter()
        .map(|c| (c.column.as_str(), c.drifted))
        .collect();
    assert_eq!(flagged, vec![("utilizacao", true), ("dependentes", false)]);
    assert_eq!(report.drift.n_drifted, 1);
    assert!(report.drift.dataset_drift);

    let html = fs::read_to_string(&report_path).unwrap();
    assert!(html.contains("Model Monitoring Report"));
    assert!(html.contains("Data Drift"));
    assert!(html.contains("Missing Values"));
}

#[test]
fn unchanged_inputs_report_no_dataset_drift() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let reference = dir.path().join("train.csv");
    write_reference(&reference, 100);

    let store = PredictionStore::new(dir.path().join("preds.db"));
    store.append(&scored_rows(100, 0.0)).unwrap();

    let monitor = ModelMonitor::new(store, reference, "target", dir.path().join("report.html"));
    let report = monitor.run().unwrap();
    assert_eq!(report.drift.n_drifted, 0);
    assert!(!report.drift.dataset_drift);
    assert_eq!(report.summary.current.rows, 100);
}

#[test]
fn monitoring_without_predictions_is_not_found() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let reference = dir.path().join("train.csv");
    write_reference(&reference, 20);
    let report_path = dir.path().join("report.html");

    let monitor = ModelMonitor::new(
        PredictionStore::new(dir.path().join("missing.db")),
        reference,
        "target",
        report_path.clone(),
    );
    assert!(matches!(monitor.run(), Err(PipelineError::NotFound(_))));
    assert!(!report_path.exists());
}

#[test]
fn monitor_config_falls_back_to_train_data() {
    init_logger();
    let mut config = PipelineConfig::default();
    assert!(matches!(
        ModelMonitor::from_config(&config),
        Err(PipelineError::Config(_))
    ));

    config.train_data = Some("data/train.csv".into());
    config.report_path = "out/report.html".into();
    let monitor = ModelMonitor::from_config(&config).unwrap();
    assert_eq!(monitor.report_path(), &std::path::PathBuf::from("out/report.html"));
}
