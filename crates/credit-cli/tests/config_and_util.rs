//! Integration tests for CLI config loading and path helpers.

use std::io::Write;
use std::path::PathBuf;

use credit_cli::commands::{load_for_scoring, load_for_training, run_validate};
use credit_cli::util::{load_pipeline_config, load_table, resolve_data_path, validate_tsv_or_csv_file};

fn write_rows(path: &std::path::Path, targets: &[u8]) {
    let mut file = std::fs::File::create(path).unwrap();
    writeln!(file, ",t,a,b,c,d,e,f,g,h,i,j").unwrap();
    for (i, t) in targets.iter().enumerate() {
        writeln!(file, "{},{},0.5,40,0,0.3,4000,5,0,1,0,2", i, t).unwrap();
    }
}

// ---------------------------------------------------------------------------
// validate_tsv_or_csv_file / resolve_data_path
// ---------------------------------------------------------------------------

#[test]
fn validate_csv_file_exists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.csv");
    std::fs::File::create(&path).unwrap();
    assert!(validate_tsv_or_csv_file(&path).is_ok());
}

#[test]
fn validate_missing_file_fails() {
    assert!(validate_tsv_or_csv_file(&PathBuf::from("/nonexistent/data.tsv")).is_err());
}

#[test]
fn validate_wrong_extension_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");
    std::fs::File::create(&path).unwrap();
    assert!(validate_tsv_or_csv_file(&path).is_err());
}

#[test]
fn cli_path_overrides_configured_path() {
    let dir = tempfile::tempdir().unwrap();
    let cli = dir.path().join("cli.csv");
    let configured = dir.path().join("config.csv");
    std::fs::File::create(&cli).unwrap();
    std::fs::File::create(&configured).unwrap();

    assert_eq!(resolve_data_path(Some(&cli), Some(&configured), "data").unwrap(), cli);
    assert_eq!(resolve_data_path(None, Some(&configured), "data").unwrap(), configured);
    assert!(resolve_data_path(None, None, "training data").is_err());
}

// ---------------------------------------------------------------------------
// load_pipeline_config
// ---------------------------------------------------------------------------

#[test]
fn no_config_uses_defaults() {
    let config = load_pipeline_config(None).unwrap();
    assert_eq!(config.target_column, "target");
    assert_eq!(config.batch_size, 5);
    assert_eq!(config.scoring_endpoint, "http://localhost:5001/invocations");
}

#[test]
fn yaml_config_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "batch_size: 3\ntracking_backend: sqlite\n").unwrap();
    let config = load_pipeline_config(Some(&path)).unwrap();
    assert_eq!(config.batch_size, 3);
}

#[test]
fn invalid_config_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "batch_size: 0\n").unwrap();
    let err = load_pipeline_config(Some(&path)).unwrap_err();
    assert!(format!("{:#}", err).contains("config.yaml"));
}

// ---------------------------------------------------------------------------
// Loading and validation
// ---------------------------------------------------------------------------

#[test]
fn tsv_files_are_tab_separated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.tsv");
    std::fs::write(&path, "a\tb\n1\t2\n3\t\n").unwrap();
    let table = load_table(&path, None).unwrap();
    assert_eq!(table.shape(), (2, 2));
    assert!(table[(1, 1)].is_nan());
}

#[test]
fn validation_command_reports_pass_and_fail() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_pipeline_config(None).unwrap();

    let ok = dir.path().join("ok.csv");
    write_rows(&ok, &[1, 1, 1]);
    assert!(run_validate(&config, &ok).unwrap());

    let bad = dir.path().join("bad.csv");
    write_rows(&bad, &[0, 1, 2]);
    assert!(!run_validate(&config, &bad).unwrap());
}

#[test]
fn training_load_renames_columns_and_tolerates_label_zero() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_pipeline_config(None).unwrap();
    let path = dir.path().join("train.csv");
    write_rows(&path, &[0, 1, 0, 1]);

    let table = load_for_training(&config, &path).unwrap();
    assert_eq!(table.columns(), config.columns_to_use.as_slice());
    assert_eq!(table.column("target").unwrap(), vec![0.0, 1.0, 0.0, 1.0]);
}

#[test]
fn scoring_index_column_follows_config() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("rows.csv");
    write_rows(&data, &[1, 0]);

    let indexed = load_for_scoring(&Default::default(), &data).unwrap();
    assert_eq!(indexed.ncols(), 11);
    assert_eq!(indexed.columns()[0], "t");

    let cfg_path = dir.path().join("config.yaml");
    std::fs::write(&cfg_path, "scoring_index_col: null\n").unwrap();
    let config = load_pipeline_config(Some(&cfg_path)).unwrap();
    assert_eq!(config.scoring_index_col, None);

    let unindexed = load_for_scoring(&config, &data).unwrap();
    assert_eq!(unindexed.ncols(), 12);
    assert_eq!(unindexed.columns()[0], "Unnamed: 0");
    assert_eq!(unindexed.column_at(0), vec![0.0, 1.0]);
}
