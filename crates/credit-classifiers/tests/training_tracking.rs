//! Direct and best-of-search training against the SQLite run store and a
//! mocked MLflow server.

use credit_classifiers::config::PipelineConfig;
use credit_classifiers::data::Table;
use credit_classifiers::evaluation::ClassifierEvaluation;
use credit_classifiers::models::factory::build_pipeline;
use credit_classifiers::tracking::{MlflowClient, RunStatus, SqliteTrackingStore, TrackingStore};
use credit_classifiers::training::ModelTraining;
use credit_classifiers::utils::load_model;
use credit_classifiers::PipelineError;
use mockito::Matcher;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn dataset() -> (Table, Vec<i32>) {
    let y: Vec<i32> = (0..40).map(|i| (i % 2) as i32).collect();
    let rows = y
        .iter()
        .enumerate()
        .map(|(i, &label)| {
            vec![
                label as f64 * 0.6 + (i % 5) as f64 * 0.1,
                25.0 + (i % 17) as f64,
                if i % 7 == 0 { f64::NAN } else { 1000.0 + (i * 37 % 400) as f64 },
            ]
        })
        .collect();
    let x = Table::from_rows(
        vec![
            "TaxaDeUtilizacaoDeLinhasNaoGarantidas".to_string(),
            "Idade".to_string(),
            "RendaMensal".to_string(),
        ],
        rows,
    )
    .unwrap();
    (x, y)
}

fn config(models_dir: &std::path::Path) -> PipelineConfig {
    PipelineConfig {
        models_dir: models_dir.to_path_buf(),
        model_name: "best.json".to_string(),
        registered_model_name: Some("credit_clf".to_string()),
        ..PipelineConfig::default()
    }
}

fn best_params(scaler: &str) -> Vec<(&'static str, String)> {
    vec![
        ("model_type", "gbdt".to_string()),
        ("learning_rate", "0.1".to_string()),
        ("max_depth", "3".to_string()),
        ("num_boost_round", "5".to_string()),
        ("imputer", "median".to_string()),
        ("discretiser", "equal_frequency".to_string()),
        ("n_bins", "4".to_string()),
        ("scaler", scaler.to_string()),
    ]
}

fn seed_run(store: &SqliteTrackingStore, params: &[(&str, String)], score: f64) -> String {
    let run_id = store.start_run("prob_loan").unwrap();
    for (key, value) in params {
        store.log_param(&run_id, key, value).unwrap();
    }
    store.log_metric(&run_id, "val_roc_auc", score).unwrap();
    store.end_run(&run_id, RunStatus::Finished).unwrap();
    run_id
}

// ---------------------------------------------------------------------------
// Direct mode and evaluation
// ---------------------------------------------------------------------------

#[test]
fn direct_training_persists_the_artifact() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let (x, y) = dataset();

    let training = ModelTraining::new(x.clone(), y, config.clone());
    let model = training
        .train(build_pipeline(&config.preprocessing, config.model.clone()))
        .unwrap();

    let restored = load_model(config.model_path()).unwrap();
    assert_eq!(
        model.predict_proba(&x).unwrap().len(),
        restored.predict_proba(&x).unwrap().len()
    );
}

#[test]
fn direct_training_failure_is_returned() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let (x, _) = dataset();
    let training = ModelTraining::new(x, vec![0, 1], config.clone());
    assert!(training
        .train(build_pipeline(&config.preprocessing, config.model.clone()))
        .is_err());
    assert!(!config.model_path().exists());
}

#[test]
fn cross_validation_scores_every_fold() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        k_fold: 4,
        ..config(dir.path())
    };
    let (x, y) = dataset();
    let steps = config.preprocessing.clone();
    let model = config.model.clone();
    let evaluation = ClassifierEvaluation::from_config(
        Box::new(move || build_pipeline(&steps, model.clone())),
        x,
        y,
        &config,
    );
    let scores = evaluation.cross_val_eval().unwrap();
    assert_eq!(scores.len(), 4);
    assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
}

// ---------------------------------------------------------------------------
// Best-of-search with the SQLite store
// ---------------------------------------------------------------------------

#[test]
fn best_run_ignores_perfect_scores() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteTrackingStore::open(dir.path().join("mlruns.db")).unwrap();
    let good = seed_run(&store, &best_params("standard"), 0.81);
    seed_run(&store, &best_params("min_max"), 1.0);
    seed_run(&store, &best_params("min_max"), 0.79);

    let (x, y) = dataset();
    let training = ModelTraining::new(x, y, config(dir.path()));
    let (params, score) = training.get_best_model(&store).unwrap();
    assert_eq!(params.run_id, good);
    assert_eq!(params.get("scaler"), Some("standard"));
    assert!((score - 0.81).abs() < 1e-12);
}

#[test]
fn no_qualifying_run_is_not_found() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteTrackingStore::in_memory().unwrap();
    seed_run(&store, &best_params("standard"), 1.0);

    let (x, y) = dataset();
    let training = ModelTraining::new(x, y, config(dir.path()));
    assert!(matches!(
        training.get_best_model(&store),
        Err(PipelineError::NotFound(_))
    ));
}

#[test]
fn best_of_search_logs_and_registers() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteTrackingStore::in_memory().unwrap();
    let source = seed_run(&store, &best_params("standard"), 0.8);

    let (x, y) = dataset();
    let config = config(dir.path());
    let outcome = ModelTraining::new(x, y, config.clone()).run(&store).unwrap();

    assert_eq!(outcome.best_params.run_id, source);
    assert!((0.0..=1.0).contains(&outcome.roc_auc));
    assert_eq!(outcome.version.name, "credit_clf");
    assert_eq!(outcome.version.version, "1");
    assert!(outcome.artifact_path.exists());
    assert_eq!(store.run_status(&outcome.run_id).unwrap(), "FINISHED");
    assert_eq!(
        store.tag(&outcome.run_id, "model_artifact").unwrap(),
        Some(config.model_path().display().to_string())
    );

    let runs = store.search_runs("prob_loan").unwrap();
    let logged = runs.iter().find(|r| r.run_id == outcome.run_id).unwrap();
    assert_eq!(logged.metric("roc_auc"), Some(outcome.roc_auc));
    assert_eq!(logged.param("n_bins"), Some("4"));
}

#[test]
fn unknown_tag_in_best_run_fails_before_logging() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteTrackingStore::in_memory().unwrap();
    seed_run(&store, &best_params("RobustScaler()"), 0.8);

    let (x, y) = dataset();
    let result = ModelTraining::new(x, y, config(dir.path())).run(&store);
    assert!(matches!(
        result,
        Err(PipelineError::UnknownTag { kind: "scaler", .. })
    ));
    assert_eq!(store.search_runs("prob_loan").unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// MLflow REST client
// ---------------------------------------------------------------------------

fn mlflow_run(run_id: &str, score: f64) -> serde_json::Value {
    let params: Vec<_> = best_params("standard")
        .into_iter()
        .map(|(k, v)| serde_json::json!({"key": k, "value": v}))
        .collect();
    serde_json::json!({
        "info": {"run_id": run_id, "status": "FINISHED"},
        "data": {
            "metrics": [{"key": "val_roc_auc", "value": score, "timestamp": 0, "step": 0}],
            "params": params
        }
    })
}

#[test]
fn mlflow_search_pages_through_runs() {
    init_logger();
    let mut server = mockito::Server::new();
    let _experiment = server
        .mock("GET", "/api/2.0/mlflow/experiments/get-by-name")
        .match_query(Matcher::UrlEncoded("experiment_name".into(), "prob_loan".into()))
        .with_status(200)
        .with_body(r#"{"experiment": {"experiment_id": "7", "name": "prob_loan"}}"#)
        .create();
    let _page_two = server
        .mock("POST", "/api/2.0/mlflow/runs/search")
        .match_body(Matcher::PartialJson(serde_json::json!({"page_token": "next"})))
        .with_status(200)
        .with_body(serde_json::json!({"runs": [mlflow_run("b", 0.9)]}).to_string())
        .create();
    let _page_one = server
        .mock("POST", "/api/2.0/mlflow/runs/search")
        .match_body(Matcher::Json(serde_json::json!({
            "experiment_ids": ["7"], "max_results": 1000
        })))
        .with_status(200)
        .with_body(
            serde_json::json!({"runs": [mlflow_run("a", 0.7), mlflow_run("c", 1.0)], "next_page_token": "next"})
                .to_string(),
        )
        .create();

    let client = MlflowClient::new(&server.url()).unwrap();
    let runs = client.search_runs("prob_loan").unwrap();
    let ids: Vec<&str> = runs.iter().map(|r| r.run_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "c", "b"]);

    let dir = tempfile::tempdir().unwrap();
    let (x, y) = dataset();
    let (params, score) = ModelTraining::new(x, y, config(dir.path()))
        .get_best_model(&client)
        .unwrap();
    assert_eq!(params.run_id, "b");
    assert!((score - 0.9).abs() < 1e-12);
}

#[test]
fn mlflow_unknown_experiment_is_not_found() {
    init_logger();
    let mut server = mockito::Server::new();
    let _missing = server
        .mock("GET", "/api/2.0/mlflow/experiments/get-by-name")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"error_code": "RESOURCE_DOES_NOT_EXIST"}"#)
        .create();

    let client = MlflowClient::new(&server.url()).unwrap();
    assert!(matches!(
        client.search_runs("prob_loan"),
        Err(PipelineError::NotFound(_))
    ));
}

#[test]
fn mlflow_registration_reuses_existing_model() {
    init_logger();
    let mut server = mockito::Server::new();
    let _exists = server
        .mock("POST", "/api/2.0/mlflow/registered-models/create")
        .with_status(400)
        .with_body(r#"{"error_code": "RESOURCE_ALREADY_EXISTS", "message": "exists"}"#)
        .create();
    let version = server
        .mock("POST", "/api/2.0/mlflow/model-versions/create")
        .match_body(Matcher::Json(serde_json::json!({
            "name": "credit_clf", "source": "models/best.json", "run_id": "r1"
        })))
        .with_status(200)
        .with_body(r#"{"model_version": {"name": "credit_clf", "version": "3"}}"#)
        .create();

    let client = MlflowClient::new(&server.url()).unwrap();
    let registered = client
        .register_model("credit_clf", "r1", "models/best.json")
        .unwrap();
    version.assert();
    assert_eq!(registered.version, "3");
}

#[test]
fn mlflow_client_takes_timeout_from_config() {
    init_logger();
    let mut server = mockito::Server::new();
    let _missing = server
        .mock("GET", "/api/2.0/mlflow/experiments/get-by-name")
        .match_query(Matcher::Any)
        .with_status(404)
        .create();

    let config = PipelineConfig {
        mlflow_uri: server.url(),
        request_timeout_secs: Some(3),
        ..PipelineConfig::default()
    };
    let client = MlflowClient::from_config(&config).unwrap();
    assert_eq!(client.timeout(), Some(std::time::Duration::from_secs(3)));
    assert_eq!(client.experiment_id("prob_loan").unwrap(), None);

    let untimed = MlflowClient::from_config(&PipelineConfig::default()).unwrap();
    assert_eq!(untimed.timeout(), None);
}
