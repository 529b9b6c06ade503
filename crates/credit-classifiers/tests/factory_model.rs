use credit_classifiers::config::{default_preprocessing, ModelConfig, ModelType};
use credit_classifiers::data::Table;
use credit_classifiers::models::factory;
use credit_classifiers::utils::{load_model, save_model};
use credit_classifiers::PipelineError;

fn tiny_dataset() -> (Table, Vec<i32>) {
    let x = Table::from_shape_vec(
        vec!["util".to_string(), "late90".to_string()],
        8,
        vec![
            1.0, 0.0, // default
            0.0, 1.0, // good payer
            1.0, 0.1, // default
            0.0, 0.9, // good payer
            1.1, 0.0, // default
            0.0, 1.2, // good payer
            0.9, f64::NAN, // default, missing value
            0.1, 1.1, // good payer
        ],
    )
    .expect("failed to create feature table");
    let y = vec![1, 0, 1, 0, 1, 0, 1, 0];
    (x, y)
}

fn params() -> ModelConfig {
    ModelConfig {
        learning_rate: 0.1,
        model_type: ModelType::GBDT {
            max_depth: 3,
            num_boost_round: 3,
            debug: false,
            training_optimization_level: 2,
            loss_type: "LogLikelyhood".to_string(),
        },
    }
}

#[test]
fn test_factory_builds_and_predicts() {
    let (x, y) = tiny_dataset();
    let complete: Vec<usize> = (0..6).collect();
    let x = x.select_rows(&complete);
    let y = y[..6].to_vec();

    let mut model = factory::build_model(params());
    model.fit(&x, &y).unwrap();
    let probs = model.predict_proba(&x).unwrap();
    assert_eq!(probs.len(), x.nrows());
    assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
}

#[test]
fn test_estimator_rejects_missing_values() {
    let (x, y) = tiny_dataset();
    let mut model = factory::build_model(params());
    assert!(model.fit(&x, &y).is_err());
}

#[test]
fn test_pipeline_imputes_then_predicts() {
    let (x, y) = tiny_dataset();
    let mut model = factory::build_pipeline(&default_preprocessing(), params());
    assert!(matches!(model.predict_proba(&x), Err(PipelineError::NotTrained)));

    model.fit(&x, &y).unwrap();
    let probs = model.predict_proba(&x).unwrap();
    assert_eq!(probs.len(), 8);
    assert_eq!(model.predict(&x).unwrap().len(), 8);
}

#[test]
fn test_artifact_round_trip() {
    let (x, y) = tiny_dataset();
    let mut model = factory::build_pipeline(&default_preprocessing(), params());
    model.fit(&x, &y).unwrap();
    let before = model.predict_proba(&x).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = save_model(model.as_ref(), dir.path().join("models"), "model.json").unwrap();
    let restored = load_model(&path).unwrap();
    let after = restored.predict_proba(&x).unwrap();

    for (a, b) in before.iter().zip(after.iter()) {
        assert!((a - b).abs() < 1e-9);
    }
}

#[test]
fn test_load_missing_artifact_is_not_found() {
    assert!(matches!(
        load_model("/nonexistent/model.json"),
        Err(PipelineError::NotFound(_))
    ));
}
