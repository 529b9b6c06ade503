//! Blocking client for the MLflow tracking REST API (`/api/2.0/mlflow`).
use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::tracking::{now_millis, ModelVersion, RunRecord, RunStatus, TrackingStore};

const API_PREFIX: &str = "api/2.0/mlflow";
const SEARCH_PAGE_SIZE: u32 = 1000;

#[derive(Debug, Deserialize)]
struct KeyValue<T> {
    key: String,
    value: T,
}

#[derive(Debug, Deserialize)]
struct RunInfo {
    run_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct RunData {
    #[serde(default)]
    metrics: Vec<KeyValue<f64>>,
    #[serde(default)]
    params: Vec<KeyValue<String>>,
}

#[derive(Debug, Deserialize)]
struct Run {
    info: RunInfo,
    #[serde(default)]
    data: RunData,
}

#[derive(Debug, Deserialize)]
struct SearchRunsResponse {
    #[serde(default)]
    runs: Vec<Run>,
    next_page_token: Option<String>,
}

impl From<Run> for RunRecord {
    fn from(run: Run) -> Self {
        RunRecord {
            run_id: run.info.run_id,
            params: run
                .data
                .params
                .into_iter()
                .map(|kv| (kv.key, kv.value))
                .collect(),
            metrics: run
                .data
                .metrics
                .into_iter()
                .map(|kv| (kv.key, kv.value))
                .collect::<BTreeMap<_, _>>(),
        }
    }
}

/// MLflow tracking server client.
pub struct MlflowClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout: Option<Duration>,
}

impl MlflowClient {
    pub fn new(tracking_uri: &str) -> Result<Self> {
        Self::with_timeout(tracking_uri, None)
    }

    pub fn with_timeout(tracking_uri: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            base_url: tracking_uri.trim_end_matches('/').to_string(),
            client: builder.build()?,
            timeout,
        })
    }

    /// Client for `mlflow_uri`, honouring `request_timeout_secs`.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Self::with_timeout(
            &config.mlflow_uri,
            config.request_timeout_secs.map(Duration::from_secs),
        )
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}/{}", self.base_url, API_PREFIX, endpoint)
    }

    fn handle(response: reqwest::blocking::Response) -> Result<Value> {
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(PipelineError::UpstreamService {
                status: status.as_u16(),
                body,
            });
        }
        if body.trim().is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        Ok(serde_json::from_str(&body)?)
    }

    fn post(&self, endpoint: &str, body: Value) -> Result<Value> {
        log::debug!("POST {}", endpoint);
        Self::handle(self.client.post(self.url(endpoint)).json(&body).send()?)
    }

    fn get(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<Value> {
        log::debug!("GET {}", endpoint);
        Self::handle(self.client.get(self.url(endpoint)).query(query).send()?)
    }

    fn field<'a>(value: &'a Value, pointer: &str) -> Result<&'a str> {
        value.pointer(pointer).and_then(Value::as_str).ok_or_else(|| {
            PipelineError::Tracking(format!("response is missing '{}': {}", pointer, value))
        })
    }

    /// Id of the experiment called `name`, if the server knows it.
    pub fn experiment_id(&self, name: &str) -> Result<Option<String>> {
        match self.get("experiments/get-by-name", &[("experiment_name", name)]) {
            Ok(response) => Ok(Some(
                Self::field(&response, "/experiment/experiment_id")?.to_string(),
            )),
            Err(PipelineError::UpstreamService { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn get_or_create_experiment(&self, name: &str) -> Result<String> {
        if let Some(id) = self.experiment_id(name)? {
            return Ok(id);
        }
        log::info!("Creating MLflow experiment '{}'", name);
        let response = self.post("experiments/create", json!({ "name": name }))?;
        Ok(Self::field(&response, "/experiment_id")?.to_string())
    }
}

impl TrackingStore for MlflowClient {
    fn search_runs(&self, experiment: &str) -> Result<Vec<RunRecord>> {
        let experiment_id = self
            .experiment_id(experiment)?
            .ok_or_else(|| PipelineError::NotFound(format!("experiment '{}'", experiment)))?;

        let mut runs = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut body = json!({
                "experiment_ids": [experiment_id],
                "max_results": SEARCH_PAGE_SIZE,
            });
            if let Some(token) = &page_token {
                body["page_token"] = json!(token);
            }
            let page: SearchRunsResponse = serde_json::from_value(self.post("runs/search", body)?)?;
            runs.extend(page.runs.into_iter().map(RunRecord::from));
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        log::debug!("Found {} runs in experiment '{}'", runs.len(), experiment);
        Ok(runs)
    }

    fn start_run(&self, experiment: &str) -> Result<String> {
        let experiment_id = self.get_or_create_experiment(experiment)?;
        let response = self.post(
            "runs/create",
            json!({ "experiment_id": experiment_id, "start_time": now_millis() }),
        )?;
        Ok(Self::field(&response, "/run/info/run_id")?.to_string())
    }

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.post(
            "runs/log-parameter",
            json!({ "run_id": run_id, "key": key, "value": value }),
        )?;
        Ok(())
    }

    fn log_metric(&self, run_id: &str, key: &str, value: f64) -> Result<()> {
        self.post(
            "runs/log-metric",
            json!({
                "run_id": run_id,
                "key": key,
                "value": value,
                "timestamp": now_millis(),
                "step": 0,
            }),
        )?;
        Ok(())
    }

    fn set_tag(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.post(
            "runs/set-tag",
            json!({ "run_id": run_id, "key": key, "value": value }),
        )?;
        Ok(())
    }

    fn end_run(&self, run_id: &str, status: RunStatus) -> Result<()> {
        self.post(
            "runs/update",
            json!({ "run_id": run_id, "status": status.as_str(), "end_time": now_millis() }),
        )?;
        Ok(())
    }

    fn register_model(&self, name: &str, run_id: &str, source: &str) -> Result<ModelVersion> {
        match self.post("registered-models/create", json!({ "name": name })) {
            Ok(_) => log::info!("Created registered model '{}'", name),
            Err(PipelineError::UpstreamService { body, .. })
                if body.contains("RESOURCE_ALREADY_EXISTS") =>
            {
                log::debug!("Registered model '{}' already exists", name)
            }
            Err(e) => return Err(e),
        }
        let response = self.post(
            "model-versions/create",
            json!({ "name": name, "source": source, "run_id": run_id }),
        )?;
        Ok(ModelVersion {
            name: name.to_string(),
            version: Self::field(&response, "/model_version/version")?.to_string(),
        })
    }
}
