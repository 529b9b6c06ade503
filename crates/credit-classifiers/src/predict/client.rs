//! HTTP client for a model-serving `/invocations` endpoint.
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data::Table;
use crate::error::{PipelineError, Result};

/// Column names plus row-major values; missing cells travel as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataframeSplit {
    pub columns: Vec<String>,
    pub data: Vec<Vec<Option<f64>>>,
}

impl DataframeSplit {
    /// The first `n_rows` rows of `table` (all rows when it is shorter).
    pub fn from_table(table: &Table, n_rows: usize) -> Self {
        Self {
            columns: table.columns().to_vec(),
            data: table
                .rows()
                .take(n_rows)
                .map(|row| {
                    row.iter()
                        .map(|&v| if v.is_nan() { None } else { Some(v) })
                        .collect()
                })
                .collect(),
        }
    }

    /// Rebuild a table from the payload; `null` becomes `NaN`.
    pub fn to_table(&self) -> Result<Table> {
        Table::from_rows(
            self.columns.clone(),
            self.data
                .iter()
                .map(|row| row.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
                .collect(),
        )
    }
}

/// Request body accepted by the serving endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringRequest {
    pub dataframe_split: DataframeSplit,
}

impl ScoringRequest {
    pub fn new(dataframe_split: DataframeSplit) -> Self {
        Self { dataframe_split }
    }

    pub fn n_rows(&self) -> usize {
        self.dataframe_split.data.len()
    }
}

/// Blocking client for one scoring endpoint.
pub struct ScoringClient {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl ScoringClient {
    pub fn new(endpoint: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            endpoint: endpoint.to_string(),
            client: builder.build()?,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST `request`; a non-success status becomes `UpstreamService`.
    /// Returns the status and body of a successful response.
    pub fn post(&self, request: &ScoringRequest) -> Result<(u16, String)> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(request)
            .send()?;
        let status = response.status();
        let body = response.text()?;
        log::debug!("Scoring endpoint answered {}", status);
        if !status.is_success() {
            log::error!("Status code: {}\n{}", status.as_u16(), body);
            return Err(PipelineError::UpstreamService {
                status: status.as_u16(),
                body,
            });
        }
        Ok((status.as_u16(), body))
    }

    /// Positive-class probability for every row of `request`.
    pub fn score(&self, request: &ScoringRequest) -> Result<Vec<f64>> {
        let (status, body) = self.post(request)?;
        let probabilities = parse_predictions(&body).map_err(|reason| {
            log::error!("Malformed scoring response: {}", reason);
            PipelineError::UpstreamService {
                status,
                body: format!("{}: {}", reason, body),
            }
        })?;
        if probabilities.len() != request.n_rows() {
            return Err(PipelineError::UpstreamService {
                status,
                body: format!(
                    "expected {} predictions, got {}",
                    request.n_rows(),
                    probabilities.len()
                ),
            });
        }
        Ok(probabilities)
    }
}

/// Column 1 of the `predictions` matrix.
fn parse_predictions(body: &str) -> std::result::Result<Vec<f64>, String> {
    let value: Value = serde_json::from_str(body).map_err(|e| format!("invalid JSON ({})", e))?;
    let rows = value
        .get("predictions")
        .and_then(Value::as_array)
        .ok_or("missing 'predictions' array")?;
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            row.as_array()
                .and_then(|r| r.get(1))
                .and_then(Value::as_f64)
                .ok_or_else(|| format!("prediction {} has no positive-class probability", i))
        })
        .collect()
}
