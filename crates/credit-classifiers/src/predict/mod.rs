//! Scoring against a served model and persisting what was scored.
pub mod client;
pub mod store;

pub use client::{DataframeSplit, ScoringClient, ScoringRequest};
pub use store::PredictionStore;

use std::time::Duration;

use crate::config::PipelineConfig;
use crate::data::Table;
use crate::error::Result;

/// Name of the probability column appended to scored rows.
pub const PREDICTION_COLUMN: &str = "Preds_Prob";

/// Columns of the canned connectivity-check batch.
pub const SMOKE_TEST_COLUMNS: [&str; 11] = [
    "Unnamed: 0",
    "TaxaDeUtilizacaoDeLinhasNaoGarantidas",
    "Idade",
    "NumeroDeVezes30-59DiasAtrasoNaoPior",
    "TaxaDeEndividamento",
    "RendaMensal",
    "NumeroDeLinhasDeCreditoEEmprestimosAbertos",
    "NumeroDeVezes90DiasAtraso",
    "NumeroDeEmprestimosOuLinhasImobiliarias",
    "NumeroDeVezes60-89DiasAtrasoNaoPior",
    "NumeroDeDependentes",
];

const SMOKE_TEST_ROWS: [[f64; 11]; 5] = [
    [0.0, 0.88551908, 43.0, 0.0, 0.177512717, 5700.0, 4.0, 0.0, 0.0, 0.0, 0.0],
    [1.0, 0.463295269, 57.0, 0.0, 0.527236928, 9141.0, 15.0, 0.0, 4.0, 0.0, 2.0],
    [2.0, 0.043275036, 59.0, 0.0, 0.687647522, 5083.0, 12.0, 0.0, 1.0, 0.0, 2.0],
    [3.0, 0.280308229, 38.0, 1.0, 0.925960637, 3200.0, 7.0, 0.0, 2.0, 0.0, 0.0],
    [4.0, 0.9999999, 27.0, 0.0, 0.019917227, 3865.0, 4.0, 0.0, 0.0, 0.0, 1.0],
];

/// The fixed five-row batch sent by [`Predict::test_endpoint_connection`].
pub fn smoke_test_request() -> ScoringRequest {
    ScoringRequest::new(DataframeSplit {
        columns: SMOKE_TEST_COLUMNS.iter().map(|c| c.to_string()).collect(),
        data: SMOKE_TEST_ROWS
            .iter()
            .map(|row| row.iter().map(|&v| Some(v)).collect())
            .collect(),
    })
}

/// Where a [`Predict`] is in its lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictState {
    Unsent,
    /// Holds the one-column `Preds_Prob` table of the last successful run.
    Scored(Table),
}

/// Sends the head of a table to the scoring endpoint and stores the result.
pub struct Predict {
    df: Table,
    client: ScoringClient,
    batch_size: usize,
    state: PredictState,
}

impl Predict {
    pub fn new(df: Table, config: &PipelineConfig) -> Result<Self> {
        let client = ScoringClient::new(
            &config.scoring_endpoint,
            config.request_timeout_secs.map(Duration::from_secs),
        )?;
        Ok(Self::with_client(df, client, config.batch_size))
    }

    pub fn with_client(df: Table, client: ScoringClient, batch_size: usize) -> Self {
        Self {
            df,
            client,
            batch_size,
            state: PredictState::Unsent,
        }
    }

    pub fn state(&self) -> &PredictState {
        &self.state
    }

    /// Score the first `batch_size` rows and append inputs plus `Preds_Prob`
    /// to `store`. Nothing is stored when the endpoint fails.
    pub fn run(&mut self, store: &PredictionStore) -> Result<Table> {
        log::info!("Starting model prediction");

        let request = ScoringRequest::new(DataframeSplit::from_table(&self.df, self.batch_size));
        let probabilities = self.client.score(&request)?;
        log::info!("Model prediction completed");

        let df_probs = Table::from_columns(vec![(PREDICTION_COLUMN.to_string(), probabilities.clone())])?;

        let scored_inputs = request
            .dataframe_split
            .to_table()?
            .with_column(PREDICTION_COLUMN, &probabilities)?;
        store.append(&scored_inputs)?;
        log::info!("Model prediction results stored in database");

        self.state = PredictState::Scored(df_probs.clone());
        Ok(df_probs)
    }

    /// Post the canned batch and fail on any transport error or non-success
    /// status. Nothing is stored.
    pub fn test_endpoint_connection(&self) -> Result<()> {
        match self.client.post(&smoke_test_request()) {
            Ok((status, body)) => {
                log::info!("Response status code: {}", status);
                log::info!("Response content: {}", body);
                Ok(())
            }
            Err(e) => {
                log::error!("Error connecting to endpoint: {}", e);
                Err(e)
            }
        }
    }
}
