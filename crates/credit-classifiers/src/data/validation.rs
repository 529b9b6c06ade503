//! Schema validation of incoming tables.
use crate::data::schema::{credit_schema, FailureCase, Schema};
use crate::data::table::Table;
use crate::error::{PipelineError, Result};

/// Forces the configured column names onto a table and checks it against the
/// credit schema.
#[derive(Debug, Clone)]
pub struct DataValidation {
    columns_to_use: Vec<String>,
    schema: Schema,
    failures: Vec<FailureCase>,
}

impl DataValidation {
    pub fn new(columns_to_use: Vec<String>) -> Self {
        Self::with_schema(columns_to_use, credit_schema())
    }

    pub fn with_schema(columns_to_use: Vec<String>, schema: Schema) -> Self {
        Self {
            columns_to_use,
            schema,
            failures: Vec::new(),
        }
    }

    /// Failure cases recorded by the last `check_columns` call.
    pub fn failure_cases(&self) -> &[FailureCase] {
        &self.failures
    }

    /// Rename the table's columns to `columns_to_use`, positionally.
    ///
    /// A column-count mismatch is the only shape failure; it is logged and
    /// reported as `false`.
    pub fn check_shape_data(&self, table: &mut Table) -> bool {
        log::info!("Validation started");
        match table.set_columns(&self.columns_to_use) {
            Ok(()) => true,
            Err(e) => {
                log::error!("Validation failed: {}", e);
                false
            }
        }
    }

    /// Validate every column against the schema, logging each failure case.
    pub fn check_columns(&mut self, table: &Table) -> bool {
        self.failures = self.schema.failure_cases(table);
        if self.failures.is_empty() {
            log::info!("Validation passed");
            return true;
        }

        log::error!(
            "Validation failed: {} failure case(s) in {} rows",
            self.failures.len(),
            table.nrows()
        );
        for case in &self.failures {
            log::error!(
                "  column={} row={} check={} value={}",
                case.column,
                case.row.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string()),
                case.check,
                case.value.map(|v| v.to_string()).unwrap_or_else(|| "null".to_string()),
            );
        }
        false
    }

    /// Shape check then column check, stopping at the first failure.
    pub fn run(&mut self, table: &mut Table) -> bool {
        if !self.check_shape_data(table) {
            return false;
        }
        if !self.check_columns(table) {
            return false;
        }
        log::info!("Validation successful");
        true
    }

    /// Same checks as [`run`](Self::run), reported as an error that lists the
    /// failure cases.
    pub fn validate(&mut self, table: &mut Table) -> Result<()> {
        self.failures.clear();
        if self.run(table) {
            return Ok(());
        }
        if self.failures.is_empty() {
            return Err(PipelineError::Validation(format!(
                "expected {} columns, found {}",
                self.columns_to_use.len(),
                table.ncols()
            )));
        }
        let summary = self
            .failures
            .iter()
            .take(10)
            .map(|c| format!("{}[{}]: {}", c.column, c.row.map(|r| r.to_string()).unwrap_or_default(), c.check))
            .collect::<Vec<_>>()
            .join(", ");
        Err(PipelineError::Validation(format!(
            "{} failure case(s): {}",
            self.failures.len(),
            summary
        )))
    }
}
