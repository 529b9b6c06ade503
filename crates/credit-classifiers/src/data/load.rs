//! Delimited-file reader.
use std::path::Path;

use csv::StringRecord;

use crate::data::table::Table;
use crate::error::{PipelineError, Result};

/// Cells read as missing values.
const MISSING_MARKERS: [&str; 6] = ["", "NA", "N/A", "NaN", "nan", "null"];

/// Reads a CSV file into a [`Table`].
#[derive(Debug, Clone)]
pub struct DataLoad {
    delimiter: u8,
}

impl Default for DataLoad {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl DataLoad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use another field delimiter (e.g. `b'\t'`).
    pub fn with_delimiter(delimiter: u8) -> Self {
        Self { delimiter }
    }

    /// Read `data_file`. When `index_col` is set, that column becomes the row
    /// index and is removed from the data columns.
    pub fn run<P: AsRef<Path>>(&self, data_file: P, index_col: Option<usize>) -> Result<Table> {
        let path = data_file.as_ref();
        log::info!("Reading data from CSV file {}", path.display());

        if !path.exists() {
            log::error!("File {} not found.", path.display());
            return Err(PipelineError::NotFound(format!("file {}", path.display())));
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .from_path(path)
            .map_err(|e| {
                log::error!("Error reading data from {}: {}", path.display(), e);
                e
            })?;

        let headers = reader.headers()?.clone();
        if let Some(idx) = index_col {
            if idx >= headers.len() {
                return Err(PipelineError::Shape(format!(
                    "index column {} out of range for {} columns",
                    idx,
                    headers.len()
                )));
            }
        }

        let columns: Vec<String> = column_names(&headers)
            .into_iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != index_col)
            .map(|(_, name)| name)
            .collect();

        let mut data = Vec::new();
        let mut index = Vec::new();
        let mut rows = 0;

        for (row_idx, result) in reader.records().enumerate() {
            let record = result?;
            if record.len() != headers.len() {
                return Err(PipelineError::Shape(format!(
                    "row {} has {} fields, header has {}",
                    row_idx + 1,
                    record.len(),
                    headers.len()
                )));
            }
            for (col_idx, value) in record.iter().enumerate() {
                if Some(col_idx) == index_col {
                    index.push(value.trim().to_string());
                    continue;
                }
                data.push(parse_cell(value).ok_or_else(|| PipelineError::Parse {
                    row: row_idx + 1,
                    column: headers.get(col_idx).unwrap_or_default().to_string(),
                    value: value.to_string(),
                })?);
            }
            rows += 1;
        }

        let mut table = Table::from_shape_vec(columns, rows, data)?;
        if index_col.is_some() {
            table.set_index(index)?;
        }

        log::info!(
            "Data read successfully: {} rows, {} columns.",
            table.nrows(),
            table.ncols()
        );
        Ok(table)
    }
}

/// Header names, with blank headers named `Unnamed: <position>`.
fn column_names(headers: &StringRecord) -> Vec<String> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let h = h.trim();
            if h.is_empty() {
                format!("Unnamed: {}", i)
            } else {
                h.to_string()
            }
        })
        .collect()
}

fn parse_cell(value: &str) -> Option<f64> {
    let value = value.trim();
    if MISSING_MARKERS.contains(&value) {
        return Some(f64::NAN);
    }
    value.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_index_column_and_missing_cells() {
        let file = write_csv(",target,Idade\n0,1,43\n1,0,\n2,1,NA\n");
        let table = DataLoad::new().run(file.path(), Some(0)).unwrap();

        assert_eq!(table.columns(), &["target".to_string(), "Idade".to_string()]);
        assert_eq!(table.index().unwrap(), &["0", "1", "2"]);
        assert_eq!(table.nrows(), 3);
        assert!(table[(1, 1)].is_nan());
        assert!(table[(2, 1)].is_nan());
        assert_eq!(table[(0, 1)], 43.0);
    }

    #[test]
    fn blank_header_without_index_is_unnamed() {
        let file = write_csv(",a\n0,1.5\n");
        let table = DataLoad::new().run(file.path(), None).unwrap();
        assert_eq!(table.columns()[0], "Unnamed: 0");
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = DataLoad::new().run("/nonexistent/train.csv", None).unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(_)));
    }

    #[test]
    fn non_numeric_cell_reports_position() {
        let file = write_csv("a,b\n1,2\n3,abc\n");
        match DataLoad::new().run(file.path(), None).unwrap_err() {
            PipelineError::Parse { row, column, value } => {
                assert_eq!(row, 2);
                assert_eq!(column, "b");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
