//! Append-only SQLite store of scored inputs.
use std::path::{Path, PathBuf};

use rusqlite::{params_from_iter, Connection};

use crate::data::Table;
use crate::error::{PipelineError, Result};

pub const PREDICTIONS_TABLE: &str = "predictions";

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// The `predictions` table in one database file.
///
/// Every call opens its own connection and drops it before returning.
#[derive(Debug, Clone)]
pub struct PredictionStore {
    path: PathBuf,
}

impl PredictionStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Connection::open(&self.path)?)
    }

    fn table_exists(conn: &Connection) -> Result<bool> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [PREDICTIONS_TABLE],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Append every row of `table`, creating the table on first use. Missing
    /// values are stored as NULL. Returns the number of rows written.
    pub fn append(&self, table: &Table) -> Result<usize> {
        let mut conn = self.connect()?;
        let columns: Vec<String> = table.columns().iter().map(|c| quote_ident(c)).collect();

        let tx = conn.transaction()?;
        tx.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} ({})",
                PREDICTIONS_TABLE,
                columns
                    .iter()
                    .map(|c| format!("{} REAL", c))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            [],
        )?;
        {
            let placeholders = (1..=columns.len())
                .map(|i| format!("?{}", i))
                .collect::<Vec<_>>()
                .join(", ");
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} ({}) VALUES ({})",
                PREDICTIONS_TABLE,
                columns.join(", "),
                placeholders
            ))?;
            for row in table.rows() {
                stmt.execute(params_from_iter(
                    row.iter().map(|&v| if v.is_nan() { None } else { Some(v) }),
                ))?;
            }
        }
        tx.commit()?;

        log::debug!(
            "Appended {} rows to {} in {}",
            table.nrows(),
            PREDICTIONS_TABLE,
            self.path.display()
        );
        Ok(table.nrows())
    }

    /// Every stored row, in insertion order. NULL reads back as `NaN`.
    pub fn load_all(&self) -> Result<Table> {
        if !self.path.exists() {
            return Err(PipelineError::NotFound(format!(
                "prediction store {}",
                self.path.display()
            )));
        }
        let conn = self.connect()?;
        if !Self::table_exists(&conn)? {
            return Err(PipelineError::NotFound(format!(
                "table '{}' in {}",
                PREDICTIONS_TABLE,
                self.path.display()
            )));
        }

        let mut stmt = conn.prepare(&format!("SELECT * FROM {} ORDER BY rowid", PREDICTIONS_TABLE))?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let n_cols = columns.len();
        let rows = stmt
            .query_map([], |row| {
                (0..n_cols)
                    .map(|i| -> rusqlite::Result<f64> {
                        Ok(row.get::<_, Option<f64>>(i)?.unwrap_or(f64::NAN))
                    })
                    .collect::<rusqlite::Result<Vec<f64>>>()
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Table::from_rows(columns, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored() -> Table {
        Table::from_rows(
            vec!["Idade".into(), "NumeroDeVezes30-59DiasAtrasoNaoPior".into(), "Preds_Prob".into()],
            vec![vec![43.0, f64::NAN, 0.1], vec![57.0, 1.0, 0.8]],
        )
        .unwrap()
    }

    #[test]
    fn appends_accumulate_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = PredictionStore::new(dir.path().join("preds.db"));

        assert_eq!(store.append(&scored()).unwrap(), 2);
        assert_eq!(store.append(&scored()).unwrap(), 2);

        let all = store.load_all().unwrap();
        assert_eq!(all.shape(), (4, 3));
        assert_eq!(all.columns()[1], "NumeroDeVezes30-59DiasAtrasoNaoPior");
        assert!(all[(0, 1)].is_nan());
        assert_eq!(all[(3, 2)], 0.8);
    }

    #[test]
    fn missing_store_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = PredictionStore::new(dir.path().join("absent.db"));
        assert!(matches!(store.load_all(), Err(PipelineError::NotFound(_))));
    }
}
