//! Local run store backed by SQLite.
use std::collections::BTreeMap;
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{PipelineError, Result};
use crate::tracking::{new_run_id, now_millis, ModelVersion, RunRecord, RunStatus, TrackingStore};

/// Initializes the tracking schema.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS experiments (
            experiment_id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        );
        CREATE TABLE IF NOT EXISTS runs (
            run_id TEXT PRIMARY KEY,
            experiment_id INTEGER NOT NULL,
            status TEXT NOT NULL,
            start_time INTEGER NOT NULL,
            end_time INTEGER,
            FOREIGN KEY (experiment_id) REFERENCES experiments(experiment_id)
        );
        CREATE TABLE IF NOT EXISTS params (
            run_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            PRIMARY KEY (run_id, key)
        );
        CREATE TABLE IF NOT EXISTS metrics (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            run_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value REAL NOT NULL,
            timestamp INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS tags (
            run_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            PRIMARY KEY (run_id, key)
        );
        CREATE TABLE IF NOT EXISTS model_versions (
            name TEXT NOT NULL,
            version INTEGER NOT NULL,
            run_id TEXT NOT NULL,
            source TEXT NOT NULL,
            created INTEGER NOT NULL,
            PRIMARY KEY (name, version)
        );
        CREATE INDEX IF NOT EXISTS idx_runs_experiment ON runs(experiment_id);
        CREATE INDEX IF NOT EXISTS idx_metrics_run ON metrics(run_id);",
    )?;
    Ok(())
}

/// Tracking store kept in a single SQLite database.
pub struct SqliteTrackingStore {
    conn: Connection,
}

impl SqliteTrackingStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn experiment_id(&self, name: &str) -> Result<Option<i64>> {
        Ok(self
            .conn
            .query_row(
                "SELECT experiment_id FROM experiments WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn ensure_run(&self, run_id: &str) -> Result<()> {
        let exists: Option<String> = self
            .conn
            .query_row(
                "SELECT run_id FROM runs WHERE run_id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?;
        match exists {
            Some(_) => Ok(()),
            None => Err(PipelineError::NotFound(format!("run '{}'", run_id))),
        }
    }

    /// Status string of a run, e.g. `FINISHED`.
    pub fn run_status(&self, run_id: &str) -> Result<String> {
        self.conn
            .query_row(
                "SELECT status FROM runs WHERE run_id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| PipelineError::NotFound(format!("run '{}'", run_id)))
    }

    pub fn tag(&self, run_id: &str, key: &str) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT value FROM tags WHERE run_id = ?1 AND key = ?2",
                params![run_id, key],
                |row| row.get(0),
            )
            .optional()?)
    }
}

impl TrackingStore for SqliteTrackingStore {
    fn search_runs(&self, experiment: &str) -> Result<Vec<RunRecord>> {
        let experiment_id = self
            .experiment_id(experiment)?
            .ok_or_else(|| PipelineError::NotFound(format!("experiment '{}'", experiment)))?;

        let mut stmt = self.conn.prepare(
            "SELECT run_id FROM runs WHERE experiment_id = ?1 ORDER BY start_time, run_id",
        )?;
        let run_ids = stmt
            .query_map(params![experiment_id], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut param_stmt = self
            .conn
            .prepare("SELECT key, value FROM params WHERE run_id = ?1")?;
        // Later rows overwrite earlier ones, leaving the latest value per key.
        let mut metric_stmt = self
            .conn
            .prepare("SELECT key, value FROM metrics WHERE run_id = ?1 ORDER BY timestamp, id")?;

        let mut runs = Vec::with_capacity(run_ids.len());
        for run_id in run_ids {
            let params: BTreeMap<String, String> = param_stmt
                .query_map(params![run_id], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<_, _>>()?;
            let metrics: BTreeMap<String, f64> = metric_stmt
                .query_map(params![run_id], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<_, _>>()?;
            runs.push(RunRecord {
                run_id,
                params,
                metrics,
            });
        }
        Ok(runs)
    }

    fn start_run(&self, experiment: &str) -> Result<String> {
        let experiment_id = match self.experiment_id(experiment)? {
            Some(id) => id,
            None => {
                self.conn.execute(
                    "INSERT INTO experiments (name) VALUES (?1)",
                    params![experiment],
                )?;
                self.conn.last_insert_rowid()
            }
        };
        let run_id = new_run_id();
        self.conn.execute(
            "INSERT INTO runs (run_id, experiment_id, status, start_time) VALUES (?1, ?2, ?3, ?4)",
            params![run_id, experiment_id, RunStatus::Running.as_str(), now_millis()],
        )?;
        Ok(run_id)
    }

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.ensure_run(run_id)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO params (run_id, key, value) VALUES (?1, ?2, ?3)",
            params![run_id, key, value],
        )?;
        Ok(())
    }

    fn log_metric(&self, run_id: &str, key: &str, value: f64) -> Result<()> {
        self.ensure_run(run_id)?;
        self.conn.execute(
            "INSERT INTO metrics (run_id, key, value, timestamp) VALUES (?1, ?2, ?3, ?4)",
            params![run_id, key, value, now_millis()],
        )?;
        Ok(())
    }

    fn set_tag(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.ensure_run(run_id)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO tags (run_id, key, value) VALUES (?1, ?2, ?3)",
            params![run_id, key, value],
        )?;
        Ok(())
    }

    fn end_run(&self, run_id: &str, status: RunStatus) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE runs SET status = ?1, end_time = ?2 WHERE run_id = ?3",
            params![status.as_str(), now_millis(), run_id],
        )?;
        if rows == 0 {
            return Err(PipelineError::NotFound(format!("run '{}'", run_id)));
        }
        Ok(())
    }

    fn register_model(&self, name: &str, run_id: &str, source: &str) -> Result<ModelVersion> {
        self.ensure_run(run_id)?;
        let version: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(version), 0) + 1 FROM model_versions WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        self.conn.execute(
            "INSERT INTO model_versions (name, version, run_id, source, created)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![name, version, run_id, source, now_millis()],
        )?;
        Ok(ModelVersion {
            name: name.to_string(),
            version: version.to_string(),
        })
    }
}
