use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use credit_classifiers::config::{load_config, PipelineConfig};
use credit_classifiers::data::{DataLoad, Table};

/// Load the pipeline config, or fall back to defaults when no path is given.
pub fn load_pipeline_config(path: Option<&PathBuf>) -> Result<PipelineConfig> {
    match path {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config file: {:?}", path)),
        None => {
            log::warn!("No config file provided; using defaults.");
            Ok(PipelineConfig::default())
        }
    }
}

/// Check that `path` exists and looks like a delimited text file.
pub fn validate_tsv_or_csv_file(path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase());
    match ext.as_deref() {
        Some("tsv") | Some("csv") => {}
        _ => anyhow::bail!("File must have a .tsv or .csv extension: {}", path.display()),
    }
    if !path.exists() {
        anyhow::bail!("File does not exist: {}", path.display());
    }
    Ok(())
}

/// The CLI argument when given, otherwise the configured path.
pub fn resolve_data_path(
    cli: Option<&PathBuf>,
    configured: Option<&PathBuf>,
    what: &str,
) -> Result<PathBuf> {
    let path = cli
        .or(configured)
        .cloned()
        .with_context(|| format!("No {} given on the command line or in the config", what))?;
    validate_tsv_or_csv_file(&path)?;
    Ok(path)
}

/// Read a data file; tab-separated when the extension is `.tsv`.
pub fn load_table(path: &Path, index_col: Option<usize>) -> Result<Table> {
    let is_tsv = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.eq_ignore_ascii_case("tsv"))
        .unwrap_or(false);
    let loader = if is_tsv {
        DataLoad::with_delimiter(b'\t')
    } else {
        DataLoad::new()
    };
    loader
        .run(path, index_col)
        .with_context(|| format!("Failed to read data file: {}", path.display()))
}
