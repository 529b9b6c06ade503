use std::io;

/// Errors raised anywhere in the scoring pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A file, table, experiment or run that was asked for does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A cell that could not be read as a number.
    #[error("invalid value {value:?} in column '{column}' at row {row}")]
    Parse {
        row: usize,
        column: String,
        value: String,
    },

    #[error("shape mismatch: {0}")]
    Shape(String),

    /// Schema or label checks failed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// `transform` or `predict` was called before `train`/`fit`.
    #[error("pipeline is not trained")]
    NotTrained,

    /// The scoring endpoint or tracking server answered with a non-success status
    /// or a body that could not be used.
    #[error("upstream service returned status {status}: {body}")]
    UpstreamService { status: u16, body: String },

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("tracking error: {0}")]
    Tracking(String),

    /// A registry lookup received a tag with no registered constructor.
    #[error("unknown {kind} tag '{tag}'")]
    UnknownTag { kind: &'static str, tag: String },

    #[error("evaluation error: {0}")]
    Evaluation(String),

    #[error("model error: {0}")]
    Model(String),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_error_carries_status_and_body() {
        let err = PipelineError::UpstreamService {
            status: 503,
            body: "model not loaded".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("503"));
        assert!(msg.contains("model not loaded"));
    }

    #[test]
    fn unknown_tag_names_the_registry() {
        let err = PipelineError::UnknownTag {
            kind: "scaler",
            tag: "robust".to_string(),
        };
        assert_eq!(err.to_string(), "unknown scaler tag 'robust'");
    }
}
