use thiserror::Error;

/// Non-fatal conditions raised by the loader and the view catalog.
///
/// None of these stop a session: whoever detects one turns it into an empty
/// table, a skipped view or an "N/A" cell and logs a warning.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Condition {
    #[error("source '{origin}' is unavailable: {reason}")]
    SourceUnavailable { origin: String, reason: String },

    #[error("source '{origin}' has no data rows")]
    SourceEmpty { origin: String },

    #[error("view '{view}' needs column '{column}', which this dataset does not have")]
    FeatureUnavailable { view: String, column: String },

    #[error("t-test needs at least 2 observations per sample (got {left} and {right})")]
    InsufficientSample { left: usize, right: usize },

    #[error("'{parameter}' is required for {operation}")]
    MissingParameter {
        parameter: String,
        operation: String,
    },

    #[error("column '{column}' does not exist")]
    UnknownColumn { column: String },

    #[error("column '{column}' is not numeric")]
    NotNumeric { column: String },
}

impl Condition {
    pub fn feature_unavailable(view: &str, column: &str) -> Self {
        Condition::FeatureUnavailable {
            view: view.to_string(),
            column: column.to_string(),
        }
    }
}

/// Hard failures inside the loader and the artifact writers.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("column '{column}' has {actual} rows, expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
