use thiserror::Error;

// ---------------------------------------------------------------------------
// Pipeline error taxonomy
// ---------------------------------------------------------------------------

/// Errors surfaced by the load → filter → train → explain pipeline.
///
/// Every variant is terminal for the current run and carries a message fit
/// for the status line, not a stack trace. Empty filter results and empty
/// attribution sets are ordinary values, never errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The source file is missing required columns or has unparsable cells.
    #[error("dataset format error: {0}")]
    DataFormat(String),

    /// The filter criteria are malformed (e.g. an inverted range).
    #[error("invalid filter: {0}")]
    Validation(String),

    /// Too few usable rows to fit and evaluate a model.
    #[error("not enough data: {0}")]
    InsufficientData(String),
}

impl PipelineError {
    pub fn data_format(msg: impl Into<String>) -> Self {
        PipelineError::DataFormat(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        PipelineError::Validation(msg.into())
    }

    pub fn insufficient_data(msg: impl Into<String>) -> Self {
        PipelineError::InsufficientData(msg.into())
    }
}
