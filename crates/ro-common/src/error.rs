//! Error types for the Resource Orchestrator.

use thiserror::Error;

/// Result type alias for Resource Orchestrator operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the Resource Orchestrator.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid resource limit: {0}")]
    InvalidLimit(String),

    #[error("invalid objective weights: {0}")]
    InvalidWeights(String),

    // Cluster errors (20-29)
    #[error("cluster operation failed: {0}")]
    Cluster(String),

    #[error("workload {name} not found")]
    WorkloadNotFound { name: String },

    // Monitoring errors (30-39)
    #[error("monitoring query failed: {0}")]
    Monitoring(String),

    // Decision errors (40-49)
    #[error("decision failed: {0}")]
    Decision(String),

    #[error("numerical instability detected: {0}")]
    NumericalInstability(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    /// Used for detailed error reporting in structured output.
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidLimit(_) => 11,
            Error::InvalidWeights(_) => 12,
            Error::Cluster(_) => 20,
            Error::WorkloadNotFound { .. } => 21,
            Error::Monitoring(_) => 30,
            Error::Decision(_) => 40,
            Error::NumericalInstability(_) => 41,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }
}
