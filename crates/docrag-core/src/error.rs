//! Error types for docrag

use thiserror::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the ingestion and retrieval pipeline
#[derive(Error, Debug)]
pub enum Error {
    #[error("Document text is empty")]
    EmptyText,

    #[error("Chunking produced no usable chunks for '{0}'")]
    EmptyChunkSet(String),

    #[error("Embedding count mismatch: expected {expected} vectors, got {actual}")]
    CardinalityMismatch { expected: usize, actual: usize },

    #[error("All embedding inputs were blank")]
    EmptyInput,

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Vector store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Embedding provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("LLM provider error: {0}")]
    LlmProvider(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl Error {
    /// Whether this error means the referenced document does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}
