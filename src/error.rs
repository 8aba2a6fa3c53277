//! Error handling for the RAG engine

use thiserror::Error;

/// Result type alias for the RAG engine
pub type Result<T> = std::result::Result<T, EngineError>;

/// Top-level error taxonomy for the ingestion and retrieval pipeline
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("corrupt document at {path}: {cause}")]
    CorruptDocument { path: String, cause: String },

    #[error("embedding failed: {0}")]
    EmbeddingFailure(String),

    #[error("storage failure: {0}")]
    StorageFailure(String),

    #[error("document processing error: {0}")]
    DocumentProcessingError(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl EngineError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn corrupt(path: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        EngineError::CorruptDocument {
            path: path.into(),
            cause: cause.to_string(),
        }
    }

    /// Whether retrying the operation that produced this error might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::EmbeddingFailure(_) | EngineError::Http(_)
        )
    }

    /// Error category for logging/metrics.
    pub fn category(&self) -> &'static str {
        match self {
            EngineError::NotFound { .. } => "not_found",
            EngineError::InvalidArgument(_) => "invalid_argument",
            EngineError::UnsupportedFormat(_) => "unsupported_format",
            EngineError::CorruptDocument { .. } => "corrupt_document",
            EngineError::EmbeddingFailure(_) => "embedding",
            EngineError::StorageFailure(_) => "storage",
            EngineError::DocumentProcessingError(_) => "processing",
            EngineError::Serialization(_) => "serialization",
            EngineError::Http(_) => "http",
            EngineError::Generic(_) => "generic",
        }
    }
}
