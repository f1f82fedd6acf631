use thiserror::Error;

/// Malformed input handed to `ingest`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestionError {
    #[error("chunk id must not be empty")]
    EmptyChunkId,

    #[error("invalid metadata for chunk '{chunk_id}': {reason}")]
    InvalidMetadata { chunk_id: String, reason: String },
}

/// Malformed input handed to `search`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidQueryError {
    #[error("query '{0}' contains no searchable terms")]
    NoTerms(String),

    #[error("top_k must be a positive integer")]
    ZeroTopK,
}

/// The accelerated exact index could not be brought up. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("exact index unavailable: {reason}")]
pub struct IndexUnavailableError {
    pub reason: String,
}

impl IndexUnavailableError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation failed: {0}")]
    Operation(String),

    #[error(transparent)]
    Ingestion(#[from] IngestionError),

    #[error(transparent)]
    InvalidQuery(#[from] InvalidQueryError),

    #[error(transparent)]
    IndexUnavailable(#[from] IndexUnavailableError),
}

pub type Result<T> = std::result::Result<T, Error>;
