//! Error types shared by the document, batch, and version services.

use thiserror::Error;

use crate::extract::ExtractionError;
use crate::storage::StoreError;

/// Result alias for library operations.
pub type Result<T> = std::result::Result<T, ClausewiseError>;

#[derive(Debug, Error)]
pub enum ClausewiseError {
    /// No persisted record exists for the requested identifier.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    /// Caller supplied malformed or missing input.
    #[error("Invalid input: {0}")]
    Validation(String),
    /// A persisted record exists but could not be parsed.
    #[error("Corrupt record {key}: {reason}")]
    CorruptRecord { key: String, reason: String },
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
    #[error("Text extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("Analysis failed: {0}")]
    Analysis(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClausewiseError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
