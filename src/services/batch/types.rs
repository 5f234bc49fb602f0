//! Batch service inputs and events.

use std::path::{Path, PathBuf};

use crate::models::RiskLevel;

/// Where a submitted document's bytes come from.
#[derive(Debug, Clone)]
pub enum FileSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

/// One document submitted to a batch.
#[derive(Debug, Clone)]
pub struct BatchFile {
    pub filename: String,
    pub source: FileSource,
}

impl BatchFile {
    /// Use the path's final component as the filename.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            filename,
            source: FileSource::Path(path.to_path_buf()),
        }
    }

    pub fn from_bytes(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            source: FileSource::Bytes(content.into()),
        }
    }
}

/// Events emitted while a batch is processed.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    /// Batch moved to processing
    Started { batch_id: String, total: usize },
    /// A worker picked up a document
    DocumentStarted { index: usize, filename: String },
    /// Document analyzed and stored
    DocumentCompleted {
        index: usize,
        filename: String,
        document_id: String,
        risk_level: Option<RiskLevel>,
    },
    /// Document failed; the batch continues
    DocumentFailed {
        index: usize,
        filename: String,
        error: String,
    },
    /// Every document reached a terminal state
    Finished {
        batch_id: String,
        completed: usize,
        failed: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path_uses_file_name() {
        let file = BatchFile::from_path("/tmp/contracts/lease.txt");
        assert_eq!(file.filename, "lease.txt");
        assert!(matches!(file.source, FileSource::Path(_)));
    }
}
