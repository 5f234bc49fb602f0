//! Batch job models: the persisted batch record and its aggregated results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::document::{Document, RiskLevel};
use crate::error::{ClausewiseError, Result};

/// Lifecycle of a batch: pending -> processing -> completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    Processing,
    Completed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
        }
    }
}

/// Status of one document within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchItemStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl BatchItemStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Per-document sub-status embedded in a batch record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub filename: String,
    pub status: BatchItemStatus,
    pub document_id: Option<String>,
    pub error: Option<String>,
}

/// Terminal result of processing one batch item.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    Completed { document_id: String },
    Failed { error: String },
}

/// Persisted state of a batch job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub batch_id: String,
    pub created_at: DateTime<Utc>,
    pub status: BatchStatus,
    pub total_documents: usize,
    pub completed_documents: usize,
    pub failed_documents: usize,
    pub progress_percentage: u8,
    /// One entry per submitted file, in submission order.
    pub documents: Vec<BatchItem>,
}

impl Batch {
    /// Create a pending batch with every item pending.
    pub fn new<I, S>(batch_id: String, filenames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let documents: Vec<BatchItem> = filenames
            .into_iter()
            .map(|filename| BatchItem {
                filename: filename.into(),
                status: BatchItemStatus::Pending,
                document_id: None,
                error: None,
            })
            .collect();

        Self {
            batch_id,
            created_at: Utc::now(),
            status: BatchStatus::Pending,
            total_documents: documents.len(),
            completed_documents: 0,
            failed_documents: 0,
            progress_percentage: 0,
            documents,
        }
    }

    fn item_mut(&mut self, index: usize) -> Result<&mut BatchItem> {
        let batch_id = &self.batch_id;
        let len = self.documents.len();
        self.documents.get_mut(index).ok_or_else(|| {
            ClausewiseError::Validation(format!(
                "batch {} has no document at index {} ({} documents)",
                batch_id, index, len
            ))
        })
    }

    pub fn mark_processing(&mut self, index: usize) -> Result<()> {
        let item = self.item_mut(index)?;
        if !item.status.is_terminal() {
            item.status = BatchItemStatus::Processing;
        }
        Ok(())
    }

    /// Record an item's terminal outcome, bumping counters and progress.
    ///
    /// Recording the same item twice is a no-op so counters stay consistent.
    pub fn record_outcome(&mut self, index: usize, outcome: ItemOutcome) -> Result<()> {
        let item = self.item_mut(index)?;
        if item.status.is_terminal() {
            tracing::warn!(
                "Ignoring duplicate outcome for {} in batch",
                item.filename
            );
            return Ok(());
        }

        let completed = match outcome {
            ItemOutcome::Completed { document_id } => {
                item.status = BatchItemStatus::Completed;
                item.document_id = Some(document_id);
                item.error = None;
                true
            }
            ItemOutcome::Failed { error } => {
                item.status = BatchItemStatus::Failed;
                item.document_id = None;
                item.error = Some(error);
                false
            }
        };

        if completed {
            self.completed_documents += 1;
        } else {
            self.failed_documents += 1;
        }
        self.recompute_progress();
        Ok(())
    }

    /// `floor((completed + failed) / total * 100)`.
    pub fn recompute_progress(&mut self) {
        let finished = self.completed_documents + self.failed_documents;
        self.progress_percentage = if self.total_documents == 0 {
            100
        } else {
            ((finished * 100) / self.total_documents).min(100) as u8
        };
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            batch_id: self.batch_id.clone(),
            created_at: self.created_at,
            status: self.status,
            total_documents: self.total_documents,
            progress_percentage: self.progress_percentage,
        }
    }
}

/// Row returned by batch listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub batch_id: String,
    pub created_at: DateTime<Utc>,
    pub status: BatchStatus,
    pub total_documents: usize,
    pub progress_percentage: u8,
}

/// Count of documents per overall risk level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskDistribution {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub critical: usize,
}

impl RiskDistribution {
    pub fn record(&mut self, level: RiskLevel) {
        match level {
            RiskLevel::Low => self.low += 1,
            RiskLevel::Medium => self.medium += 1,
            RiskLevel::High => self.high += 1,
            RiskLevel::Critical => self.critical += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.low + self.medium + self.high + self.critical
    }
}

/// Aggregated view of a batch, recomputed from persisted state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub batch_id: String,
    pub status: BatchStatus,
    pub created_at: DateTime<Utc>,
    pub total_documents: usize,
    pub successful: usize,
    pub failed: usize,
    pub progress_percentage: u8,
    pub risk_distribution: RiskDistribution,
    pub average_risk_score: f64,
    pub total_clauses_detected: usize,
    pub documents: Vec<BatchItem>,
    pub detailed_results: Vec<Document>,
    /// Completed documents whose stored analysis could not be loaded.
    #[serde(default)]
    pub unavailable_results: usize,
}
