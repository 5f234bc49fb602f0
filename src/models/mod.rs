//! Data models for clausewise.

mod batch;
mod document;
mod version;

pub use batch::{
    Batch, BatchItem, BatchItemStatus, BatchResult, BatchStatus, BatchSummary, ItemOutcome,
    RiskDistribution,
};
pub use document::{
    Analysis, Clause, Document, DocumentListing, DocumentSummary, KeyTerm, RiskAssessment,
    RiskFactor, RiskLevel, TermCategory, TermMention, UnfavorableTerm,
};
pub use version::{
    version_key, ChangeDelta, ChangeKind, ChangeMagnitude, ClauseChanges, Comparison,
    ModifiedClause, RiskComparison, SummaryChanges, TextChange, TextStats, VersionRecord,
    VersionRef,
};
