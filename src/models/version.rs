//! Version lineage models and comparison results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::document::{Clause, RiskLevel};

/// Storage key for a version record: `{document_id}_v{version_number}`.
pub fn version_key(document_id: &str, version_number: u32) -> String {
    format!("{}_v{}", document_id, version_number)
}

/// One revision within a lineage.
///
/// `version_id` is the document id of this revision; `document_id` is the
/// id of the lineage root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub version_id: String,
    pub document_id: String,
    pub version_number: u32,
    pub is_current: bool,
    pub upload_date: DateTime<Utc>,
    pub filename: String,
    pub file_size: u64,
    pub word_count: usize,
    pub page_count: u32,
    #[serde(default)]
    pub content_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes_summary: Option<ChangeDelta>,
}

impl VersionRecord {
    pub fn key(&self) -> String {
        version_key(&self.document_id, self.version_number)
    }
}

/// Differences between two consecutive versions of a lineage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeDelta {
    pub clauses_added: usize,
    pub clauses_removed: usize,
    pub clauses_modified: usize,
    #[serde(default)]
    pub categories_added: Vec<String>,
    #[serde(default)]
    pub categories_removed: Vec<String>,
    pub risk_delta: f64,
    #[serde(default)]
    pub major_changes: Vec<String>,
}

impl ChangeDelta {
    pub fn has_major_changes(&self) -> bool {
        !self.major_changes.is_empty()
    }
}

/// Identity of one side of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRef {
    pub id: String,
    pub filename: String,
    pub upload_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Removed,
}

/// A single changed line in a text diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChange {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub text: String,
}

/// How much the text moved between two versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeMagnitude {
    Minor,
    Moderate,
    Major,
    Substantial,
}

impl ChangeMagnitude {
    /// minor >= 95% similar, moderate >= 80%, major >= 50%, else substantial.
    pub fn from_similarity(percentage: f64) -> Self {
        if percentage >= 95.0 {
            Self::Minor
        } else if percentage >= 80.0 {
            Self::Moderate
        } else if percentage >= 50.0 {
            Self::Major
        } else {
            Self::Substantial
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minor => "minor",
            Self::Moderate => "moderate",
            Self::Major => "major",
            Self::Substantial => "substantial",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStats {
    pub similarity_percentage: f64,
    pub lines_added: usize,
    pub lines_deleted: usize,
    pub total_changes: usize,
    pub change_type: ChangeMagnitude,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifiedClause {
    pub category: String,
    pub old: Clause,
    pub new: Clause,
}

/// Category-keyed clause differences between two documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClauseChanges {
    pub added: Vec<Clause>,
    pub removed: Vec<Clause>,
    pub modified: Vec<ModifiedClause>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskComparison {
    pub old_score: f64,
    pub new_score: f64,
    /// `new_score - old_score`, sign preserved.
    pub delta: f64,
    /// `None` when that side has no risk assessment.
    pub old_level: Option<RiskLevel>,
    pub new_level: Option<RiskLevel>,
    /// Whether `|delta|` exceeds the major-change threshold.
    #[serde(default)]
    pub significant: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryChanges {
    pub parties_changed: bool,
    pub purpose_changed: bool,
    pub type_changed: bool,
}

/// Full comparison of two stored documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub version1: VersionRef,
    pub version2: VersionRef,
    pub text_diff: Vec<TextChange>,
    pub text_stats: TextStats,
    pub clause_changes: ClauseChanges,
    pub risk_comparison: RiskComparison,
    pub summary_changes: SummaryChanges,
}
