//! Version lineages: numbering, current-version tracking, and comparison.
//!
//! A lineage is identified by the id of its first document. Each revision
//! is stored as `{lineage_id}_v{n}`, numbered contiguously from 1, and
//! exactly one revision per lineage is current. Creating or restoring a
//! version rewrites every affected record in a single store transaction.

mod compare;
mod diff;

pub use compare::{CategoryComparison, ClauseComparison, ClauseDelta};
pub use diff::{diff_lines, LineDiff};

use std::sync::Arc;

use tokio::sync::Mutex;

use super::documents::DocumentProcessor;
use crate::error::{ClausewiseError, Result};
use crate::models::{
    ChangeDelta, Comparison, Document, DocumentSummary, RiskComparison, SummaryChanges,
    VersionRecord, VersionRef,
};
use crate::storage::{Collection, Loaded, RecordStore};

pub const DEFAULT_DIFF_LINE_LIMIT: usize = 100;
pub const DEFAULT_DIFF_CHANGE_LIMIT: usize = 50;
pub const DEFAULT_MAJOR_RISK_THRESHOLD: f64 = 10.0;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn version_ref(document: &Document) -> VersionRef {
    VersionRef {
        id: document.id.clone(),
        filename: document.filename.clone(),
        upload_date: document.upload_date,
    }
}

fn parties(summary: Option<&DocumentSummary>) -> &[String] {
    summary.map(|s| s.parties.as_slice()).unwrap_or_default()
}

fn purpose(summary: Option<&DocumentSummary>) -> &str {
    summary.map_or("", |s| s.purpose.as_str())
}

fn document_type(summary: Option<&DocumentSummary>) -> &str {
    summary.map_or("", |s| s.document_type.as_str())
}

/// A side without a summary compares as empty fields.
fn summary_changes(
    old: Option<&DocumentSummary>,
    new: Option<&DocumentSummary>,
) -> SummaryChanges {
    SummaryChanges {
        parties_changed: parties(old) != parties(new),
        purpose_changed: purpose(old) != purpose(new),
        type_changed: document_type(old) != document_type(new),
    }
}

pub struct VersionManager {
    versions: Collection<VersionRecord>,
    processor: DocumentProcessor,
    comparison: Arc<dyn ClauseComparison>,
    diff_line_limit: usize,
    diff_change_limit: usize,
    major_risk_threshold: f64,
    write_lock: Mutex<()>,
}

impl VersionManager {
    pub fn new(store: Arc<dyn RecordStore>, processor: DocumentProcessor) -> Self {
        Self {
            versions: Collection::new("version", store),
            processor,
            comparison: Arc::new(CategoryComparison),
            diff_line_limit: DEFAULT_DIFF_LINE_LIMIT,
            diff_change_limit: DEFAULT_DIFF_CHANGE_LIMIT,
            major_risk_threshold: DEFAULT_MAJOR_RISK_THRESHOLD,
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_comparison(mut self, comparison: Arc<dyn ClauseComparison>) -> Self {
        self.comparison = comparison;
        self
    }

    /// Limits for text diffs: lines read from each side, changes returned.
    pub fn with_diff_limits(mut self, line_limit: usize, change_limit: usize) -> Self {
        self.diff_line_limit = line_limit;
        self.diff_change_limit = change_limit;
        self
    }

    /// Risk swing, in points, above which a change is called out as major.
    pub fn with_major_risk_threshold(mut self, threshold: f64) -> Self {
        self.major_risk_threshold = threshold;
        self
    }

    /// Record `document` as a new version.
    ///
    /// Without `parent_id` this starts a lineage rooted at the document. With
    /// one, the document becomes the next version of that lineage, a change
    /// summary is computed against the current version, and the current flag
    /// moves to the new record.
    pub async fn create_version(
        &self,
        document: &Document,
        parent_id: Option<&str>,
    ) -> Result<VersionRecord> {
        let _guard = self.write_lock.lock().await;

        let lineage_id = parent_id.unwrap_or(&document.id);
        let existing = match parent_id {
            Some(parent) => self.get_versions(parent).await?,
            None => Vec::new(),
        };

        let version_number = existing
            .iter()
            .map(|v| v.version_number)
            .max()
            .map_or(1, |n| n + 1);
        if let (Some(parent), true) = (parent_id, existing.is_empty()) {
            tracing::warn!(
                "No versions exist for {}; starting its lineage at version 1",
                parent
            );
        }

        let mut record = VersionRecord {
            version_id: document.id.clone(),
            document_id: lineage_id.to_string(),
            version_number,
            is_current: true,
            upload_date: document.upload_date,
            filename: document.filename.clone(),
            file_size: document.file_size,
            word_count: document.word_count,
            page_count: document.page_count,
            content_hash: document.content_hash.clone(),
            changes_summary: None,
        };

        if version_number > 1 {
            let previous = existing
                .iter()
                .rev()
                .find(|v| v.is_current)
                .or_else(|| existing.last());
            if let Some(previous) = previous {
                record.changes_summary = self.change_summary(previous, document).await?;
            }
        }

        // Every other version of the lineage loses the current flag in the
        // same write that adds the new one.
        let superseded: Vec<VersionRecord> = existing
            .into_iter()
            .filter(|v| v.is_current)
            .map(|mut v| {
                v.is_current = false;
                v
            })
            .collect();

        {
            let mut writes = vec![(record.key(), &record)];
            writes.extend(superseded.iter().map(|v| (v.key(), v)));
            self.versions.save_all(&writes).await?;
        }

        tracing::info!(
            "Created version {} of {} ({})",
            record.version_number,
            record.document_id,
            record.version_id
        );
        Ok(record)
    }

    async fn change_summary(
        &self,
        previous: &VersionRecord,
        current: &Document,
    ) -> Result<Option<ChangeDelta>> {
        match self.processor.try_load(&previous.version_id).await? {
            Loaded::Found(previous_doc) => Ok(Some(self.delta(&previous_doc, current))),
            Loaded::Missing => {
                tracing::warn!(
                    "Previous version {} has no stored analysis; skipping change summary",
                    previous.version_id
                );
                Ok(None)
            }
            Loaded::Corrupt(reason) => {
                tracing::warn!(
                    "Previous version {} is unreadable ({}); skipping change summary",
                    previous.version_id,
                    reason
                );
                Ok(None)
            }
        }
    }

    /// Differences from `previous` to `current`.
    pub fn delta(&self, previous: &Document, current: &Document) -> ChangeDelta {
        let clauses = self.comparison.delta(previous.clauses(), current.clauses());
        let risk_delta = round2(current.risk_score() - previous.risk_score());

        let mut major_changes: Vec<String> = clauses
            .added
            .iter()
            .map(|c| format!("Added new {} clause", c.replace('_', " ")))
            .collect();
        major_changes.extend(
            clauses
                .removed
                .iter()
                .map(|c| format!("Removed {} clause", c.replace('_', " "))),
        );
        if risk_delta.abs() > self.major_risk_threshold {
            let direction = if risk_delta > 0.0 {
                "increased"
            } else {
                "decreased"
            };
            major_changes.push(format!(
                "Overall risk {} by {:.1} points",
                direction,
                risk_delta.abs()
            ));
        }

        ChangeDelta {
            clauses_added: clauses.added.len(),
            clauses_removed: clauses.removed.len(),
            clauses_modified: clauses.modified,
            categories_added: clauses.added,
            categories_removed: clauses.removed,
            risk_delta,
            major_changes,
        }
    }

    /// Versions of a lineage, ascending by number. Unreadable records are
    /// skipped.
    pub async fn get_versions(&self, document_id: &str) -> Result<Vec<VersionRecord>> {
        let prefix = format!("{}_v", document_id);
        let mut versions: Vec<VersionRecord> = self
            .versions
            .list(&prefix)
            .await?
            .into_values()
            .into_iter()
            .filter(|v| v.document_id == document_id)
            .collect();
        versions.sort_by_key(|v| v.version_number);
        Ok(versions)
    }

    /// Highest-numbered version of a lineage.
    pub async fn get_latest_version(&self, document_id: &str) -> Result<Option<VersionRecord>> {
        Ok(self.get_versions(document_id).await?.pop())
    }

    pub async fn get_current_version(&self, document_id: &str) -> Result<Option<VersionRecord>> {
        Ok(self
            .get_versions(document_id)
            .await?
            .into_iter()
            .find(|v| v.is_current))
    }

    /// Find a version by its own document id. Scans every lineage.
    pub async fn get_version_by_id(&self, version_id: &str) -> Result<VersionRecord> {
        self.versions
            .list("")
            .await?
            .into_values()
            .into_iter()
            .find(|v| v.version_id == version_id)
            .ok_or_else(|| ClausewiseError::not_found("version", version_id))
    }

    /// Make an existing version current again. Version numbers are unchanged.
    pub async fn restore_version(&self, version_id: &str) -> Result<VersionRecord> {
        let _guard = self.write_lock.lock().await;

        let target = self.get_version_by_id(version_id).await?;
        let mut restored = None;
        let mut changed = Vec::new();

        for mut version in self.get_versions(&target.document_id).await? {
            let should_be_current = version.version_id == version_id;
            if should_be_current {
                restored = Some(version.clone());
            }
            if version.is_current != should_be_current {
                version.is_current = should_be_current;
                changed.push(version);
            }
        }

        let mut restored = restored.unwrap_or(target);
        restored.is_current = true;

        let writes: Vec<(String, &VersionRecord)> =
            changed.iter().map(|v| (v.key(), v)).collect();
        self.versions.save_all(&writes).await?;

        tracing::info!(
            "Restored version {} of {} as current",
            restored.version_number,
            restored.document_id
        );
        Ok(restored)
    }

    /// Compare any two stored documents.
    pub async fn compare_versions(&self, id1: &str, id2: &str) -> Result<Comparison> {
        let old = self.processor.load_document(id1).await?;
        let new = self.processor.load_document(id2).await?;

        let diff = diff_lines(
            &old.raw_text,
            &new.raw_text,
            self.diff_line_limit,
            self.diff_change_limit,
        );

        let delta = round2(new.risk_score() - old.risk_score());
        let risk_comparison = RiskComparison {
            old_score: old.risk_score(),
            new_score: new.risk_score(),
            delta,
            old_level: old.risk_level(),
            new_level: new.risk_level(),
            significant: delta.abs() > self.major_risk_threshold,
        };

        let summary_changes = summary_changes(
            old.analysis.summary.as_ref(),
            new.analysis.summary.as_ref(),
        );

        Ok(Comparison {
            version1: version_ref(&old),
            version2: version_ref(&new),
            text_diff: diff.changes,
            text_stats: diff.stats,
            clause_changes: self.comparison.compare(old.clauses(), new.clauses()),
            risk_comparison,
            summary_changes,
        })
    }
}
