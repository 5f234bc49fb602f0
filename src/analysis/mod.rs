//! Analysis pipeline: clauses, key terms, risk, and summary from raw text.
//!
//! The pipeline is a synchronous, potentially slow function of the text.
//! Callers on the async runtime run it under `spawn_blocking`.

pub mod clauses;
pub mod key_terms;
pub mod risk;
pub mod summary;

use crate::models::Analysis;

/// Produces structured findings from a document's raw text.
///
/// Any error is treated by callers as a permanent failure for that
/// document; implementations should not expect retries.
pub trait Analyzer: Send + Sync {
    fn analyze(&self, text: &str) -> anyhow::Result<Analysis>;

    /// Name used in log messages.
    fn name(&self) -> &str {
        "analyzer"
    }
}

/// Keyword-heuristic analyzer.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordAnalyzer;

impl KeywordAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Analyzer for KeywordAnalyzer {
    fn analyze(&self, text: &str) -> anyhow::Result<Analysis> {
        let clauses = clauses::detect_clauses(text);
        tracing::debug!("Detected {} clauses", clauses.len());

        let key_terms = key_terms::extract(text);
        tracing::debug!("Extracted {} key terms", key_terms.len());

        let assessment = risk::assess(&clauses);
        tracing::debug!(
            "Assessed risk: {} ({:.2})",
            assessment.overall_risk_level.as_str(),
            assessment.overall_risk_score
        );

        let summary = summary::summarize(text, &clauses, &key_terms);
        tracing::debug!("Summarized as {}", summary.document_type);

        Ok(Analysis {
            clauses,
            key_terms,
            risk_assessment: Some(assessment),
            summary: Some(summary),
        })
    }

    fn name(&self) -> &str {
        "keyword"
    }
}
