//! Document models: the uploaded file, its extracted text, and its analysis.
//!
//! A document is created on upload, populated once by the analysis
//! pipeline, and treated as immutable afterwards.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Risk bucket for a clause or a whole document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Bucket a 0-100 score: low < 30 <= medium < 60 <= high < 85 <= critical.
    pub fn from_score(score: f64) -> Self {
        if score < 30.0 {
            Self::Low
        } else if score < 60.0 {
            Self::Medium
        } else if score < 85.0 {
            Self::High
        } else {
            Self::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// High and critical clauses count as unfavorable.
    pub fn is_elevated(&self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }
}

/// A detected contractual clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    pub id: String,
    pub text: String,
    /// Category name, e.g. "payment" or "governing_law".
    pub category: String,
    /// Byte offset of the clause in the raw text.
    pub start_position: usize,
    pub end_position: usize,
    pub risk_level: RiskLevel,
    pub risk_score: f64,
    pub confidence: f64,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl Clause {
    pub fn new(text: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            category: category.into(),
            start_position: 0,
            end_position: 0,
            risk_level: RiskLevel::Low,
            risk_score: 0.0,
            confidence: 0.0,
            issues: Vec::new(),
            recommendations: Vec::new(),
        }
    }
}

/// Kind of key term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TermCategory {
    Party,
    Date,
    Money,
    Phrase,
}

/// An important term or entity found in the text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyTerm {
    pub text: String,
    pub category: TermCategory,
    pub frequency: usize,
    pub importance_score: f64,
    #[serde(default)]
    pub context: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub factor: String,
    pub score: f64,
    pub severity: RiskLevel,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnfavorableTerm {
    pub clause_id: String,
    pub category: String,
    pub text: String,
    pub risk_level: RiskLevel,
    pub issues: Vec<String>,
}

/// Document-level risk assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub overall_risk_level: RiskLevel,
    pub overall_risk_score: f64,
    #[serde(default)]
    pub risk_factors: Vec<RiskFactor>,
    #[serde(default)]
    pub missing_clauses: Vec<String>,
    #[serde(default)]
    pub unfavorable_terms: Vec<UnfavorableTerm>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl Default for RiskAssessment {
    fn default() -> Self {
        Self {
            overall_risk_level: RiskLevel::Low,
            overall_risk_score: 0.0,
            risk_factors: Vec::new(),
            missing_clauses: Vec::new(),
            unfavorable_terms: Vec::new(),
            recommendations: Vec::new(),
        }
    }
}

/// A date or amount quoted in a summary, with the sentence it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermMention {
    pub value: String,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub document_type: String,
    pub purpose: String,
    #[serde(default)]
    pub parties: Vec<String>,
    #[serde(default)]
    pub key_obligations: Vec<String>,
    #[serde(default)]
    pub key_rights: Vec<String>,
    #[serde(default)]
    pub important_dates: Vec<TermMention>,
    #[serde(default)]
    pub monetary_values: Vec<TermMention>,
    pub executive_summary: String,
}

/// Output of the analysis pipeline for one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    #[serde(default)]
    pub clauses: Vec<Clause>,
    #[serde(default)]
    pub key_terms: Vec<KeyTerm>,
    #[serde(default)]
    pub risk_assessment: Option<RiskAssessment>,
    #[serde(default)]
    pub summary: Option<DocumentSummary>,
}

impl Analysis {
    /// Distinct clause categories present.
    pub fn clause_categories(&self) -> BTreeSet<&str> {
        self.clauses.iter().map(|c| c.category.as_str()).collect()
    }

    /// Overall risk score, 0 when no assessment was produced.
    pub fn risk_score(&self) -> f64 {
        self.risk_assessment
            .as_ref()
            .map(|r| r.overall_risk_score)
            .unwrap_or(0.0)
    }

    pub fn risk_level(&self) -> Option<RiskLevel> {
        self.risk_assessment.as_ref().map(|r| r.overall_risk_level)
    }
}

/// A legal document and its analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub filename: String,
    /// Lowercased file extension, including the dot.
    pub file_type: String,
    pub file_size: u64,
    /// SHA-256 of the uploaded bytes.
    pub content_hash: String,
    pub upload_date: DateTime<Utc>,
    pub processed: bool,
    pub processing_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub raw_text: String,
    pub page_count: u32,
    pub word_count: usize,
    #[serde(flatten)]
    pub analysis: Analysis,
}

impl Document {
    /// Create an unprocessed document for uploaded content.
    pub fn new(filename: impl Into<String>, content: &[u8]) -> Self {
        let filename = filename.into();
        let file_type = std::path::Path::new(&filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .unwrap_or_default();

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            filename,
            file_type,
            file_size: content.len() as u64,
            content_hash: Self::compute_hash(content),
            upload_date: Utc::now(),
            processed: false,
            processing_date: None,
            raw_text: String::new(),
            page_count: 0,
            word_count: 0,
            analysis: Analysis::default(),
        }
    }

    /// Compute SHA-256 hash of content.
    pub fn compute_hash(content: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content);
        hex::encode(hasher.finalize())
    }

    /// Attach extracted text, updating word count.
    pub fn set_text(&mut self, raw_text: String, page_count: u32) {
        self.word_count = raw_text.split_whitespace().count();
        self.page_count = page_count;
        self.raw_text = raw_text;
    }

    /// Attach the pipeline's findings and mark the document processed.
    pub fn apply_analysis(&mut self, analysis: Analysis) {
        self.analysis = analysis;
        self.processed = true;
        self.processing_date = Some(Utc::now());
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.analysis.clauses
    }

    pub fn risk_score(&self) -> f64 {
        self.analysis.risk_score()
    }

    pub fn risk_level(&self) -> Option<RiskLevel> {
        self.analysis.risk_level()
    }

    pub fn listing(&self) -> DocumentListing {
        DocumentListing {
            id: self.id.clone(),
            filename: self.filename.clone(),
            upload_date: self.upload_date,
            processed: self.processed,
            risk_level: self.risk_level(),
        }
    }
}

/// Lightweight row for document listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentListing {
    pub id: String,
    pub filename: String,
    pub upload_date: DateTime<Utc>,
    pub processed: bool,
    pub risk_level: Option<RiskLevel>,
}
