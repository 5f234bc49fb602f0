//! Document processing: extract, analyze, persist.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analysis::Analyzer;
use crate::error::{ClausewiseError, Result};
use crate::extract;
use crate::models::{Document, DocumentListing, RiskDistribution};
use crate::storage::{Collection, Loaded, RecordStore};

/// Aggregate counts over stored documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentStats {
    pub total_documents: usize,
    pub processed_documents: usize,
    pub total_clauses: usize,
    pub average_risk_score: f64,
    pub risk_distribution: RiskDistribution,
    /// Records that could not be read.
    pub skipped: usize,
}

/// Runs the analysis pipeline over uploaded files and owns the document
/// collection.
#[derive(Clone)]
pub struct DocumentProcessor {
    documents: Collection<Document>,
    analyzer: Arc<dyn Analyzer>,
    uploads_dir: Option<PathBuf>,
}

impl DocumentProcessor {
    pub fn new(store: Arc<dyn RecordStore>, analyzer: Arc<dyn Analyzer>) -> Self {
        Self {
            documents: Collection::new("document", store),
            analyzer,
            uploads_dir: None,
        }
    }

    /// Keep a copy of every uploaded file in `dir`, named by document id.
    pub fn with_uploads_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.uploads_dir = Some(dir.into());
        self
    }

    /// Process a file on disk. `filename` is the name the user uploaded it as.
    pub async fn process_file(&self, path: &Path, filename: &str) -> Result<Document> {
        let content = tokio::fs::read(path).await?;
        self.process_bytes(filename, content).await
    }

    /// Run the full pipeline over uploaded content and persist the result.
    ///
    /// Steps run strictly in order: extract text, detect clauses, extract key
    /// terms, assess risk, summarize, persist.
    pub async fn process_bytes(&self, filename: &str, content: Vec<u8>) -> Result<Document> {
        let analyzer = self.analyzer.clone();
        let name = filename.to_string();

        let (document, content) = tokio::task::spawn_blocking(move || {
            let document = analyze_content(analyzer.as_ref(), &name, &content);
            (document, content)
        })
        .await
        .map_err(|e| {
            tracing::error!("Analysis worker for {} panicked: {}", filename, e);
            ClausewiseError::Analysis(format!("analysis worker panicked: {}", e))
        })?;
        let document = document?;

        if let Some(dir) = &self.uploads_dir {
            let target = dir.join(format!("{}{}", document.id, document.file_type));
            tokio::fs::write(&target, &content).await?;
            tracing::debug!("Stored upload {} as {}", filename, target.display());
        }

        self.documents.save(&document.id, &document).await?;
        tracing::debug!("Persisted document {} ({})", document.id, filename);
        Ok(document)
    }

    /// Load a processed document. Fails with NotFound if it was never stored.
    pub async fn load_document(&self, id: &str) -> Result<Document> {
        self.documents.get(id).await
    }

    /// Load a document, reporting missing and corrupt records as values.
    pub async fn try_load(&self, id: &str) -> Result<Loaded<Document>> {
        self.documents.load(id).await
    }

    /// All stored documents, newest first. Unreadable records are skipped.
    pub async fn list_documents(&self) -> Result<Vec<DocumentListing>> {
        let mut listings: Vec<DocumentListing> = self
            .documents
            .list("")
            .await?
            .into_values()
            .iter()
            .map(Document::listing)
            .collect();
        listings.sort_by(|a, b| b.upload_date.cmp(&a.upload_date));
        Ok(listings)
    }

    pub async fn stats(&self) -> Result<DocumentStats> {
        let listing = self.documents.list("").await?;
        let mut stats = DocumentStats {
            skipped: listing.skipped,
            ..Default::default()
        };

        let mut risk_total = 0.0;
        let mut assessed = 0usize;
        for (_, doc) in &listing.records {
            stats.total_documents += 1;
            stats.total_clauses += doc.clauses().len();
            if doc.processed {
                stats.processed_documents += 1;
            }
            if let Some(level) = doc.risk_level() {
                stats.risk_distribution.record(level);
                risk_total += doc.risk_score();
                assessed += 1;
            }
        }
        if assessed > 0 {
            stats.average_risk_score = (risk_total / assessed as f64 * 100.0).round() / 100.0;
        }
        Ok(stats)
    }
}

fn analyze_content(analyzer: &dyn Analyzer, filename: &str, content: &[u8]) -> Result<Document> {
    let mut document = Document::new(filename, content);

    tracing::debug!("Extracting text from {}", filename);
    let extracted = extract::extract_bytes(filename, content)?;
    document.set_text(extracted.text, extracted.page_count);

    tracing::debug!(
        "Analyzing {} ({} words) with {}",
        filename,
        document.word_count,
        analyzer.name()
    );
    let analysis = analyzer
        .analyze(&document.raw_text)
        .map_err(|e| ClausewiseError::Analysis(format!("{:#}", e)))?;
    document.apply_analysis(analysis);
    Ok(document)
}
