//! Shared helpers for CLI commands.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;

use clausewise::analysis::KeywordAnalyzer;
use clausewise::config::Settings;
use clausewise::services::{BatchCoordinator, DocumentProcessor, VersionManager};
use clausewise::storage::{JsonDirStore, RecordStore};

fn open_store(dir: &Path) -> anyhow::Result<Arc<dyn RecordStore>> {
    let store = JsonDirStore::open(dir)
        .with_context(|| format!("Failed to open record store at {}", dir.display()))?;
    tracing::debug!("Opened record store at {}", store.root().display());
    Ok(Arc::new(store))
}

/// Document processor over the configured data directory.
pub fn document_processor(settings: &Settings) -> anyhow::Result<DocumentProcessor> {
    Ok(DocumentProcessor::new(
        open_store(&settings.processed_dir)?,
        Arc::new(KeywordAnalyzer::new()),
    )
    .with_uploads_dir(&settings.uploads_dir))
}

pub fn batch_coordinator(
    settings: &Settings,
    processor: DocumentProcessor,
) -> anyhow::Result<BatchCoordinator> {
    Ok(
        BatchCoordinator::new(open_store(&settings.batches_dir)?, processor)
            .with_workers(settings.workers)
            .with_max_batch_size(settings.max_batch_size),
    )
}

pub fn version_manager(
    settings: &Settings,
    processor: DocumentProcessor,
) -> anyhow::Result<VersionManager> {
    Ok(
        VersionManager::new(open_store(&settings.versions_dir)?, processor)
            .with_diff_limits(settings.diff_line_limit, settings.diff_change_limit)
            .with_major_risk_threshold(settings.major_risk_threshold),
    )
}

/// Pretty-print a value as JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// The final path component, used as the uploaded filename.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
