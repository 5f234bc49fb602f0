//! Single-document commands: analyze, list, show, stats.

use std::path::Path;

use anyhow::Context;
use console::style;

use super::helpers::{display_name, document_processor, print_json, version_manager};
use clausewise::config::Settings;

/// Analyze one file and record it as version 1 of a new lineage.
pub async fn cmd_analyze(settings: &Settings, file: &Path) -> anyhow::Result<()> {
    let processor = document_processor(settings)?;
    let versions = version_manager(settings, processor.clone())?;

    let filename = display_name(file);
    let document = processor
        .process_file(file, &filename)
        .await
        .with_context(|| format!("Failed to analyze {}", file.display()))?;
    versions.create_version(&document, None).await?;

    eprintln!(
        "{} Analyzed {} as {} ({} clauses, risk {})",
        style("✓").green(),
        filename,
        style(&document.id).bold(),
        document.clauses().len(),
        document.risk_level().map_or("n/a", |l| l.as_str())
    );
    print_json(&document)
}

pub async fn cmd_list(settings: &Settings) -> anyhow::Result<()> {
    let processor = document_processor(settings)?;
    let documents = processor.list_documents().await?;
    if documents.is_empty() {
        eprintln!("{} No documents analyzed yet", style("!").yellow());
    }
    print_json(&documents)
}

pub async fn cmd_show(settings: &Settings, id: &str) -> anyhow::Result<()> {
    let processor = document_processor(settings)?;
    let document = processor.load_document(id).await?;
    print_json(&document)
}

pub async fn cmd_stats(settings: &Settings) -> anyhow::Result<()> {
    let processor = document_processor(settings)?;
    let stats = processor.stats().await?;
    if stats.skipped > 0 {
        eprintln!(
            "{} Skipped {} unreadable document records",
            style("!").yellow(),
            stats.skipped
        );
    }
    print_json(&stats)
}
