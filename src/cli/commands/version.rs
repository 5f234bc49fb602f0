//! Version lineage commands.

use std::path::Path;

use anyhow::Context;
use console::style;

use super::helpers::{display_name, document_processor, print_json, version_manager};
use clausewise::config::Settings;

/// Analyze `file` and append it to the lineage rooted at `document_id`.
pub async fn cmd_add(settings: &Settings, document_id: &str, file: &Path) -> anyhow::Result<()> {
    let processor = document_processor(settings)?;
    let versions = version_manager(settings, processor.clone())?;

    let filename = display_name(file);
    let document = processor
        .process_file(file, &filename)
        .await
        .with_context(|| format!("Failed to analyze {}", file.display()))?;
    let record = versions.create_version(&document, Some(document_id)).await?;

    eprintln!(
        "{} Recorded {} as version {} of {}",
        style("✓").green(),
        filename,
        record.version_number,
        style(document_id).bold()
    );
    if let Some(changes) = record.changes_summary.as_ref().filter(|c| c.has_major_changes()) {
        eprintln!("  {} major changes:", style("!").yellow());
        for change in &changes.major_changes {
            eprintln!("    - {}", change);
        }
    }
    print_json(&record)
}

pub async fn cmd_list(settings: &Settings, document_id: &str) -> anyhow::Result<()> {
    let versions = version_manager(settings, document_processor(settings)?)?;
    let records = versions.get_versions(document_id).await?;
    if records.is_empty() {
        eprintln!(
            "{} No versions recorded for {}",
            style("!").yellow(),
            document_id
        );
    }
    print_json(&records)
}

pub async fn cmd_show(settings: &Settings, version_id: &str) -> anyhow::Result<()> {
    let versions = version_manager(settings, document_processor(settings)?)?;
    print_json(&versions.get_version_by_id(version_id).await?)
}

pub async fn cmd_compare(settings: &Settings, id1: &str, id2: &str) -> anyhow::Result<()> {
    let versions = version_manager(settings, document_processor(settings)?)?;
    let comparison = versions.compare_versions(id1, id2).await?;
    eprintln!(
        "{} {}% similar ({}), risk {:+.1}",
        style("→").cyan(),
        comparison.text_stats.similarity_percentage,
        comparison.text_stats.change_type.as_str(),
        comparison.risk_comparison.delta
    );
    print_json(&comparison)
}

pub async fn cmd_restore(settings: &Settings, version_id: &str) -> anyhow::Result<()> {
    let versions = version_manager(settings, document_processor(settings)?)?;
    let record = versions.restore_version(version_id).await?;
    eprintln!(
        "{} Version {} of {} is now current",
        style("✓").green(),
        record.version_number,
        record.document_id
    );
    print_json(&record)
}
