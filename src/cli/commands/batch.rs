//! Batch commands.

use std::path::PathBuf;

use console::style;
use tokio::sync::mpsc;

use super::helpers::{batch_coordinator, document_processor, print_json};
use crate::cli::progress::spawn_batch_progress;
use clausewise::config::Settings;
use clausewise::services::{BatchEvent, BatchFile};

/// Create a batch from `files` and process it to completion.
pub async fn cmd_submit(
    settings: &Settings,
    files: Vec<PathBuf>,
    workers: Option<usize>,
) -> anyhow::Result<()> {
    let processor = document_processor(settings)?;
    let (event_tx, event_rx) = mpsc::channel::<BatchEvent>(100);

    let mut coordinator = batch_coordinator(settings, processor)?.with_events(event_tx);
    if let Some(workers) = workers {
        coordinator = coordinator.with_workers(workers);
    }

    let batch_files: Vec<BatchFile> = files.iter().map(BatchFile::from_path).collect();
    let batch_id = coordinator.create_batch(&batch_files).await?;
    eprintln!(
        "{} Submitted batch {} with {} workers",
        style("→").cyan(),
        style(&batch_id).bold(),
        coordinator.workers()
    );

    let progress = spawn_batch_progress(event_rx);
    let result = coordinator.process_batch(&batch_id, batch_files).await;

    // Close the channel so the progress task drains and exits.
    drop(coordinator);
    if let Err(e) = progress.await {
        tracing::error!("Progress display panicked: {}", e);
    }

    let result = result?;
    if result.failed > 0 {
        eprintln!(
            "{} {} of {} documents failed",
            style("!").yellow(),
            result.failed,
            result.total_documents
        );
    }
    print_json(&result)
}

pub async fn cmd_status(settings: &Settings, id: &str) -> anyhow::Result<()> {
    let coordinator = batch_coordinator(settings, document_processor(settings)?)?;
    let batch = coordinator.get_batch_status(id).await?;
    print_json(&batch)
}

pub async fn cmd_results(settings: &Settings, id: &str) -> anyhow::Result<()> {
    let coordinator = batch_coordinator(settings, document_processor(settings)?)?;
    let results = coordinator.get_batch_results(id).await?;
    if results.unavailable_results > 0 {
        eprintln!(
            "{} {} completed documents could not be loaded",
            style("!").yellow(),
            results.unavailable_results
        );
    }
    print_json(&results)
}

pub async fn cmd_list(settings: &Settings) -> anyhow::Result<()> {
    let coordinator = batch_coordinator(settings, document_processor(settings)?)?;
    print_json(&coordinator.list_batches().await?)
}
