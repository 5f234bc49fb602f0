//! Progress display for batch processing.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use clausewise::models::RiskLevel;
use clausewise::services::BatchEvent;

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
        .unwrap()
        .progress_chars("█▓░")
}

fn styled_level(level: Option<RiskLevel>) -> String {
    match level {
        Some(level @ (RiskLevel::High | RiskLevel::Critical)) => {
            style(level.as_str()).red().to_string()
        }
        Some(level @ RiskLevel::Medium) => style(level.as_str()).yellow().to_string(),
        Some(level) => style(level.as_str()).green().to_string(),
        None => style("n/a").dim().to_string(),
    }
}

/// Render batch events to stderr until the sender is dropped.
pub fn spawn_batch_progress(mut rx: mpsc::Receiver<BatchEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut bar: Option<ProgressBar> = None;

        while let Some(event) = rx.recv().await {
            match event {
                BatchEvent::Started { batch_id, total } => {
                    eprintln!(
                        "{} Processing batch {} ({} documents)",
                        style("→").cyan(),
                        style(&batch_id).bold(),
                        total
                    );
                    let progress = ProgressBar::new(total as u64);
                    progress.set_style(bar_style());
                    bar = Some(progress);
                }
                BatchEvent::DocumentStarted { filename, .. } => {
                    if let Some(ref pb) = bar {
                        pb.set_message(filename);
                    }
                }
                BatchEvent::DocumentCompleted {
                    filename,
                    risk_level,
                    ..
                } => {
                    if let Some(ref pb) = bar {
                        pb.println(format!(
                            "  {} {} (risk: {})",
                            style("✓").green(),
                            filename,
                            styled_level(risk_level)
                        ));
                        pb.inc(1);
                    }
                }
                BatchEvent::DocumentFailed {
                    filename, error, ..
                } => {
                    if let Some(ref pb) = bar {
                        pb.println(format!("  {} {}: {}", style("✗").red(), filename, error));
                        pb.inc(1);
                    }
                }
                BatchEvent::Finished {
                    completed, failed, ..
                } => {
                    if let Some(pb) = bar.take() {
                        pb.finish_and_clear();
                    }
                    eprintln!(
                        "{} {} completed, {} failed",
                        style("✓").green(),
                        completed,
                        failed
                    );
                }
            }
        }

        if let Some(pb) = bar {
            pb.abandon();
        }
    })
}
