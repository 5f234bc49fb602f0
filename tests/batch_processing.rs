//! End-to-end batch processing over the public API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clausewise::analysis::Analyzer;
use clausewise::models::{
    Analysis, BatchItemStatus, BatchStatus, Clause, RiskAssessment, RiskLevel,
};
use clausewise::services::{BatchCoordinator, BatchEvent, BatchFile, DocumentProcessor};
use clausewise::storage::{InMemoryStore, JsonDirStore, RecordStore};
use tokio::sync::mpsc;

/// Analyzer driven by directives in the document text:
/// `fail`, `delay <ms>`, `clause <category>`, `risk <score>`.
struct ScriptedAnalyzer;

impl Analyzer for ScriptedAnalyzer {
    fn analyze(&self, text: &str) -> anyhow::Result<Analysis> {
        let mut analysis = Analysis::default();
        for line in text.lines() {
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some("fail"), _) => anyhow::bail!("scripted failure"),
                (Some("delay"), Some(ms)) => {
                    std::thread::sleep(Duration::from_millis(ms.parse()?));
                }
                (Some("clause"), Some(category)) => {
                    analysis.clauses.push(Clause::new(line, category));
                }
                (Some("risk"), Some(score)) => {
                    let score: f64 = score.parse()?;
                    analysis.risk_assessment = Some(RiskAssessment {
                        overall_risk_score: score,
                        overall_risk_level: RiskLevel::from_score(score),
                        ..Default::default()
                    });
                }
                _ => {}
            }
        }
        Ok(analysis)
    }
}

/// Records how many analyses run at the same time.
#[derive(Default)]
struct ConcurrencyTracker {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl Analyzer for ConcurrencyTracker {
    fn analyze(&self, _text: &str) -> anyhow::Result<Analysis> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(40));
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(Analysis::default())
    }
}

fn processor() -> DocumentProcessor {
    DocumentProcessor::new(Arc::new(InMemoryStore::new()), Arc::new(ScriptedAnalyzer))
}

fn coordinator(processor: DocumentProcessor) -> BatchCoordinator {
    BatchCoordinator::new(Arc::new(InMemoryStore::new()), processor)
}

#[tokio::test]
async fn test_two_succeed_one_fails() {
    let coordinator = coordinator(processor());
    let files = vec![
        BatchFile::from_bytes("nda.txt", "clause confidentiality\nrisk 20"),
        BatchFile::from_bytes("broken.txt", "fail"),
        BatchFile::from_bytes("lease.txt", "clause payment\nclause termination\nrisk 70"),
    ];

    let batch_id = coordinator.create_batch(&files).await.unwrap();
    let result = coordinator.process_batch(&batch_id, files).await.unwrap();

    assert_eq!(result.status, BatchStatus::Completed);
    assert_eq!(result.successful, 2);
    assert_eq!(result.failed, 1);
    assert_eq!(result.progress_percentage, 100);
    assert_eq!(result.detailed_results.len(), 2);
    assert_eq!(result.total_clauses_detected, 3);
    assert_eq!(result.average_risk_score, 45.0);
    assert_eq!(result.risk_distribution.low, 1);
    assert_eq!(result.risk_distribution.high, 1);

    let failed = &result.documents[1];
    assert_eq!(failed.status, BatchItemStatus::Failed);
    assert!(failed.error.as_deref().unwrap().contains("scripted failure"));
    assert!(failed.document_id.is_none());
}

#[tokio::test]
async fn test_sub_status_order_matches_submission() {
    let (tx, mut rx) = mpsc::channel(64);
    let coordinator = coordinator(processor()).with_workers(3).with_events(tx);

    // Earlier files take longer, so completion order is reversed.
    let files = vec![
        BatchFile::from_bytes("slow.txt", "delay 120\nclause payment"),
        BatchFile::from_bytes("medium.txt", "delay 60\nclause warranty"),
        BatchFile::from_bytes("fast.txt", "clause liability"),
    ];

    let batch_id = coordinator.create_batch(&files).await.unwrap();
    let result = coordinator.process_batch(&batch_id, files).await.unwrap();
    drop(coordinator);

    let names: Vec<&str> = result.documents.iter().map(|d| d.filename.as_str()).collect();
    assert_eq!(names, vec!["slow.txt", "medium.txt", "fast.txt"]);
    assert!(result
        .documents
        .iter()
        .all(|d| d.status == BatchItemStatus::Completed));

    let mut completed = Vec::new();
    let mut finished = false;
    while let Some(event) = rx.recv().await {
        match event {
            BatchEvent::DocumentCompleted { index, .. } => completed.push(index),
            BatchEvent::Finished {
                completed, failed, ..
            } => {
                assert_eq!((completed, failed), (3, 0));
                finished = true;
            }
            _ => {}
        }
    }
    assert!(finished);
    assert_eq!(completed.len(), 3);
    assert_eq!(completed[0], 2);
}

#[tokio::test]
async fn test_counts_always_cover_every_document() {
    let coordinator = coordinator(processor()).with_workers(2).with_max_batch_size(10);
    let files: Vec<BatchFile> = (0..7)
        .map(|i| {
            let body = if i % 3 == 0 { "fail" } else { "clause payment" };
            BatchFile::from_bytes(format!("doc{}.txt", i), body)
        })
        .collect();

    let batch_id = coordinator.create_batch(&files).await.unwrap();
    coordinator.process_batch(&batch_id, files).await.unwrap();

    let batch = coordinator.get_batch_status(&batch_id).await.unwrap();
    assert_eq!(batch.total_documents, 7);
    assert_eq!(batch.documents.len(), 7);
    assert_eq!(batch.completed_documents + batch.failed_documents, 7);
    assert_eq!(batch.failed_documents, 3);
    assert_eq!(batch.progress_percentage, 100);

    // Reads without intervening writes are identical.
    let again = coordinator.get_batch_status(&batch_id).await.unwrap();
    assert_eq!(batch, again);
}

#[tokio::test]
async fn test_batch_survives_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let documents: Arc<dyn RecordStore> =
        Arc::new(JsonDirStore::open(dir.path().join("processed")).unwrap());
    let batches: Arc<dyn RecordStore> =
        Arc::new(JsonDirStore::open(dir.path().join("batches")).unwrap());

    let processor = DocumentProcessor::new(documents, Arc::new(ScriptedAnalyzer));
    let coordinator = BatchCoordinator::new(batches.clone(), processor.clone());
    let files = vec![
        BatchFile::from_bytes("a.txt", "clause payment\nrisk 10"),
        BatchFile::from_bytes("b.txt", "clause liability\nrisk 90"),
    ];
    let batch_id = coordinator.create_batch(&files).await.unwrap();
    coordinator.process_batch(&batch_id, files).await.unwrap();

    // A fresh coordinator over the same directories sees the same results.
    let reopened = BatchCoordinator::new(batches, processor);
    let result = reopened.get_batch_results(&batch_id).await.unwrap();
    assert_eq!(result.successful, 2);
    assert_eq!(result.risk_distribution.critical, 1);
    assert_eq!(result.average_risk_score, 50.0);

    let listed = reopened.list_batches().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].batch_id, batch_id);
}

#[tokio::test]
async fn test_rejects_invalid_batches() {
    let coordinator = coordinator(processor()).with_max_batch_size(2);

    assert!(coordinator.create_batch(&[]).await.is_err());

    let too_many: Vec<BatchFile> = (0..3)
        .map(|i| BatchFile::from_bytes(format!("{}.txt", i), "clause payment"))
        .collect();
    assert!(coordinator.create_batch(&too_many).await.is_err());

    let files = vec![BatchFile::from_bytes("a.txt", "clause payment")];
    let batch_id = coordinator.create_batch(&files).await.unwrap();
    assert!(coordinator.process_batch(&batch_id, Vec::new()).await.is_err());

    coordinator.process_batch(&batch_id, files.clone()).await.unwrap();
    assert!(coordinator.process_batch(&batch_id, files).await.is_err());

    assert!(coordinator
        .get_batch_status("no-such-batch")
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn test_unloadable_documents_still_count_as_successful() {
    let documents = Arc::new(InMemoryStore::new());
    let batches = Arc::new(InMemoryStore::new());
    let processor = DocumentProcessor::new(documents.clone(), Arc::new(ScriptedAnalyzer));
    let coordinator = BatchCoordinator::new(batches.clone(), processor);

    let files = vec![
        BatchFile::from_bytes("a.txt", "clause payment\nrisk 20"),
        BatchFile::from_bytes("b.txt", "clause warranty\nrisk 40"),
    ];
    let batch_id = coordinator.create_batch(&files).await.unwrap();
    let result = coordinator.process_batch(&batch_id, files).await.unwrap();
    assert_eq!(result.average_risk_score, 30.0);
    assert_eq!(result.unavailable_results, 0);

    // Corrupt one stored analysis.
    let corrupted = result.documents[1].document_id.clone().unwrap();
    documents.write(&corrupted, "{").await.unwrap();

    let result = coordinator.get_batch_results(&batch_id).await.unwrap();
    assert_eq!(result.successful, 2);
    assert_eq!(result.detailed_results.len(), 1);
    assert_eq!(result.unavailable_results, 1);
    assert_eq!(result.risk_distribution.total(), 1);
    assert_eq!(result.total_clauses_detected, 1);
    // The unreadable document still counts toward the average's denominator.
    assert_eq!(result.average_risk_score, 10.0);

    // Against an empty document store every analysis is missing.
    let empty = DocumentProcessor::new(Arc::new(InMemoryStore::new()), Arc::new(ScriptedAnalyzer));
    let result = BatchCoordinator::new(batches, empty)
        .get_batch_results(&batch_id)
        .await
        .unwrap();
    assert_eq!(result.successful, 2);
    assert!(result.detailed_results.is_empty());
    assert_eq!(result.unavailable_results, 2);
    assert_eq!(result.average_risk_score, 0.0);
}

#[tokio::test]
async fn test_average_is_zero_without_successes() {
    let coordinator = coordinator(processor());
    let files = vec![
        BatchFile::from_bytes("a.txt", "fail"),
        BatchFile::from_bytes("b.txt", "fail"),
    ];
    let batch_id = coordinator.create_batch(&files).await.unwrap();
    let result = coordinator.process_batch(&batch_id, files).await.unwrap();

    assert_eq!(result.successful, 0);
    assert_eq!(result.failed, 2);
    assert_eq!(result.average_risk_score, 0.0);
    assert_eq!(result.progress_percentage, 100);
}

#[tokio::test]
async fn test_worker_pool_bounds_concurrent_analyses() {
    let tracker = Arc::new(ConcurrencyTracker::default());
    let processor = DocumentProcessor::new(Arc::new(InMemoryStore::new()), tracker.clone());
    let coordinator = coordinator(processor).with_workers(3);

    let files: Vec<BatchFile> = (0..9)
        .map(|i| BatchFile::from_bytes(format!("doc{}.txt", i), "clause payment"))
        .collect();
    let batch_id = coordinator.create_batch(&files).await.unwrap();
    let result = coordinator.process_batch(&batch_id, files).await.unwrap();

    assert_eq!(result.successful, 9);
    let peak = tracker.peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak concurrency {} exceeded the pool size", peak);
    assert!(peak > 1, "documents were never analyzed concurrently");
}

#[tokio::test]
async fn test_single_worker_runs_sequentially() {
    let tracker = Arc::new(ConcurrencyTracker::default());
    let processor = DocumentProcessor::new(Arc::new(InMemoryStore::new()), tracker.clone());
    let coordinator = coordinator(processor).with_workers(1);

    let files: Vec<BatchFile> = (0..4)
        .map(|i| BatchFile::from_bytes(format!("doc{}.txt", i), "clause payment"))
        .collect();
    let batch_id = coordinator.create_batch(&files).await.unwrap();
    coordinator.process_batch(&batch_id, files).await.unwrap();

    assert_eq!(tracker.peak.load(Ordering::SeqCst), 1);
}
