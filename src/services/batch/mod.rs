//! Batch coordinator: concurrent analysis of many documents with persisted
//! progress.
//!
//! A batch moves `pending -> processing -> completed`. Documents are handed
//! to a fixed pool of workers; each finished document updates the batch
//! record, so progress can be polled while the batch runs. A failing
//! document is recorded on its sub-status and never aborts the batch.

mod types;

pub use types::{BatchEvent, BatchFile, FileSource};

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use super::documents::DocumentProcessor;
use crate::error::{ClausewiseError, Result};
use crate::models::{
    Batch, BatchItemStatus, BatchResult, BatchStatus, BatchSummary, ItemOutcome,
    RiskDistribution,
};
use crate::storage::{Collection, Loaded, RecordStore};

pub const DEFAULT_WORKERS: usize = 3;
pub const DEFAULT_MAX_BATCH_SIZE: usize = 10;

pub struct BatchCoordinator {
    batches: Collection<Batch>,
    processor: DocumentProcessor,
    workers: usize,
    max_batch_size: usize,
    /// Serializes every read-modify-write of batch records made by this
    /// coordinator. Other processes sharing the store are not covered.
    write_lock: Arc<Mutex<()>>,
    events: Option<mpsc::Sender<BatchEvent>>,
}

impl BatchCoordinator {
    pub fn new(store: Arc<dyn RecordStore>, processor: DocumentProcessor) -> Self {
        Self {
            batches: Collection::new("batch", store),
            processor,
            workers: DEFAULT_WORKERS,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            write_lock: Arc::new(Mutex::new(())),
            events: None,
        }
    }

    /// Number of documents processed in parallel. Fixed for the
    /// coordinator's lifetime.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_max_batch_size(mut self, max: usize) -> Self {
        self.max_batch_size = max;
        self
    }

    /// Send progress events to `tx`. Send failures are ignored.
    pub fn with_events(mut self, tx: mpsc::Sender<BatchEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Register a new batch with every document pending. Nothing is
    /// processed until [`process_batch`](Self::process_batch).
    pub async fn create_batch(&self, files: &[BatchFile]) -> Result<String> {
        if files.is_empty() {
            return Err(ClausewiseError::Validation(
                "a batch needs at least one file".into(),
            ));
        }
        if files.len() > self.max_batch_size {
            return Err(ClausewiseError::Validation(format!(
                "batch of {} files exceeds the maximum of {}",
                files.len(),
                self.max_batch_size
            )));
        }

        let batch_id = uuid::Uuid::new_v4().to_string();
        let batch = Batch::new(batch_id.clone(), files.iter().map(|f| f.filename.clone()));

        {
            let _guard = self.write_lock.lock().await;
            self.batches.save(&batch_id, &batch).await?;
        }

        tracing::info!("Created batch {} with {} documents", batch_id, files.len());
        Ok(batch_id)
    }

    /// Process every document of a pending batch and return its results.
    ///
    /// `files` must be the same list, in the same order, that the batch was
    /// created with.
    pub async fn process_batch(&self, batch_id: &str, files: Vec<BatchFile>) -> Result<BatchResult> {
        let batch = self.batches.get(batch_id).await?;
        if batch.total_documents != files.len() {
            return Err(ClausewiseError::Validation(format!(
                "batch {} has {} documents but {} files were supplied",
                batch_id,
                batch.total_documents,
                files.len()
            )));
        }
        if batch.status != BatchStatus::Pending {
            return Err(ClausewiseError::Validation(format!(
                "batch {} is already {}",
                batch_id,
                batch.status.as_str()
            )));
        }

        let run = Arc::new(BatchRun {
            batch_id: batch_id.to_string(),
            batches: self.batches.clone(),
            processor: self.processor.clone(),
            write_lock: self.write_lock.clone(),
            events: self.events.clone(),
        });

        run.mutate(|b| {
            b.status = BatchStatus::Processing;
            Ok(())
        })
        .await?;
        tracing::info!(
            "Processing batch {} ({} documents, {} workers)",
            batch_id,
            files.len(),
            self.workers
        );
        run.emit(BatchEvent::Started {
            batch_id: batch_id.to_string(),
            total: files.len(),
        })
        .await;

        let queue: Arc<Mutex<VecDeque<(usize, BatchFile)>>> =
            Arc::new(Mutex::new(files.into_iter().enumerate().collect()));

        let mut handles = Vec::with_capacity(self.workers);
        for _ in 0..self.workers.min(batch.total_documents) {
            let run = run.clone();
            let queue = queue.clone();
            handles.push(tokio::spawn(async move {
                loop {
                    let next = queue.lock().await.pop_front();
                    let Some((index, file)) = next else {
                        break;
                    };
                    run.process_one(index, file).await?;
                }
                Ok::<(), ClausewiseError>(())
            }));
        }

        let mut first_error = None;
        for handle in handles {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::error!("Batch {} worker stopped: {}", batch_id, e);
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    tracing::error!("Batch {} worker panicked: {}", batch_id, e);
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        let finished = run
            .mutate(|b| {
                b.status = BatchStatus::Completed;
                b.recompute_progress();
                Ok(())
            })
            .await?;
        tracing::info!(
            "Batch {} completed: {} succeeded, {} failed",
            batch_id,
            finished.completed_documents,
            finished.failed_documents
        );
        run.emit(BatchEvent::Finished {
            batch_id: batch_id.to_string(),
            completed: finished.completed_documents,
            failed: finished.failed_documents,
        })
        .await;

        self.get_batch_results(batch_id).await
    }

    /// Point-in-time snapshot of a batch.
    pub async fn get_batch_status(&self, batch_id: &str) -> Result<Batch> {
        self.batches.get(batch_id).await
    }

    /// Aggregate results from the persisted batch and its stored documents.
    ///
    /// Completed documents whose analysis cannot be loaded are left out of
    /// `detailed_results` and the risk distribution but still counted as
    /// successful, and in the average's denominator.
    pub async fn get_batch_results(&self, batch_id: &str) -> Result<BatchResult> {
        let batch = self.batches.get(batch_id).await?;

        let mut detailed_results = Vec::new();
        let mut risk_distribution = RiskDistribution::default();
        let mut risk_total = 0.0;
        let mut total_clauses_detected = 0;
        let mut unavailable_results = 0;

        let completed_ids = batch
            .documents
            .iter()
            .filter(|item| item.status == BatchItemStatus::Completed)
            .filter_map(|item| item.document_id.as_deref());

        for document_id in completed_ids {
            match self.processor.try_load(document_id).await? {
                Loaded::Found(doc) => {
                    if let Some(level) = doc.risk_level() {
                        risk_distribution.record(level);
                    }
                    risk_total += doc.risk_score();
                    total_clauses_detected += doc.clauses().len();
                    detailed_results.push(doc);
                }
                Loaded::Missing => {
                    tracing::warn!(
                        "Batch {}: document {} has no stored analysis",
                        batch_id,
                        document_id
                    );
                    unavailable_results += 1;
                }
                Loaded::Corrupt(reason) => {
                    tracing::warn!(
                        "Batch {}: skipping unreadable document {}: {}",
                        batch_id,
                        document_id,
                        reason
                    );
                    unavailable_results += 1;
                }
            }
        }

        // Unloadable documents still count as successes and score 0.
        let average_risk_score = if batch.completed_documents == 0 {
            0.0
        } else {
            (risk_total / batch.completed_documents as f64 * 100.0).round() / 100.0
        };

        Ok(BatchResult {
            batch_id: batch.batch_id,
            status: batch.status,
            created_at: batch.created_at,
            total_documents: batch.total_documents,
            successful: batch.completed_documents,
            failed: batch.failed_documents,
            progress_percentage: batch.progress_percentage,
            risk_distribution,
            average_risk_score,
            total_clauses_detected,
            documents: batch.documents,
            detailed_results,
            unavailable_results,
        })
    }

    /// All batches, newest first. Unreadable batch records are skipped.
    pub async fn list_batches(&self) -> Result<Vec<BatchSummary>> {
        let mut summaries: Vec<BatchSummary> = self
            .batches
            .list("")
            .await?
            .records
            .iter()
            .map(|(_, batch)| batch.summary())
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }
}

/// State shared by the workers of one `process_batch` call.
struct BatchRun {
    batch_id: String,
    batches: Collection<Batch>,
    processor: DocumentProcessor,
    write_lock: Arc<Mutex<()>>,
    events: Option<mpsc::Sender<BatchEvent>>,
}

impl BatchRun {
    async fn emit(&self, event: BatchEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event).await;
        }
    }

    /// Read-modify-write the batch record inside the coordinator's lock.
    async fn mutate<F>(&self, apply: F) -> Result<Batch>
    where
        F: FnMut(&mut Batch) -> Result<()> + Send,
    {
        let _guard = self.write_lock.lock().await;
        self.batches.update(&self.batch_id, apply).await
    }

    /// Analyze one document and record its outcome.
    ///
    /// Only failures to update the batch record itself are returned.
    async fn process_one(&self, index: usize, file: BatchFile) -> Result<()> {
        self.mutate(|b| b.mark_processing(index)).await?;
        self.emit(BatchEvent::DocumentStarted {
            index,
            filename: file.filename.clone(),
        })
        .await;

        let result = match file.source {
            FileSource::Path(ref path) => self.processor.process_file(path, &file.filename).await,
            FileSource::Bytes(content) => {
                self.processor.process_bytes(&file.filename, content).await
            }
        };

        match result {
            Ok(document) => {
                tracing::debug!("Batch {}: {} -> {}", self.batch_id, file.filename, document.id);
                let outcome = ItemOutcome::Completed {
                    document_id: document.id.clone(),
                };
                self.mutate(|b| b.record_outcome(index, outcome.clone()))
                    .await?;
                let risk_level = document.risk_level();
                self.emit(BatchEvent::DocumentCompleted {
                    index,
                    filename: file.filename,
                    document_id: document.id,
                    risk_level,
                })
                .await;
            }
            Err(e) => {
                let error = e.to_string();
                tracing::warn!(
                    "Batch {}: {} failed: {}",
                    self.batch_id,
                    file.filename,
                    error
                );
                let outcome = ItemOutcome::Failed {
                    error: error.clone(),
                };
                self.mutate(|b| b.record_outcome(index, outcome.clone()))
                    .await?;
                self.emit(BatchEvent::DocumentFailed {
                    index,
                    filename: file.filename,
                    error,
                })
                .await;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Analyzer, KeywordAnalyzer};
    use crate::models::Analysis;
    use crate::storage::InMemoryStore;

    /// Fails on text containing "FAIL", otherwise defers to the keyword analyzer.
    struct FailOnMarker;

    impl Analyzer for FailOnMarker {
        fn analyze(&self, text: &str) -> anyhow::Result<Analysis> {
            if text.contains("FAIL") {
                anyhow::bail!("scripted failure");
            }
            KeywordAnalyzer.analyze(text)
        }
    }

    fn coordinator() -> (Arc<InMemoryStore>, BatchCoordinator) {
        let batch_store = Arc::new(InMemoryStore::new());
        let processor =
            DocumentProcessor::new(Arc::new(InMemoryStore::new()), Arc::new(FailOnMarker));
        let coordinator = BatchCoordinator::new(batch_store.clone(), processor);
        (batch_store, coordinator)
    }

    fn files(texts: &[&str]) -> Vec<BatchFile> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| BatchFile::from_bytes(format!("doc{}.txt", i), t.as_bytes().to_vec()))
            .collect()
    }

    #[tokio::test]
    async fn test_create_batch_validation() {
        let (_, coordinator) = coordinator();
        let coordinator = coordinator.with_max_batch_size(2);

        assert!(matches!(
            coordinator.create_batch(&[]).await,
            Err(ClausewiseError::Validation(_))
        ));
        assert!(matches!(
            coordinator
                .create_batch(&files(&["a long enough sentence", "b", "c"]))
                .await,
            Err(ClausewiseError::Validation(_))
        ));
    }

    #[test]
    fn test_worker_count_is_at_least_one() {
        let (_, coordinator) = coordinator();
        assert_eq!(coordinator.workers(), DEFAULT_WORKERS);
        assert_eq!(coordinator.with_workers(0).workers(), 1);
    }

    #[tokio::test]
    async fn test_create_batch_is_pending() {
        let (_, coordinator) = coordinator();
        let batch_files = files(&["one", "two"]);
        let id = coordinator.create_batch(&batch_files).await.unwrap();

        let batch = coordinator.get_batch_status(&id).await.unwrap();
        assert_eq!(batch.status, BatchStatus::Pending);
        assert_eq!(batch.documents.len(), 2);
        assert_eq!(batch.documents[1].filename, "doc1.txt");
    }

    #[tokio::test]
    async fn test_process_batch_isolates_failures() {
        let (_, coordinator) = coordinator();
        let batch_files = files(&[
            "The Client shall pay each invoice within thirty days.",
            "FAIL this document please.",
            "Either party may terminate this agreement with notice.",
        ]);
        let id = coordinator.create_batch(&batch_files).await.unwrap();
        let result = coordinator.process_batch(&id, batch_files).await.unwrap();

        assert_eq!(result.status, BatchStatus::Completed);
        assert_eq!(result.successful, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.progress_percentage, 100);
        assert_eq!(result.detailed_results.len(), 2);
        assert_eq!(result.risk_distribution.total(), 2);
        assert_eq!(result.documents[1].status, BatchItemStatus::Failed);
        assert!(result.documents[1]
            .error
            .as_deref()
            .unwrap()
            .contains("scripted failure"));
    }

    #[tokio::test]
    async fn test_process_batch_rejects_mismatched_files() {
        let (_, coordinator) = coordinator();
        let id = coordinator.create_batch(&files(&["a", "b"])).await.unwrap();
        let err = coordinator
            .process_batch(&id, files(&["a"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ClausewiseError::Validation(_)));
    }

    #[tokio::test]
    async fn test_process_batch_twice_is_rejected() {
        let (_, coordinator) = coordinator();
        let batch_files = files(&["FAIL"]);
        let id = coordinator.create_batch(&batch_files).await.unwrap();
        coordinator
            .process_batch(&id, batch_files.clone())
            .await
            .unwrap();
        assert!(coordinator.process_batch(&id, batch_files).await.is_err());
    }

    #[tokio::test]
    async fn test_events_are_emitted() {
        let (_, coordinator) = coordinator();
        let (tx, mut rx) = mpsc::channel(64);
        let coordinator = coordinator.with_events(tx);

        let batch_files = files(&["The Client shall pay each invoice within thirty days."]);
        let id = coordinator.create_batch(&batch_files).await.unwrap();
        coordinator.process_batch(&id, batch_files).await.unwrap();
        drop(coordinator);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert!(matches!(events.first(), Some(BatchEvent::Started { total: 1, .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, BatchEvent::DocumentCompleted { index: 0, .. })));
        assert!(matches!(
            events.last(),
            Some(BatchEvent::Finished { completed: 1, failed: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_batch_is_not_found() {
        let (_, coordinator) = coordinator();
        assert!(coordinator
            .get_batch_status("missing")
            .await
            .unwrap_err()
            .is_not_found());
        assert!(coordinator
            .get_batch_results("missing")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_list_batches_skips_corrupt() {
        let (store, coordinator) = coordinator();
        let first = coordinator.create_batch(&files(&["a"])).await.unwrap();
        let second = coordinator.create_batch(&files(&["b"])).await.unwrap();
        store.write("corrupt-batch", "{").await.unwrap();

        let listed = coordinator.list_batches().await.unwrap();
        assert_eq!(listed.len(), 2);
        let ids: Vec<&str> = listed.iter().map(|b| b.batch_id.as_str()).collect();
        assert!(ids.contains(&first.as_str()));
        assert!(ids.contains(&second.as_str()));
        assert!(listed[0].created_at >= listed[1].created_at);
    }
}
