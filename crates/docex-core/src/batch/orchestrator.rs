//! Batch jobs: creation, sequential processing and progress streams.
//!
//! A job's status is owned by its processing loop. Every change publishes a
//! fresh immutable snapshot on a watch channel; pollers and streams only
//! ever read snapshots, so readers never block the loop.
//!
//! The submitted documents are released once a job starts processing.
//! Completed jobs stay queryable for a retention window and are evicted
//! when new jobs are created.

use async_stream::stream;
use chrono::Utc;
use futures::Stream;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::background::spawn_best_effort;
use super::processor::{ItemOutcome, ItemProcessor};
use crate::error::{DocexError, DocexResult};
use crate::traits::HistorySink;
use crate::types::{
    is_present, BatchItem, BatchJobRequest, BatchJobStatus, HistoryRecord, HistoryStatus,
    ItemStatus, JobEvent, JobState,
};

type StatusSender = Arc<watch::Sender<Arc<BatchJobStatus>>>;

struct JobEntry {
    /// Taken by the processing loop; `None` once the job has started.
    request: Option<BatchJobRequest>,
    status: StatusSender,
}

const DEFAULT_RETENTION: Duration = Duration::from_secs(3_600);
const DEFAULT_MAX_RETAINED: usize = 1_000;

pub struct BatchOrchestrator {
    processor: Arc<ItemProcessor>,
    history: Option<Arc<dyn HistorySink>>,
    default_user: String,
    retention: Duration,
    max_retained: usize,
    jobs: RwLock<HashMap<String, JobEntry>>,
}

impl BatchOrchestrator {
    pub fn new(processor: Arc<ItemProcessor>, default_user: impl Into<String>) -> Self {
        Self {
            processor,
            history: None,
            default_user: default_user.into(),
            retention: DEFAULT_RETENTION,
            max_retained: DEFAULT_MAX_RETAINED,
            jobs: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_history(mut self, history: Arc<dyn HistorySink>) -> Self {
        self.history = Some(history);
        self
    }

    /// Keep completed jobs for `retention`, and at most `max_retained` of them.
    pub fn with_retention(mut self, retention: Duration, max_retained: usize) -> Self {
        self.retention = retention;
        self.max_retained = max_retained;
        self
    }

    pub fn processor(&self) -> &Arc<ItemProcessor> {
        &self.processor
    }

    /// Validate a submission and register it as a queued job.
    pub fn create_job(&self, request: BatchJobRequest) -> DocexResult<Arc<BatchJobStatus>> {
        validate(&request)?;

        let job_id = Uuid::new_v4().to_string();
        let status = Arc::new(BatchJobStatus::queued(&job_id, &request));
        let (tx, _) = watch::channel(status.clone());
        info!(
            job_id = %job_id,
            label = %request.label,
            items = request.items.len(),
            "Batch job created"
        );

        self.evict_finished_jobs();
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                job_id,
                JobEntry {
                    request: Some(request),
                    status: Arc::new(tx),
                },
            );
        Ok(status)
    }

    /// Forget completed jobs past the retention window, then the oldest
    /// completed ones beyond the retained maximum. Returns how many went.
    ///
    /// Queued and running jobs are never evicted.
    pub fn evict_finished_jobs(&self) -> usize {
        let now = Utc::now();
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        let before = jobs.len();

        let mut completed: Vec<(String, chrono::DateTime<Utc>)> = jobs
            .iter()
            .filter_map(|(id, entry)| {
                let snapshot = entry.status.borrow();
                snapshot
                    .completed_at
                    .filter(|_| snapshot.is_completed())
                    .map(|at| (id.clone(), at))
            })
            .collect();
        completed.sort_by_key(|(_, at)| *at);

        let expired = completed
            .iter()
            .take_while(|(_, at)| {
                (now - *at)
                    .to_std()
                    .is_ok_and(|age| age >= self.retention)
            })
            .count();
        let over_limit = completed.len().saturating_sub(expired).saturating_sub(self.max_retained);
        for (id, _) in completed.iter().take(expired + over_limit) {
            jobs.remove(id);
        }

        let evicted = before - jobs.len();
        if evicted > 0 {
            debug!(evicted, retained = jobs.len(), "Evicted finished batch jobs");
        }
        evicted
    }

    /// Latest snapshot of a job.
    pub fn status(&self, job_id: &str) -> Option<Arc<BatchJobStatus>> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(job_id)
            .map(|entry| entry.status.borrow().clone())
    }

    pub fn subscribe(&self, job_id: &str) -> Option<watch::Receiver<Arc<BatchJobStatus>>> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(job_id)
            .map(|entry| entry.status.subscribe())
    }

    pub fn job_ids(&self) -> Vec<String> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Take a queued job's request, leaving only its status behind.
    fn take_request(&self, job_id: &str) -> DocexResult<(BatchJobRequest, StatusSender)> {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        let entry = jobs
            .get_mut(job_id)
            .ok_or_else(|| DocexError::job_not_found(job_id))?;
        let request = entry.request.take().ok_or_else(|| {
            DocexError::validation(format!("Job {} has already been started", job_id))
        })?;
        Ok((request, entry.status.clone()))
    }

    /// Run every item of a job, in submission order.
    ///
    /// Item failures are recorded on the item and never stop the job. The
    /// request, documents included, is dropped when the job completes.
    pub async fn process_job(&self, job_id: &str) -> DocexResult<()> {
        let (request, tx) = self.take_request(job_id)?;
        tx.send_modify(|current| {
            let mut next = (**current).clone();
            next.status = JobState::Processing;
            next.started_at = Some(Utc::now());
            *current = Arc::new(next);
        });
        let mut status = (**tx.borrow()).clone();
        info!(job_id, total = status.total_items, "Batch job started");

        for (index, item) in request.items.iter().enumerate() {
            status.results[index].status = ItemStatus::Processing;
            tx.send_replace(Arc::new(status.clone()));

            let outcome = self.processor.process(&request.label, item).await;
            self.record_history(&request, item, &outcome);

            let slot = &mut status.results[index];
            slot.processed_at = Some(Utc::now());
            match outcome {
                Ok(outcome) => {
                    slot.status = ItemStatus::Success;
                    slot.processing_time_ms = outcome.processing_time_ms;
                    slot.used_cache = outcome.cache_type.used_cache();
                    slot.cache_type = Some(outcome.cache_type);
                    slot.schema_hash = Some(outcome.schema_hash);
                    slot.data = Some(outcome.data);
                    status.success_count += 1;
                }
                Err(e) => {
                    let message = if e.is_connectivity() {
                        format!("Failed to connect to text extraction service: {}", e)
                    } else {
                        e.to_string()
                    };
                    warn!(job_id, file_id = %item.file_id, error = %e, "Item failed");
                    slot.status = ItemStatus::Error;
                    slot.error_message = Some(message);
                    status.error_count += 1;
                }
            }
            status.processed_items += 1;
            tx.send_replace(Arc::new(status.clone()));
        }

        status.status = JobState::Completed;
        status.completed_at = Some(Utc::now());
        tx.send_replace(Arc::new(status.clone()));
        info!(
            job_id,
            success = status.success_count,
            errors = status.error_count,
            "Batch job completed"
        );
        Ok(())
    }

    /// Process a job on the runtime without waiting for it.
    pub fn spawn_job(self: &Arc<Self>, job_id: impl Into<String>) -> JoinHandle<()> {
        let orchestrator = Arc::clone(self);
        let job_id = job_id.into();
        tokio::spawn(async move {
            if let Err(e) = orchestrator.process_job(&job_id).await {
                error!(job_id = %job_id, error = %e, "Batch job failed to run");
            }
        })
    }

    /// Progress events for a job.
    ///
    /// Replays the job's cumulative state first, then follows it until the
    /// job completes (ending with one `complete` event) or `cancel` fires.
    /// Cancelling only stops the stream, never the job. An unknown job
    /// yields a single `error` event.
    pub fn stream(
        &self,
        job_id: &str,
        cancel: CancellationToken,
    ) -> impl Stream<Item = JobEvent> + Send + 'static {
        let receiver = self.subscribe(job_id);
        let job_id = job_id.to_string();

        stream! {
            let Some(mut rx) = receiver else {
                yield JobEvent::Error { message: format!("Job {} not found", job_id) };
                return;
            };

            let mut emitted = 0usize;
            let mut last_progress = None;
            loop {
                let snapshot = rx.borrow_and_update().clone();

                while emitted < snapshot.results.len()
                    && snapshot.results[emitted].status.is_terminal()
                {
                    yield JobEvent::result(&snapshot.results[emitted]);
                    emitted += 1;
                }

                let progress = JobEvent::progress(&snapshot);
                if last_progress.as_ref() != Some(&progress) {
                    last_progress = Some(progress.clone());
                    yield progress;
                }

                if snapshot.is_completed() {
                    yield JobEvent::complete(&snapshot);
                    break;
                }

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    }

    fn record_history(
        &self,
        request: &BatchJobRequest,
        item: &BatchItem,
        outcome: &DocexResult<ItemOutcome>,
    ) {
        let Some(history) = self.history.clone() else {
            return;
        };
        let schema = &item.extraction_schema;
        let fields_total = schema.len();

        let mut record = HistoryRecord {
            id: Uuid::new_v4().to_string(),
            user_id: request
                .user_id
                .clone()
                .unwrap_or_else(|| self.default_user.clone()),
            pdf_hash: String::new(),
            pdf_filename: item.pdf_filename.clone(),
            pdf_size_bytes: 0,
            label: request.label.clone(),
            template_id: request.template_id.clone(),
            schema_hash: item
                .schema_hash
                .clone()
                .unwrap_or_else(|| self.processor.cache().schema_hash(schema)),
            extracted_at: Utc::now(),
            processing_time_ms: 0,
            fields_total,
            fields_extracted: 0,
            success_rate: 0.0,
            strategies: None,
            result: None,
            error_message: None,
            status: HistoryStatus::Failed,
        };

        match outcome {
            Ok(outcome) => {
                let extracted = outcome.data.values().filter(|v| is_present(v)).count();
                record.pdf_hash = outcome.pdf_hash.clone();
                record.pdf_size_bytes = outcome.pdf_size_bytes;
                record.schema_hash = outcome.schema_hash.clone();
                record.processing_time_ms = outcome.processing_time_ms;
                record.fields_extracted = extracted;
                record.success_rate = if fields_total == 0 {
                    0.0
                } else {
                    extracted as f64 / fields_total as f64
                };
                record.strategies = Some(outcome.strategies);
                record.result = Some(outcome.data.clone());
                record.status = HistoryStatus::Completed;
            }
            Err(e) => {
                record.pdf_hash = self.processor.pdf_hash_of(item).unwrap_or_default();
                record.error_message = Some(e.to_string());
            }
        }

        spawn_best_effort("history", async move { history.record(record).await });
    }
}

/// Reject malformed submissions before a job exists.
fn validate(request: &BatchJobRequest) -> DocexResult<()> {
    if request.label.trim().is_empty() {
        return Err(DocexError::missing_field("label", "label is required"));
    }
    if request.items.is_empty() {
        return Err(DocexError::validation_with_suggestion(
            "At least one item is required",
            "Send one or more items with fileId, pdfBase64 and extractionSchema",
        ));
    }
    let mut seen = HashSet::with_capacity(request.items.len());
    for (index, item) in request.items.iter().enumerate() {
        if item.file_id.trim().is_empty() {
            return Err(DocexError::missing_field(
                "fileId",
                format!("Item {} has no fileId", index),
            ));
        }
        if !seen.insert(item.file_id.as_str()) {
            return Err(DocexError::duplicate_item(&item.file_id));
        }
        if item.extraction_schema.is_empty() {
            return Err(DocexError::missing_field(
                "extractionSchema",
                format!("Item '{}' has an empty extraction schema", item.file_id),
            ));
        }
    }
    Ok(())
}
