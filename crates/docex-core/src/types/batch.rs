//! Batch submission, status and progress event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString, IntoStaticStr};

use super::cached::CacheType;
use super::schema::{ExtractorResponse, Schema};

/// One document in a batch submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    pub file_id: String,
    pub pdf_base64: String,
    pub extraction_schema: Schema,
    /// Opaque caller data echoed back on the item's result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_filename: Option<String>,
    /// Caller-computed schema hash, reported instead of the computed one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_hash: Option<String>,
}

/// A batch of documents sharing one label.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchJobRequest {
    pub label: String,
    #[serde(alias = "pdfItems")]
    pub items: Vec<BatchItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Overall job lifecycle: queued, then processing, then completed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Processing,
    Completed,
}

/// Per-item lifecycle: pending, then processing, then success or error.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Processing,
    Success,
    Error,
}

impl ItemStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ItemStatus::Success | ItemStatus::Error)
    }
}

/// Result slot for one submitted item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemResult {
    pub file_id: String,
    pub status: ItemStatus,
    pub data: Option<ExtractorResponse>,
    pub error_message: Option<String>,
    pub processing_time_ms: u64,
    pub processed_at: Option<DateTime<Utc>>,
    pub used_cache: bool,
    pub cache_type: Option<CacheType>,
    pub schema_hash: Option<String>,
    pub validation_data: Option<Value>,
}

impl BatchItemResult {
    pub fn pending(item: &BatchItem) -> Self {
        Self {
            file_id: item.file_id.clone(),
            status: ItemStatus::Pending,
            data: None,
            error_message: None,
            processing_time_ms: 0,
            processed_at: None,
            used_cache: false,
            cache_type: None,
            schema_hash: None,
            validation_data: item.validation_data.clone(),
        }
    }
}

/// Snapshot of a batch job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchJobStatus {
    pub job_id: String,
    pub label: String,
    pub status: JobState,
    pub total_items: usize,
    pub processed_items: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub results: Vec<BatchItemResult>,
}

impl BatchJobStatus {
    pub fn queued(job_id: impl Into<String>, request: &BatchJobRequest) -> Self {
        Self {
            job_id: job_id.into(),
            label: request.label.clone(),
            status: JobState::Queued,
            total_items: request.items.len(),
            processed_items: 0,
            success_count: 0,
            error_count: 0,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            results: request.items.iter().map(BatchItemResult::pending).collect(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == JobState::Completed
    }
}

/// `progress` event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPayload {
    pub job_id: String,
    pub status: JobState,
    pub processed: usize,
    pub total: usize,
    pub success_count: usize,
    pub error_count: usize,
}

/// `result` event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultPayload {
    pub file_id: String,
    pub status: ItemStatus,
    pub data: Option<ExtractorResponse>,
    pub error: Option<String>,
    pub processing_time_ms: u64,
    pub used_cache: bool,
    pub cache_type: Option<CacheType>,
    pub validation_data: Option<Value>,
}

/// `complete` event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletePayload {
    pub job_id: String,
    pub total_items: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Event emitted on a job progress stream.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Progress(ProgressPayload),
    Result(ResultPayload),
    Complete(CompletePayload),
    Error { message: String },
}

impl JobEvent {
    /// Event name used on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            JobEvent::Progress(_) => "progress",
            JobEvent::Result(_) => "result",
            JobEvent::Complete(_) => "complete",
            JobEvent::Error { .. } => "error",
        }
    }

    /// JSON payload for the event.
    pub fn data(&self) -> Value {
        let value = match self {
            JobEvent::Progress(p) => serde_json::to_value(p),
            JobEvent::Result(r) => serde_json::to_value(r),
            JobEvent::Complete(c) => serde_json::to_value(c),
            JobEvent::Error { message } => Ok(serde_json::json!({ "message": message })),
        };
        value.unwrap_or(Value::Null)
    }

    pub(crate) fn progress(status: &BatchJobStatus) -> Self {
        JobEvent::Progress(ProgressPayload {
            job_id: status.job_id.clone(),
            status: status.status,
            processed: status.processed_items,
            total: status.total_items,
            success_count: status.success_count,
            error_count: status.error_count,
        })
    }

    pub(crate) fn result(item: &BatchItemResult) -> Self {
        JobEvent::Result(ResultPayload {
            file_id: item.file_id.clone(),
            status: item.status,
            data: item.data.clone(),
            error: item.error_message.clone(),
            processing_time_ms: item.processing_time_ms,
            used_cache: item.used_cache,
            cache_type: item.cache_type,
            validation_data: item.validation_data.clone(),
        })
    }

    pub(crate) fn complete(status: &BatchJobStatus) -> Self {
        JobEvent::Complete(CompletePayload {
            job_id: status.job_id.clone(),
            total_items: status.total_items,
            success_count: status.success_count,
            error_count: status.error_count,
            completed_at: status.completed_at,
        })
    }
}
