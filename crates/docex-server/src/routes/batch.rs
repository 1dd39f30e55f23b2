//! Batch submission, status and progress stream endpoints.

use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use docex_core::{BatchJobRequest, BatchJobStatus, JobEvent, JobState};

/// Response for a submitted batch.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBatchResponse {
    pub job_id: String,
    pub status: JobState,
    pub total_items: usize,
    pub created_at: DateTime<Utc>,
}

/// Submit a batch and start processing it.
/// POST /batch
pub async fn submit_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchJobRequest>,
) -> ApiResult<Json<SubmitBatchResponse>> {
    let orchestrator = state.orchestrator();
    let job = orchestrator.create_job(request)?;
    orchestrator.spawn_job(job.job_id.clone());

    Ok(Json(SubmitBatchResponse {
        job_id: job.job_id.clone(),
        status: job.status,
        total_items: job.total_items,
        created_at: job.created_at,
    }))
}

/// Current status of a batch.
/// GET /batch/:job_id
pub async fn get_batch(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<BatchJobStatus>> {
    let status = state
        .orchestrator()
        .status(&job_id)
        .ok_or_else(|| ApiError::from(docex_core::DocexError::job_not_found(&job_id)))?;
    Ok(Json(status.as_ref().clone()))
}

/// Progress events for a batch.
/// GET /batch/:job_id/stream
///
/// The stream's token is cancelled when the client goes away, which stops
/// the stream but never the job.
pub async fn stream_batch(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();
    debug!(job_id = %job_id, "Progress stream opened");

    let events = state
        .orchestrator()
        .stream(&job_id, cancel)
        .map(move |event| {
            let _held = &guard;
            Ok::<_, Infallible>(to_sse(&event))
        });

    Sse::new(events).keep_alive(KeepAlive::default())
}

fn to_sse(event: &JobEvent) -> Event {
    Event::default()
        .event(event.name())
        .json_data(event.data())
        .unwrap_or_else(|_| Event::default().event(event.name()).data("{}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_response_is_camel_case() {
        let response = SubmitBatchResponse {
            job_id: "j1".to_string(),
            status: JobState::Queued,
            total_items: 2,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["jobId"], "j1");
        assert_eq!(json["status"], "queued");
        assert_eq!(json["totalItems"], 2);
        assert!(json.get("createdAt").is_some());
    }
}
