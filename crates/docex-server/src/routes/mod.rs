//! Route definitions for the REST API.

mod batch;
mod cache;
mod extract;
mod health;
mod history;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::state::AppState;

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Batch jobs
        .route("/batch", post(batch::submit_batch))
        .route("/batch/:job_id", get(batch::get_batch))
        .route("/batch/:job_id/stream", get(batch::stream_batch))
        // Single document
        .route("/extract", post(extract::extract))
        // Cache administration
        .route("/cache", delete(cache::delete_cache_entry))
        .route("/cache/stats", get(cache::cache_stats))
        // History
        .route("/history/:user_id", get(history::get_history))
        // Attach state
        .with_state(state)
}

pub use batch::*;
pub use cache::*;
pub use extract::*;
pub use health::*;
pub use history::*;
