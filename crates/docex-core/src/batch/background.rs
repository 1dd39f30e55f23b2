//! Best-effort background work.

use std::future::Future;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::error::DocexResult;

/// Spawn `task` detached. Its failure is logged and goes nowhere else.
///
/// Nothing awaits or cancels the task; the caller keeps the handle only if
/// it wants to wait in tests.
pub fn spawn_best_effort<F, T>(name: &'static str, task: F) -> JoinHandle<()>
where
    F: Future<Output = DocexResult<T>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = task.await {
            warn!(task = name, error = %e, "Background task failed");
        }
    })
}
