//! History persistence collaborator.

use async_trait::async_trait;

use crate::error::DocexResult;
use crate::types::HistoryRecord;

/// Best-effort sink for extraction history.
///
/// Callers treat failures as telemetry loss, never as extraction failures.
#[async_trait]
pub trait HistorySink: Send + Sync {
    /// Persist a record and return its id.
    async fn record(&self, record: HistoryRecord) -> DocexResult<String>;
}
