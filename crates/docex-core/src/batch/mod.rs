//! Batch job orchestration and the per-document pipeline.

mod background;
mod orchestrator;
mod processor;

pub use background::spawn_best_effort;
pub use orchestrator::BatchOrchestrator;
pub use processor::{decode_pdf_base64, ItemOutcome, ItemProcessor};
