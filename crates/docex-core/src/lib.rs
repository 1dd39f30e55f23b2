//! docex-core - Core library for docex.
//!
//! Extracts named fields from document text. Fields with a verifiable shape
//! (enumerations, CPF, dates, amounts, ...) are resolved locally by regex and
//! enum matching, and the remaining text goes to an external semantic
//! service. Results are cached per (label, document, schema), and a later
//! request for the same document with a wider schema only pays for the
//! fields not seen before.
//!
//! # Example
//!
//! ```ignore
//! use docex_core::{ExtractorConfig, SequentialExtractor};
//!
//! let config = ExtractorConfig::default();
//! let extractor = SequentialExtractor::new(semantic_client, config.extraction.clone());
//!
//! let schema = [("cpf", "CPF do titular"), ("nome", "Nome completo")]
//!     .into_iter()
//!     .collect();
//! let result = extractor.extract("cnh", &schema, &text).await?;
//! ```

pub mod batch;
pub mod cache;
pub mod classify;
pub mod config;
pub mod error;
pub mod extraction;
pub mod history;
pub mod labels;
pub mod patterns;
pub mod store;
pub mod text;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use batch::{
    decode_pdf_base64, spawn_best_effort, BatchOrchestrator, ItemOutcome, ItemProcessor,
};
pub use cache::{
    remove_known_values, CacheMetrics, CacheStats, CircuitBreaker, ExtractionCache, KnownValues,
    ResilientStore, SaveMeta,
};
pub use classify::{classify, classify_schema, extract_enum_values, find_best_match};
pub use config::ExtractorConfig;
pub use error::{DocexError, DocexResult, ErrorCode};
pub use extraction::{LineStore, SequentialExtractor};
pub use history::KvHistoryStore;
pub use labels::{LabelDetectionService, LabelTarget};
pub use store::InMemoryCacheStore;
pub use traits::{
    CacheStore, HistorySink, LabelDetectRequest, LabelDetectResponse, LabelDetector, ScoreRange,
    SemanticExtractor, SemanticRequest, SemanticResponse, TextExtractor,
};
pub use types::{
    BatchItem, BatchItemResult, BatchJobRequest, BatchJobStatus, CacheType, CachedExtraction,
    DetectedLabel, DetectedLabels, ExtractorResponse, FieldSpec, FieldType, HistoryRecord,
    HistoryStatus, ItemStatus, JobEvent, JobState, Schema, StrategiesUsed,
};
