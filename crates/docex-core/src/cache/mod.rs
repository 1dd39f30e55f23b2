//! Extraction cache, residual merge and resilient store access.

pub mod hashing;
mod metrics;
mod residual;
mod resilience;
mod service;

pub use hashing::{cache_key, pdf_hash, schema_hash};
pub use metrics::{CacheMetrics, CacheStats};
pub use residual::{remove_known_values, KnownValues};
pub use resilience::{CircuitBreaker, LinearBackoff, LinearBuilder, ResilientStore};
pub use service::{ExtractionCache, PriorExtractions, SaveMeta};
