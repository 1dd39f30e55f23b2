//! docex-stores - Cache store backends for docex.
//!
//! The extraction cache, its metrics and the history log all sit on the
//! [`CacheStore`] trait from `docex-core`. This crate provides the network
//! backends and a factory that picks one from configuration.
//!
//! # Supported Backends
//!
//! - **Memory** (always available) - process-local, from `docex-core`
//! - **Redis** (feature: `redis`) - any Redis-compatible server

mod factory;

#[cfg(feature = "redis")]
mod redis_store;

// Public exports
pub use factory::CacheStoreFactory;

#[cfg(feature = "redis")]
pub use redis_store::RedisCacheStore;

// Re-export core types for convenience
pub use docex_core::config::{StoreConfig, StoreProvider};
pub use docex_core::traits::{CacheStore, ScoreRange};
pub use docex_core::InMemoryCacheStore;
