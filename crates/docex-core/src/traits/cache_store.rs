//! Key-value cache store trait.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::DocexResult;

/// Score window for sorted-set range queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreRange {
    pub min: f64,
    pub max: f64,
    pub limit: Option<usize>,
    /// Highest score first.
    pub descending: bool,
}

impl ScoreRange {
    /// Every member, lowest score first.
    pub fn all() -> Self {
        Self {
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
            limit: None,
            descending: false,
        }
    }

    /// The `limit` highest-scored members.
    pub fn latest(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            descending: true,
            ..Self::all()
        }
    }
}

/// Key-value store primitives the cache, metrics and history layers build on.
///
/// Implementations must tolerate concurrent access to unrelated keys.
/// Errors are returned as-is; retries and the circuit breaker live in
/// [`crate::cache::ResilientStore`].
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Backend name, for logs.
    fn name(&self) -> &str;

    async fn get(&self, key: &str) -> DocexResult<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> DocexResult<()>;

    /// Returns whether the key existed.
    async fn delete(&self, key: &str) -> DocexResult<bool>;

    async fn exists(&self, key: &str) -> DocexResult<bool>;

    /// Returns false when the key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> DocexResult<bool>;

    /// All fields of a hash; empty when the key is missing.
    async fn hash_get_all(&self, key: &str) -> DocexResult<HashMap<String, String>>;

    /// Write hash fields, then apply `ttl` to the key when given.
    async fn hash_set_all(
        &self,
        key: &str,
        fields: &[(String, String)],
        ttl: Option<Duration>,
    ) -> DocexResult<()>;

    async fn incr_by(&self, key: &str, delta: i64) -> DocexResult<i64>;

    async fn incr_by_float(&self, key: &str, delta: f64) -> DocexResult<f64>;

    /// Returns whether the member was newly added.
    async fn set_add(&self, key: &str, member: &str) -> DocexResult<bool>;

    async fn set_remove(&self, key: &str, member: &str) -> DocexResult<bool>;

    async fn set_members(&self, key: &str) -> DocexResult<Vec<String>>;

    /// Add or update a member's score. Returns whether it was new.
    async fn sorted_set_add(&self, key: &str, member: &str, score: f64) -> DocexResult<bool>;

    async fn sorted_set_remove(&self, key: &str, member: &str) -> DocexResult<bool>;

    async fn sorted_set_range_by_score(
        &self,
        key: &str,
        range: ScoreRange,
    ) -> DocexResult<Vec<String>>;

    /// Keys matching a glob pattern (`*`, `?`), fetched `page_size` at a time.
    async fn scan_keys(&self, pattern: &str, page_size: usize) -> DocexResult<Vec<String>>;

    async fn ping(&self) -> DocexResult<()>;
}
