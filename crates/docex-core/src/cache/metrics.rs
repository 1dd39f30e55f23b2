//! Daily cache hit/miss counters.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::resilience::ResilientStore;

const HITS: &str = "hits";
const MISSES: &str = "misses";
const SAVINGS_MS: &str = "total_savings_ms";
const SAVINGS_USD: &str = "total_savings_usd";

/// Counters for one day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub date: String,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub total_savings_ms: u64,
    pub total_savings_usd: f64,
}

/// Records cache hits and misses under `stats:cache:*:{date}`.
#[derive(Clone)]
pub struct CacheMetrics {
    store: Arc<ResilientStore>,
    ttl: Duration,
}

impl CacheMetrics {
    pub fn new(store: Arc<ResilientStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    fn key(counter: &str, date: NaiveDate) -> String {
        format!("stats:cache:{}:{}", counter, date.format("%Y-%m-%d"))
    }

    async fn bump(&self, counter: &str, date: NaiveDate) {
        let key = Self::key(counter, date);
        if self.store.incr_by(&key, 1).await.is_some() {
            self.store.expire(&key, self.ttl).await;
        }
    }

    /// Count a hit and the work it saved.
    pub async fn record_hit(&self, saved_ms: u64, saved_usd: f64) {
        let today = Utc::now().date_naive();
        self.bump(HITS, today).await;

        let ms_key = Self::key(SAVINGS_MS, today);
        if self.store.incr_by(&ms_key, saved_ms as i64).await.is_some() {
            self.store.expire(&ms_key, self.ttl).await;
        }
        if saved_usd > 0.0 {
            let usd_key = Self::key(SAVINGS_USD, today);
            if self.store.incr_by_float(&usd_key, saved_usd).await.is_some() {
                self.store.expire(&usd_key, self.ttl).await;
            }
        }
        debug!(saved_ms, saved_usd, "Recorded cache hit");
    }

    pub async fn record_miss(&self) {
        self.bump(MISSES, Utc::now().date_naive()).await;
    }

    /// Counters for `date`; missing counters read as zero.
    pub async fn daily(&self, date: NaiveDate) -> CacheStats {
        let read_u64 = |raw: Option<String>| raw.and_then(|v| v.parse::<u64>().ok()).unwrap_or(0);

        let hits = read_u64(self.store.get(&Self::key(HITS, date)).await);
        let misses = read_u64(self.store.get(&Self::key(MISSES, date)).await);
        let total_savings_ms = read_u64(self.store.get(&Self::key(SAVINGS_MS, date)).await);
        let total_savings_usd = self
            .store
            .get(&Self::key(SAVINGS_USD, date))
            .await
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(0.0);

        let total = hits + misses;
        CacheStats {
            date: date.format("%Y-%m-%d").to_string(),
            hits,
            misses,
            hit_rate: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
            total_savings_ms,
            total_savings_usd,
        }
    }
}
