//! Retry and circuit breaking around cache store access.
//!
//! Every [`ResilientStore`] call first consults the [`CircuitBreaker`]; while
//! it is open the call returns the "miss" value immediately. Otherwise the
//! operation is retried with linearly growing delays, and the final outcome
//! feeds the breaker. Failures never escape as errors.

use backon::{BackoffBuilder, Retryable};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::CacheOptions;
use crate::error::{DocexError, DocexResult};
use crate::traits::{CacheStore, ScoreRange};

/// Backoff where retry `n` waits `n * step`.
#[derive(Debug, Clone, Copy)]
pub struct LinearBuilder {
    step: Duration,
    max_times: usize,
}

impl LinearBuilder {
    pub fn new(step: Duration, max_times: usize) -> Self {
        Self { step, max_times }
    }
}

#[derive(Debug, Clone)]
pub struct LinearBackoff {
    step: Duration,
    attempt: u32,
    max_times: usize,
}

impl Iterator for LinearBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.attempt as usize >= self.max_times {
            return None;
        }
        self.attempt += 1;
        Some(self.step * self.attempt)
    }
}

impl BackoffBuilder for LinearBuilder {
    type Backoff = LinearBackoff;

    fn build(self) -> Self::Backoff {
        LinearBackoff {
            step: self.step,
            attempt: 0,
            max_times: self.max_times,
        }
    }
}

#[derive(Debug, Default)]
struct BreakerState {
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

/// Consecutive-failure circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    threshold: u32,
    cooldown: Duration,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            cooldown,
            state: Mutex::new(BreakerState::default()),
        }
    }

    /// Whether a call may go through. Closes the breaker once the cool-down
    /// has elapsed.
    pub fn allow(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match state.opened_at {
            Some(opened) if opened.elapsed() < self.cooldown => false,
            Some(_) => {
                state.opened_at = None;
                state.consecutive_failures = 0;
                info!("Cache circuit breaker closed after cool-down");
                true
            }
            None => true,
        }
    }

    pub fn record_success(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.consecutive_failures = 0;
    }

    pub fn record_failure(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.consecutive_failures += 1;
        if state.consecutive_failures >= self.threshold && state.opened_at.is_none() {
            state.opened_at = Some(Instant::now());
            warn!(
                failures = state.consecutive_failures,
                cooldown_secs = self.cooldown.as_secs(),
                "Cache circuit breaker opened"
            );
        }
    }

    pub fn is_open(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .opened_at
            .is_some_and(|opened| opened.elapsed() < self.cooldown)
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .consecutive_failures
    }
}

/// A [`CacheStore`] behind retries and a circuit breaker.
pub struct ResilientStore {
    inner: Arc<dyn CacheStore>,
    breaker: CircuitBreaker,
    retry_step: Duration,
    max_retries: usize,
    scan_page_size: usize,
}

impl ResilientStore {
    pub fn new(inner: Arc<dyn CacheStore>, options: &CacheOptions) -> Self {
        Self {
            inner,
            breaker: CircuitBreaker::new(
                options.circuit_breaker_threshold,
                options.breaker_cooldown(),
            ),
            retry_step: Duration::from_millis(options.retry_delay_ms),
            max_retries: options.max_retries as usize,
            scan_page_size: options.scan_page_size,
        }
    }

    pub fn inner(&self) -> &Arc<dyn CacheStore> {
        &self.inner
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    async fn guarded<T, F, Fut>(&self, op: &'static str, key: &str, call: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DocexResult<T>>,
    {
        if !self.breaker.allow() {
            debug!(op, key, "Cache circuit open, skipping call");
            return None;
        }

        let outcome = call
            .retry(LinearBuilder::new(self.retry_step, self.max_retries))
            .notify(|err: &DocexError, dur: Duration| {
                debug!(op, key, error = %err, "Cache call failed, retrying in {:?}", dur);
            })
            .await;

        match outcome {
            Ok(value) => {
                self.breaker.record_success();
                Some(value)
            }
            Err(e) => {
                self.breaker.record_failure();
                warn!(op, key, backend = self.inner.name(), error = %e, "Cache call failed");
                None
            }
        }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.guarded("get", key, || self.inner.get(key))
            .await
            .flatten()
    }

    pub async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> bool {
        self.guarded("set", key, || self.inner.set(key, value, ttl))
            .await
            .is_some()
    }

    pub async fn delete(&self, key: &str) -> bool {
        self.guarded("delete", key, || self.inner.delete(key))
            .await
            .unwrap_or(false)
    }

    pub async fn exists(&self, key: &str) -> bool {
        self.guarded("exists", key, || self.inner.exists(key))
            .await
            .unwrap_or(false)
    }

    pub async fn expire(&self, key: &str, ttl: Duration) -> bool {
        self.guarded("expire", key, || self.inner.expire(key, ttl))
            .await
            .unwrap_or(false)
    }

    /// Empty when the key is missing or the store is unavailable.
    pub async fn hash_get_all(&self, key: &str) -> HashMap<String, String> {
        self.guarded("hash_get_all", key, || self.inner.hash_get_all(key))
            .await
            .unwrap_or_default()
    }

    pub async fn hash_set_all(
        &self,
        key: &str,
        fields: &[(String, String)],
        ttl: Option<Duration>,
    ) -> bool {
        self.guarded("hash_set_all", key, || {
            self.inner.hash_set_all(key, fields, ttl)
        })
        .await
        .is_some()
    }

    pub async fn incr_by(&self, key: &str, delta: i64) -> Option<i64> {
        self.guarded("incr_by", key, || self.inner.incr_by(key, delta))
            .await
    }

    pub async fn incr_by_float(&self, key: &str, delta: f64) -> Option<f64> {
        self.guarded("incr_by_float", key, || self.inner.incr_by_float(key, delta))
            .await
    }

    pub async fn set_add(&self, key: &str, member: &str) -> bool {
        self.guarded("set_add", key, || self.inner.set_add(key, member))
            .await
            .is_some()
    }

    pub async fn set_remove(&self, key: &str, member: &str) -> bool {
        self.guarded("set_remove", key, || self.inner.set_remove(key, member))
            .await
            .unwrap_or(false)
    }

    pub async fn set_members(&self, key: &str) -> Vec<String> {
        self.guarded("set_members", key, || self.inner.set_members(key))
            .await
            .unwrap_or_default()
    }

    pub async fn sorted_set_add(&self, key: &str, member: &str, score: f64) -> bool {
        self.guarded("sorted_set_add", key, || {
            self.inner.sorted_set_add(key, member, score)
        })
        .await
        .is_some()
    }

    pub async fn sorted_set_remove(&self, key: &str, member: &str) -> bool {
        self.guarded("sorted_set_remove", key, || {
            self.inner.sorted_set_remove(key, member)
        })
        .await
        .unwrap_or(false)
    }

    pub async fn sorted_set_range_by_score(&self, key: &str, range: ScoreRange) -> Vec<String> {
        self.guarded("sorted_set_range_by_score", key, || {
            self.inner.sorted_set_range_by_score(key, range)
        })
        .await
        .unwrap_or_default()
    }

    pub async fn scan_keys(&self, pattern: &str) -> Vec<String> {
        self.guarded("scan_keys", pattern, || {
            self.inner.scan_keys(pattern, self.scan_page_size)
        })
        .await
        .unwrap_or_default()
    }

    /// Ping through the breaker.
    pub async fn is_available(&self) -> bool {
        self.guarded("ping", "", || self.inner.ping()).await.is_some()
    }
}
