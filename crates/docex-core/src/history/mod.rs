//! Extraction history kept in the cache store.
//!
//! Records live at `history:rec:{user}:{id}` and are indexed by user and by
//! label in sorted sets scored by extraction time (epoch millis).

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::cache::ResilientStore;
use crate::error::{DocexError, DocexResult};
use crate::traits::{HistorySink, ScoreRange};
use crate::types::HistoryRecord;

const USERS_KEY: &str = "history:users";

fn record_key(user_id: &str, id: &str) -> String {
    format!("history:rec:{}:{}", user_id, id)
}

fn user_index(user_id: &str) -> String {
    format!("history:by_user:{}", user_id)
}

fn label_index(label: &str) -> String {
    format!("history:by_label:{}", label)
}

/// History backed by hashes and sorted-set indices.
pub struct KvHistoryStore {
    store: Arc<ResilientStore>,
    ttl: Duration,
}

impl KvHistoryStore {
    pub fn new(store: Arc<ResilientStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub async fn get(&self, user_id: &str, id: &str) -> DocexResult<Option<HistoryRecord>> {
        let fields = self.store.hash_get_all(&record_key(user_id, id)).await;
        if fields.is_empty() {
            return Ok(None);
        }
        HistoryRecord::from_hash_fields(&fields).map(Some)
    }

    /// Most recent records for a user, newest first.
    ///
    /// Index entries whose record expired or no longer decodes are skipped.
    pub async fn recent_for_user(&self, user_id: &str, limit: usize) -> Vec<HistoryRecord> {
        let ids = self
            .store
            .sorted_set_range_by_score(&user_index(user_id), ScoreRange::latest(limit))
            .await;
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get(user_id, &id).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => debug!(user_id, id = %id, "History index points at a missing record"),
                Err(e) => debug!(user_id, id = %id, error = %e, "Skipping unreadable history record"),
            }
        }
        records
    }

    /// Record keys (`history:rec:{user}:{id}`) for a label, newest first.
    pub async fn keys_for_label(&self, label: &str, limit: usize) -> Vec<String> {
        self.store
            .sorted_set_range_by_score(&label_index(label), ScoreRange::latest(limit))
            .await
    }

    /// Every user with recorded history.
    pub async fn users(&self) -> Vec<String> {
        self.store.set_members(USERS_KEY).await
    }
}

#[async_trait]
impl HistorySink for KvHistoryStore {
    async fn record(&self, mut record: HistoryRecord) -> DocexResult<String> {
        if record.id.is_empty() {
            record.id = Uuid::new_v4().to_string();
        }
        let key = record_key(&record.user_id, &record.id);
        let fields = record.to_hash_fields()?;
        if !self.store.hash_set_all(&key, &fields, Some(self.ttl)).await {
            return Err(DocexError::cache_store(format!(
                "Failed to write history record {}",
                key
            )));
        }

        let score = record.extracted_at.timestamp_millis() as f64;
        let user_idx = user_index(&record.user_id);
        let label_idx = label_index(&record.label);
        self.store.sorted_set_add(&user_idx, &record.id, score).await;
        self.store.sorted_set_add(&label_idx, &key, score).await;
        self.store.expire(&user_idx, self.ttl).await;
        self.store.expire(&label_idx, self.ttl).await;
        self.store.set_add(USERS_KEY, &record.user_id).await;

        debug!(key = %key, status = %record.status, "Recorded history");
        Ok(record.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheOptions;
    use crate::store::InMemoryCacheStore;
    use crate::types::{HistoryStatus, StrategiesUsed};
    use chrono::{TimeZone, Utc};

    fn record(id: &str, minute: u32) -> HistoryRecord {
        HistoryRecord {
            id: id.to_string(),
            user_id: "u1".to_string(),
            pdf_hash: "p".to_string(),
            pdf_filename: Some("doc.pdf".to_string()),
            pdf_size_bytes: 10,
            label: "cnh".to_string(),
            template_id: None,
            schema_hash: "s".to_string(),
            extracted_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap(),
            processing_time_ms: 5,
            fields_total: 2,
            fields_extracted: 1,
            success_rate: 0.5,
            strategies: Some(StrategiesUsed {
                cache: 1,
                extracted: 0,
                cache_type: crate::types::CacheType::PartialComplete,
            }),
            result: None,
            error_message: None,
            status: HistoryStatus::Completed,
        }
    }

    fn history(backend: Arc<InMemoryCacheStore>) -> KvHistoryStore {
        let options = CacheOptions {
            retry_delay_ms: 1,
            ..CacheOptions::default()
        };
        KvHistoryStore::new(
            Arc::new(ResilientStore::new(backend, &options)),
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn test_record_and_list_newest_first() {
        let store = history(Arc::new(InMemoryCacheStore::new()));
        store.record(record("a", 1)).await.unwrap();
        store.record(record("b", 2)).await.unwrap();
        store.record(record("c", 3)).await.unwrap();

        let recent = store.recent_for_user("u1", 2).await;
        let ids: Vec<_> = recent.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);
        assert_eq!(recent[0], record("c", 3));

        assert_eq!(store.users().await, vec!["u1"]);
        assert_eq!(store.keys_for_label("cnh", 10).await.len(), 3);
        assert!(store.get("u1", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_id_is_generated() {
        let store = history(Arc::new(InMemoryCacheStore::new()));
        let id = store.record(record("", 1)).await.unwrap();
        assert!(!id.is_empty());
        assert_eq!(store.get("u1", &id).await.unwrap().unwrap().id, id);
    }

    #[tokio::test]
    async fn test_user_ids_never_collide_with_indices() {
        let store = history(Arc::new(InMemoryCacheStore::new()));
        let mut reserved = record("u1", 1);
        reserved.user_id = "by_user".to_string();
        store.record(reserved).await.unwrap();
        store.record(record("a", 2)).await.unwrap();

        let ids: Vec<_> = store
            .recent_for_user("u1", 10)
            .await
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["a"]);
        assert_eq!(store.recent_for_user("by_user", 10).await.len(), 1);
        assert_eq!(store.get("by_user", "u1").await.unwrap().unwrap().user_id, "by_user");
    }

    #[tokio::test]
    async fn test_store_outage_is_an_error() {
        let backend = Arc::new(InMemoryCacheStore::new());
        backend.set_available(false);
        let store = history(backend);
        assert!(store.record(record("a", 1)).await.is_err());
    }
}
