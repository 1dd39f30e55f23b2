//! In-process cache store.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::error::{DocexError, DocexResult};
use crate::traits::{CacheStore, ScoreRange};

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    Hash(HashMap<String, String>),
    Set(BTreeSet<String>),
    ZSet(HashMap<String, f64>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// [`CacheStore`] kept in a process-local map.
///
/// Honours TTLs lazily on access. `set_available(false)` makes every call
/// fail, which is how tests exercise the circuit breaker.
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    entries: RwLock<HashMap<String, Entry>>,
    unavailable: AtomicBool,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the backend going away (or coming back).
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Number of live keys.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| !e.is_expired(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check(&self) -> DocexResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DocexError::cache_store("in-memory store marked unavailable"));
        }
        Ok(())
    }

    async fn read_value(&self, key: &str) -> DocexResult<Option<Value>> {
        self.check()?;
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .await
            .get(key)
            .filter(|e| !e.is_expired(now))
            .map(|e| e.value.clone()))
    }

    /// Run `f` on the live entry for `key`, creating it with `init` if missing.
    async fn with_entry<T>(
        &self,
        key: &str,
        init: impl FnOnce() -> Value,
        f: impl FnOnce(&mut Value) -> DocexResult<T>,
    ) -> DocexResult<T> {
        self.check()?;
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|e| e.is_expired(now)) {
            entries.remove(key);
        }
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::new(init()));
        f(&mut entry.value)
    }
}

fn wrong_type(key: &str) -> DocexError {
    DocexError::cache_store(format!(
        "WRONGTYPE operation against key '{}' holding the wrong kind of value",
        key
    ))
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> DocexResult<Option<String>> {
        match self.read_value(key).await? {
            None => Ok(None),
            Some(Value::Str(s)) => Ok(Some(s)),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> DocexResult<()> {
        self.check()?;
        let entry = Entry {
            value: Value::Str(value.to_string()),
            expires_at: ttl.map(|t| Instant::now() + t),
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> DocexResult<bool> {
        self.check()?;
        let now = Instant::now();
        let removed = self.entries.write().await.remove(key);
        Ok(removed.is_some_and(|e| !e.is_expired(now)))
    }

    async fn exists(&self, key: &str) -> DocexResult<bool> {
        Ok(self.read_value(key).await?.is_some())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> DocexResult<bool> {
        self.check()?;
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        match entries.get_mut(key) {
            Some(entry) if !entry.is_expired(now) => {
                entry.expires_at = Some(now + ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn hash_get_all(&self, key: &str) -> DocexResult<HashMap<String, String>> {
        match self.read_value(key).await? {
            None => Ok(HashMap::new()),
            Some(Value::Hash(h)) => Ok(h),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn hash_set_all(
        &self,
        key: &str,
        fields: &[(String, String)],
        ttl: Option<Duration>,
    ) -> DocexResult<()> {
        self.with_entry(
            key,
            || Value::Hash(HashMap::new()),
            |value| match value {
                Value::Hash(h) => {
                    h.extend(fields.iter().cloned());
                    Ok(())
                }
                _ => Err(wrong_type(key)),
            },
        )
        .await?;
        if let Some(ttl) = ttl {
            self.expire(key, ttl).await?;
        }
        Ok(())
    }

    async fn incr_by(&self, key: &str, delta: i64) -> DocexResult<i64> {
        self.with_entry(
            key,
            || Value::Str("0".to_string()),
            |value| match value {
                Value::Str(s) => {
                    let current: i64 = s
                        .parse()
                        .map_err(|_| DocexError::cache_store("value is not an integer"))?;
                    let next = current + delta;
                    *s = next.to_string();
                    Ok(next)
                }
                _ => Err(wrong_type(key)),
            },
        )
        .await
    }

    async fn incr_by_float(&self, key: &str, delta: f64) -> DocexResult<f64> {
        self.with_entry(
            key,
            || Value::Str("0".to_string()),
            |value| match value {
                Value::Str(s) => {
                    let current: f64 = s
                        .parse()
                        .map_err(|_| DocexError::cache_store("value is not a float"))?;
                    let next = current + delta;
                    *s = next.to_string();
                    Ok(next)
                }
                _ => Err(wrong_type(key)),
            },
        )
        .await
    }

    async fn set_add(&self, key: &str, member: &str) -> DocexResult<bool> {
        self.with_entry(
            key,
            || Value::Set(BTreeSet::new()),
            |value| match value {
                Value::Set(set) => Ok(set.insert(member.to_string())),
                _ => Err(wrong_type(key)),
            },
        )
        .await
    }

    async fn set_remove(&self, key: &str, member: &str) -> DocexResult<bool> {
        self.with_entry(
            key,
            || Value::Set(BTreeSet::new()),
            |value| match value {
                Value::Set(set) => Ok(set.remove(member)),
                _ => Err(wrong_type(key)),
            },
        )
        .await
    }

    async fn set_members(&self, key: &str) -> DocexResult<Vec<String>> {
        match self.read_value(key).await? {
            None => Ok(Vec::new()),
            Some(Value::Set(set)) => Ok(set.into_iter().collect()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn sorted_set_add(&self, key: &str, member: &str, score: f64) -> DocexResult<bool> {
        self.with_entry(
            key,
            || Value::ZSet(HashMap::new()),
            |value| match value {
                Value::ZSet(z) => Ok(z.insert(member.to_string(), score).is_none()),
                _ => Err(wrong_type(key)),
            },
        )
        .await
    }

    async fn sorted_set_remove(&self, key: &str, member: &str) -> DocexResult<bool> {
        self.with_entry(
            key,
            || Value::ZSet(HashMap::new()),
            |value| match value {
                Value::ZSet(z) => Ok(z.remove(member).is_some()),
                _ => Err(wrong_type(key)),
            },
        )
        .await
    }

    async fn sorted_set_range_by_score(
        &self,
        key: &str,
        range: ScoreRange,
    ) -> DocexResult<Vec<String>> {
        let zset = match self.read_value(key).await? {
            None => return Ok(Vec::new()),
            Some(Value::ZSet(z)) => z,
            Some(_) => return Err(wrong_type(key)),
        };
        let mut members: Vec<(String, f64)> = zset
            .into_iter()
            .filter(|(_, score)| *score >= range.min && *score <= range.max)
            .collect();
        members.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        if range.descending {
            members.reverse();
        }
        let limit = range.limit.unwrap_or(usize::MAX);
        Ok(members.into_iter().take(limit).map(|(m, _)| m).collect())
    }

    async fn scan_keys(&self, pattern: &str, _page_size: usize) -> DocexResult<Vec<String>> {
        self.check()?;
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .entries
            .read()
            .await
            .iter()
            .filter(|(k, e)| !e.is_expired(now) && glob_match(pattern, k))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn ping(&self) -> DocexResult<()> {
        self.check()
    }
}

/// Redis-style glob matching supporting `*` and `?`.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((star_pi, star_ti)) = star {
            pi = star_pi + 1;
            ti = star_ti + 1;
            star = Some((star_pi, star_ti + 1));
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match() {
        assert!(glob_match("extraction:*:abc:*", "extraction:cnh:abc:123"));
        assert!(!glob_match("extraction:*:abc:*", "extraction:cnh:abd:123"));
        assert!(glob_match("stats:?", "stats:1"));
        assert!(glob_match("*", ""));
        assert!(!glob_match("a?", "a"));
    }

    #[tokio::test]
    async fn test_string_ttl_expires() {
        let store = InMemoryCacheStore::new();
        store
            .set("k", "v", Some(Duration::from_millis(20)))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(!store.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_hash_roundtrip_and_wrong_type() {
        let store = InMemoryCacheStore::new();
        let fields = vec![("a".to_string(), "1".to_string())];
        store.hash_set_all("h", &fields, None).await.unwrap();
        assert_eq!(store.hash_get_all("h").await.unwrap()["a"], "1");
        assert!(store.get("h").await.is_err());
        assert!(store.hash_get_all("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_counters() {
        let store = InMemoryCacheStore::new();
        assert_eq!(store.incr_by("c", 2).await.unwrap(), 2);
        assert_eq!(store.incr_by("c", 3).await.unwrap(), 5);
        let total = store.incr_by_float("f", 0.25).await.unwrap();
        assert!((total - 0.25).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_sorted_set_range() {
        let store = InMemoryCacheStore::new();
        store.sorted_set_add("z", "old", 1.0).await.unwrap();
        store.sorted_set_add("z", "mid", 2.0).await.unwrap();
        store.sorted_set_add("z", "new", 3.0).await.unwrap();

        let latest = store
            .sorted_set_range_by_score("z", ScoreRange::latest(2))
            .await
            .unwrap();
        assert_eq!(latest, vec!["new", "mid"]);

        assert!(store.sorted_set_remove("z", "mid").await.unwrap());
        let all = store
            .sorted_set_range_by_score("z", ScoreRange::all())
            .await
            .unwrap();
        assert_eq!(all, vec!["old", "new"]);
    }

    #[tokio::test]
    async fn test_sets_and_scan() {
        let store = InMemoryCacheStore::new();
        assert!(store.set_add("s", "x").await.unwrap());
        assert!(!store.set_add("s", "x").await.unwrap());
        assert_eq!(store.set_members("s").await.unwrap(), vec!["x"]);
        store.set("extraction:a:h1:s1", "1", None).await.unwrap();
        store.set("extraction:b:h1:s2", "1", None).await.unwrap();
        store.set("extraction:a:h2:s1", "1", None).await.unwrap();
        let keys = store.scan_keys("extraction:*:h1:*", 1000).await.unwrap();
        assert_eq!(keys, vec!["extraction:a:h1:s1", "extraction:b:h1:s2"]);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_call() {
        let store = InMemoryCacheStore::new();
        store.set_available(false);
        assert!(store.ping().await.is_err());
        assert!(store.get("k").await.is_err());
        store.set_available(true);
        assert!(store.ping().await.is_ok());
    }
}
