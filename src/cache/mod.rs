//! Time-bounded cache of research results.
//!
//! Entries are keyed by a SHA-256 over the normalized topic and the requested
//! count. Reads fail open: anything that goes wrong while reading is a miss.
//! Expired entries are deleted when they are read.

pub mod backend;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{KeywordCandidate, Source, Topic};
pub use backend::{CacheBackend, FileBackend, MemoryBackend};

pub const DEFAULT_TTL_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("cache read failed for {key}: {message}")]
    Read { key: String, message: String },

    #[error("cache write failed for {key}: {message}")]
    Write { key: String, message: String },

    #[error("cache entry {key} is corrupt: {message}")]
    Decode { key: String, message: String },

    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub created_at: DateTime<Utc>,

    pub topic: String,

    pub count: usize,

    pub source: Source,

    pub candidates: Vec<KeywordCandidate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheHit {
    pub candidates: Vec<KeywordCandidate>,

    pub source: Source,

    pub age: Duration,
}

impl CacheHit {
    #[must_use]
    pub fn age_days(&self) -> i64 {
        self.age.num_days()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    Hit(CacheHit),
    Miss,
    /// The entry was older than the TTL and has been dropped.
    Expired { age: Duration },
    /// Read or decode failed; treated as a miss.
    Failed(CacheError),
}

impl CacheLookup {
    #[must_use]
    pub fn into_hit(self) -> Option<CacheHit> {
        match self {
            Self::Hit(hit) => Some(hit),
            _ => None,
        }
    }
}

/// Stable hex key for a (topic, count) pair.
#[must_use]
pub fn cache_key(topic: &Topic, count: usize) -> String {
    let digest = Sha256::digest(format!("{}_{count}", topic.as_str()).as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(&mut out, "{byte:02x}");
    }
    out
}

pub struct CacheStore {
    backend: Box<dyn CacheBackend>,
    ttl: Duration,
}

impl CacheStore {
    #[must_use]
    pub fn new(backend: Box<dyn CacheBackend>) -> Self {
        Self::with_ttl(backend, Duration::days(DEFAULT_TTL_DAYS))
    }

    #[must_use]
    pub fn with_ttl(backend: Box<dyn CacheBackend>, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    #[must_use]
    pub fn get(&self, topic: &Topic, count: usize) -> Option<CacheHit> {
        self.lookup_at(topic, count, Utc::now()).into_hit()
    }

    #[must_use]
    pub fn lookup(&self, topic: &Topic, count: usize) -> CacheLookup {
        self.lookup_at(topic, count, Utc::now())
    }

    #[must_use]
    pub fn lookup_at(&self, topic: &Topic, count: usize, now: DateTime<Utc>) -> CacheLookup {
        let key = cache_key(topic, count);

        let bytes = match self.backend.read(&key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return CacheLookup::Miss,
            Err(e) => {
                warn!(error = %e, "Cache read failed, will fetch fresh data");
                return CacheLookup::Failed(e);
            }
        };

        let entry: CacheEntry = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key = %key, error = %e, "Dropping corrupt cache entry");
                let _ = self.backend.remove(&key);
                return CacheLookup::Failed(CacheError::Decode {
                    key,
                    message: e.to_string(),
                });
            }
        };

        if entry.topic != topic.as_str() || entry.count != count {
            return CacheLookup::Miss;
        }

        let age = (now - entry.created_at).max(Duration::zero());
        if age > self.ttl {
            debug!(key = %key, age_days = age.num_days(), "Cache entry expired");
            if let Err(e) = self.backend.remove(&key) {
                warn!(error = %e, "Failed to delete expired cache entry");
            }
            return CacheLookup::Expired { age };
        }

        debug!(topic = %topic, age_days = age.num_days(), "Cache hit");
        CacheLookup::Hit(CacheHit {
            candidates: entry.candidates,
            source: entry.source,
            age,
        })
    }

    pub fn put(
        &self,
        topic: &Topic,
        count: usize,
        candidates: &[KeywordCandidate],
        source: Source,
    ) -> Result<(), CacheError> {
        self.put_at(topic, count, candidates, source, Utc::now())
    }

    pub fn put_at(
        &self,
        topic: &Topic,
        count: usize,
        candidates: &[KeywordCandidate],
        source: Source,
        created_at: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        let key = cache_key(topic, count);
        let entry = CacheEntry {
            created_at,
            topic: topic.as_str().to_string(),
            count,
            source,
            candidates: candidates.to_vec(),
        };

        let bytes = serde_json::to_vec_pretty(&entry).map_err(|e| CacheError::Write {
            key: key.clone(),
            message: e.to_string(),
        })?;

        self.backend.write(&key, &bytes)?;
        debug!(topic = %topic, backend = self.backend.name(), "Cached results");
        Ok(())
    }

    /// Deletes every expired or unreadable entry, returning how many went.
    pub fn prune_expired(&self, now: DateTime<Utc>) -> Result<usize, CacheError> {
        let mut removed = 0;

        for key in self.backend.keys()? {
            let stale = match self.backend.read(&key) {
                Ok(Some(bytes)) => serde_json::from_slice::<CacheEntry>(&bytes)
                    .map_or(true, |entry| now - entry.created_at > self.ttl),
                Ok(None) => false,
                Err(_) => true,
            };

            if stale {
                self.backend.remove(&key)?;
                removed += 1;
            }
        }

        Ok(removed)
    }

    pub fn clear(&self) -> Result<usize, CacheError> {
        let keys = self.backend.keys()?;
        for key in &keys {
            self.backend.remove(key)?;
        }
        Ok(keys.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic(raw: &str) -> Topic {
        Topic::parse(raw).unwrap()
    }

    fn candidate(phrase: &str) -> KeywordCandidate {
        KeywordCandidate {
            phrase: phrase.to_string(),
            search_volume: 1000,
            difficulty: 40,
            relevance: 80,
            related: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            source: Source::Provider,
        }
    }

    #[test]
    fn test_cache_key_is_stable_and_normalized() {
        let a = cache_key(&topic("Email Marketing"), 3);
        let b = cache_key(&topic("  email   marketing"), 3);
        let c = cache_key(&topic("email marketing"), 4);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_put_then_get() {
        let store = CacheStore::new(Box::new(MemoryBackend::new()));
        let t = topic("email marketing");
        let candidates = vec![candidate("email marketing")];

        assert!(store.get(&t, 1).is_none());
        store.put(&t, 1, &candidates, Source::Provider).unwrap();

        let hit = store.get(&t, 1).unwrap();
        assert_eq!(hit.candidates, candidates);
        assert_eq!(hit.source, Source::Provider);
        assert_eq!(hit.age_days(), 0);
    }

    #[test]
    fn test_count_is_part_of_key() {
        let store = CacheStore::new(Box::new(MemoryBackend::new()));
        let t = topic("seo");
        store
            .put(&t, 1, &[candidate("seo")], Source::Provider)
            .unwrap();

        assert!(store.get(&t, 2).is_none());
    }

    #[test]
    fn test_expired_entry_is_deleted_on_read() {
        let backend = MemoryBackend::new();
        let store = CacheStore::new(Box::new(backend.clone()));
        let t = topic("seo");
        let created = Utc::now() - Duration::days(31);

        store
            .put_at(&t, 1, &[candidate("seo")], Source::Provider, created)
            .unwrap();
        assert_eq!(backend.len(), 1);

        let lookup = store.lookup(&t, 1);
        assert!(matches!(lookup, CacheLookup::Expired { .. }));
        assert!(backend.is_empty());
        assert!(store.get(&t, 1).is_none());
    }

    #[test]
    fn test_entry_inside_ttl_reports_age() {
        let store = CacheStore::new(Box::new(MemoryBackend::new()));
        let t = topic("seo");
        let created = Utc::now() - Duration::days(29);

        store
            .put_at(&t, 1, &[candidate("seo")], Source::Heuristic, created)
            .unwrap();

        let hit = store.get(&t, 1).unwrap();
        assert_eq!(hit.age_days(), 29);
        assert_eq!(hit.source, Source::Heuristic);
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() {
        let backend = MemoryBackend::new();
        let store = CacheStore::new(Box::new(backend.clone()));
        let t = topic("seo");

        backend.write(&cache_key(&t, 1), b"{ not json").unwrap();

        assert!(matches!(
            store.lookup(&t, 1),
            CacheLookup::Failed(CacheError::Decode { .. })
        ));
        assert!(backend.is_empty());
    }

    struct BrokenBackend;

    impl CacheBackend for BrokenBackend {
        fn read(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
            Err(CacheError::Read {
                key: key.to_string(),
                message: "disk on fire".to_string(),
            })
        }

        fn write(&self, key: &str, _bytes: &[u8]) -> Result<(), CacheError> {
            Err(CacheError::Write {
                key: key.to_string(),
                message: "read-only".to_string(),
            })
        }

        fn remove(&self, _key: &str) -> Result<(), CacheError> {
            Ok(())
        }

        fn keys(&self) -> Result<Vec<String>, CacheError> {
            Ok(Vec::new())
        }

        fn name(&self) -> &'static str {
            "broken"
        }
    }

    #[test]
    fn test_read_errors_fail_open() {
        let store = CacheStore::new(Box::new(BrokenBackend));
        let t = topic("seo");

        assert!(store.get(&t, 1).is_none());
        assert!(store.put(&t, 1, &[], Source::Heuristic).is_err());
    }

    #[test]
    fn test_prune_and_clear() {
        let backend = MemoryBackend::new();
        let store = CacheStore::new(Box::new(backend.clone()));
        let now = Utc::now();

        store
            .put_at(&topic("old"), 1, &[], Source::Provider, now - Duration::days(40))
            .unwrap();
        store
            .put_at(&topic("new"), 1, &[], Source::Provider, now)
            .unwrap();
        backend.write("garbage", b"nope").unwrap();

        assert_eq!(store.prune_expired(now).unwrap(), 2);
        assert_eq!(backend.len(), 1);

        assert_eq!(store.clear().unwrap(), 1);
        assert!(backend.is_empty());
    }

    #[test]
    fn test_file_backed_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(Box::new(FileBackend::new(dir.path().to_path_buf())));
        let t = topic("healthy boundaries");

        store
            .put(&t, 2, &[candidate("healthy boundaries")], Source::Provider)
            .unwrap();

        let reopened = CacheStore::new(Box::new(FileBackend::new(dir.path().to_path_buf())));
        let hit = reopened.get(&t, 2).unwrap();
        assert_eq!(hit.candidates[0].phrase, "healthy boundaries");
    }
}
