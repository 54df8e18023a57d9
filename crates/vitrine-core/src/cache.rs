//! Persistent resolution hint cache.
//!
//! Maps a nominal URL to the last known outcome of resolving it. The whole
//! cache lives under a single versioned key in a [`KeyValueStore`] as a JSON
//! object of `url -> entry`. Only resolved entries are ever written back;
//! pending and failed entries exist for the current session only.
//!
//! Entries older than the TTL are dropped when the cache is opened, and
//! resolved or failed entries are also expired lazily on lookup.

use crate::storage::{KeyValueStore, MemoryStore};
use crate::types::{CacheEntry, ResolutionStatus};
use crate::Result;
use chrono::Utc;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

/// Entry counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Entries with a known working URL.
    pub resolved: usize,
    /// Entries with a probe sequence queued or running.
    pub pending: usize,
    /// Entries whose every candidate failed.
    pub failed: usize,
    /// All entries.
    pub total: usize,
}

/// In-memory view of the hint cache, mirrored to a store on demand.
pub struct PersistentCache {
    store: Arc<dyn KeyValueStore>,
    key: String,
    ttl_ms: i64,
    entries: Mutex<HashMap<String, CacheEntry>>,
    /// Held from snapshot to store write so snapshots land in order.
    flush: Mutex<()>,
}

impl std::fmt::Debug for PersistentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentCache")
            .field("key", &self.key)
            .field("ttl_ms", &self.ttl_ms)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl PersistentCache {
    /// Load the cache stored under `key`.
    ///
    /// Expired and non-resolved entries are discarded. A value that cannot be
    /// parsed is logged and treated as empty; only a store that cannot be read
    /// at all is an error.
    pub fn open(store: Arc<dyn KeyValueStore>, key: impl Into<String>, ttl: Duration) -> Result<Self> {
        let key = key.into();
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let now = Utc::now().timestamp_millis();

        let mut entries = HashMap::new();
        if let Some(raw) = store.get(&key)? {
            match serde_json::from_str::<HashMap<String, CacheEntry>>(&raw) {
                Ok(stored) => {
                    let total = stored.len();
                    entries.extend(stored.into_iter().filter(|(_, entry)| {
                        entry.status == ResolutionStatus::Resolved
                            && !entry.is_expired(now, ttl_ms)
                    }));
                    debug!(
                        key = %key,
                        loaded = entries.len(),
                        dropped = total - entries.len(),
                        "Loaded resolution cache"
                    );
                },
                Err(e) => warn!(key = %key, "Ignoring unreadable resolution cache: {e}"),
            }
        }

        Ok(Self {
            store,
            key,
            ttl_ms,
            entries: Mutex::new(entries),
            flush: Mutex::new(()),
        })
    }

    /// A cache backed by a fresh [`MemoryStore`].
    #[must_use]
    pub fn in_memory(ttl: Duration) -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            key: "memory_cache".to_string(),
            ttl_ms: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
            entries: Mutex::new(HashMap::new()),
            flush: Mutex::new(()),
        }
    }

    /// Storage key the cache is persisted under.
    #[must_use]
    pub fn storage_key(&self) -> &str {
        &self.key
    }

    /// Current entry for `url`, if any and not expired.
    ///
    /// Pending entries never expire here; they are owned by an in-flight
    /// resolution that will overwrite them.
    pub fn get(&self, url: &str) -> Option<CacheEntry> {
        let mut entries = self.lock();
        let entry = entries.get(url)?;
        if entry.status != ResolutionStatus::Pending
            && entry.is_expired(Utc::now().timestamp_millis(), self.ttl_ms)
        {
            debug!(url, "Expired resolution cache entry");
            entries.remove(url);
            return None;
        }
        Some(entry.clone())
    }

    /// Insert or replace the entry for `url`.
    pub fn put(&self, url: &str, entry: CacheEntry) {
        self.lock().insert(url.to_string(), entry);
    }

    /// Drop the entry for `url` from memory.
    pub fn remove(&self, url: &str) -> Option<CacheEntry> {
        self.lock().remove(url)
    }

    /// Write every resolved entry to the store.
    ///
    /// Concurrent flushes are serialized, so the last write always carries the
    /// newest snapshot.
    pub fn flush_to_storage(&self) -> Result<()> {
        let _flush = self.flush.lock().unwrap_or_else(PoisonError::into_inner);
        let snapshot: BTreeMap<String, CacheEntry> = self
            .lock()
            .iter()
            .filter(|(_, entry)| entry.status == ResolutionStatus::Resolved)
            .map(|(url, entry)| (url.clone(), entry.clone()))
            .collect();
        let json = serde_json::to_string(&snapshot)?;
        self.store.set(&self.key, &json)?;
        debug!(key = %self.key, entries = snapshot.len(), "Persisted resolution cache");
        Ok(())
    }

    /// Forget every entry, in memory and in the store.
    pub fn clear(&self) -> Result<()> {
        let _flush = self.flush.lock().unwrap_or_else(PoisonError::into_inner);
        self.lock().clear();
        self.store.remove(&self.key)
    }

    /// Entry counts by status.
    pub fn stats(&self) -> CacheStats {
        let entries = self.lock();
        let mut stats = CacheStats {
            total: entries.len(),
            ..CacheStats::default()
        };
        for entry in entries.values() {
            match entry.status {
                ResolutionStatus::Resolved => stats.resolved += 1,
                ResolutionStatus::Pending => stats.pending += 1,
                ResolutionStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }

    /// Number of entries held in memory.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::FileStore;
    use tempfile::TempDir;

    const WEEK: Duration = Duration::from_secs(7 * 24 * 3600);

    #[test]
    fn test_only_resolved_entries_are_persisted() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let cache = PersistentCache::open(store.clone(), "image_cache_v1", WEEK).unwrap();

        cache.put("/a.jpg", CacheEntry::resolved("/a.webp".into(), 5));
        cache.put("/b.jpg", CacheEntry::failed("/b.jpg", 5));
        cache.put("/c.jpg", CacheEntry::pending("/c.jpg", 5));
        cache.flush_to_storage().unwrap();

        let raw = store.get("image_cache_v1").unwrap().unwrap();
        let stored: HashMap<String, CacheEntry> = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored["/a.jpg"].resolved_url, "/a.webp");
    }

    #[test]
    fn test_reopen_restores_resolved_entries() {
        let temp = TempDir::new().unwrap();
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(temp.path().to_path_buf()).unwrap());

        let cache = PersistentCache::open(store.clone(), "image_cache_v1", WEEK).unwrap();
        cache.put("/a.jpg", CacheEntry::resolved("/a.webp".into(), 7));
        cache.flush_to_storage().unwrap();
        drop(cache);

        let reopened = PersistentCache::open(store, "image_cache_v1", WEEK).unwrap();
        let entry = reopened.get("/a.jpg").unwrap();
        assert_eq!(entry.status, ResolutionStatus::Resolved);
        assert_eq!(entry.resolved_url, "/a.webp");
        assert_eq!(entry.priority, 7);
    }

    #[test]
    fn test_expired_entries_dropped_on_open() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut stale = CacheEntry::resolved("/old.webp".into(), 5);
        stale.timestamp -= 8 * 24 * 3600 * 1000;
        let fresh = CacheEntry::resolved("/new.webp".into(), 5);
        let json = serde_json::json!({ "/old.jpg": stale, "/new.jpg": fresh });
        store.set("image_cache_v1", &json.to_string()).unwrap();

        let cache = PersistentCache::open(store, "image_cache_v1", WEEK).unwrap();
        assert!(cache.get("/old.jpg").is_none());
        assert_eq!(cache.get("/new.jpg").unwrap().resolved_url, "/new.webp");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_lookup_expires_stale_entries() {
        let cache = PersistentCache::in_memory(WEEK);
        let mut entry = CacheEntry::failed("/x.jpg", 5);
        entry.timestamp -= 7 * 24 * 3600 * 1000;
        cache.put("/x.jpg", entry);

        assert!(cache.get("/x.jpg").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_corrupt_value_starts_empty() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        store.set("image_cache_v1", "{not json").unwrap();

        let cache = PersistentCache::open(store, "image_cache_v1", WEEK).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear_empties_memory_and_store() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let cache = PersistentCache::open(store.clone(), "video_cache_v1", WEEK).unwrap();
        cache.put("/v.mp4", CacheEntry::resolved("/v.mp4".into(), 5));
        cache.flush_to_storage().unwrap();

        cache.clear().unwrap();
        assert!(cache.is_empty());
        assert_eq!(store.get("video_cache_v1").unwrap(), None);
    }

    #[test]
    fn test_concurrent_flushes_keep_every_resolved_entry() {
        let temp = TempDir::new().unwrap();
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(temp.path().to_path_buf()).unwrap());
        let cache = PersistentCache::open(store.clone(), "image_cache_v1", WEEK).unwrap();

        std::thread::scope(|scope| {
            for worker in 0..16 {
                let cache = &cache;
                scope.spawn(move || {
                    for n in 0..50 {
                        let url = format!("/w{worker}-{n}.jpg");
                        cache.put(&url, CacheEntry::resolved(url.replace(".jpg", ".webp"), 5));
                        cache.flush_to_storage().unwrap();
                    }
                });
            }
        });

        let raw = store.get("image_cache_v1").unwrap().unwrap();
        let stored: HashMap<String, CacheEntry> = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored.len(), 16 * 50);
        assert_eq!(stored["/w3-17.jpg"].resolved_url, "/w3-17.webp");
    }

    #[test]
    fn test_stats_by_status() {
        let cache = PersistentCache::in_memory(WEEK);
        cache.put("/a", CacheEntry::resolved("/a".into(), 1));
        cache.put("/b", CacheEntry::resolved("/b".into(), 1));
        cache.put("/c", CacheEntry::pending("/c", 1));
        cache.put("/d", CacheEntry::failed("/d", 1));

        assert_eq!(
            cache.stats(),
            CacheStats {
                resolved: 2,
                pending: 1,
                failed: 1,
                total: 4
            }
        );
    }
}
