//! Content cache
//!
//! Caches Notion-derived payloads so page loads never block on the upstream
//! API once a value exists. A stale hit still returns the cached payload;
//! the caller is expected to refresh in the background and `put` the fresh
//! value. The cache persists to a versioned JSON snapshot on disk so a
//! restarted server starts warm.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// A cached payload with its storage time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub payload: serde_json::Value,
    pub stored_at: DateTime<Utc>,
}

/// Result of a cache lookup
#[derive(Debug, Clone)]
pub struct Lookup {
    pub payload: serde_json::Value,
    /// The entry outlived the TTL; serve it, but refresh soon
    pub stale: bool,
}

/// On-disk snapshot format
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    entries: HashMap<String, CacheEntry>,
}

/// TTL cache for upstream content, keyed by string
pub struct ContentCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    snapshot_path: PathBuf,
}

impl ContentCache {
    /// Current snapshot format version
    const VERSION: u32 = 1;

    /// Create a cache, warming it from the snapshot file when one exists
    pub fn new<P: AsRef<Path>>(ttl_secs: u64, snapshot_path: P) -> Self {
        let snapshot_path = snapshot_path.as_ref().to_path_buf();
        let entries = Self::load_snapshot(&snapshot_path);
        Self {
            entries: RwLock::new(entries),
            ttl: Duration::seconds(ttl_secs as i64),
            snapshot_path,
        }
    }

    /// Load snapshot from disk, tolerating absent or mismatched files
    fn load_snapshot(path: &Path) -> HashMap<String, CacheEntry> {
        if let Ok(content) = fs::read_to_string(path) {
            if let Ok(snapshot) = serde_json::from_str::<Snapshot>(&content) {
                if snapshot.version == Self::VERSION {
                    tracing::debug!("Loaded {} cached entries", snapshot.entries.len());
                    return snapshot.entries;
                }
                tracing::info!("Cache snapshot version mismatch, starting cold");
            }
        }
        HashMap::new()
    }

    /// Look up a key against the current time
    pub fn get(&self, key: &str) -> Option<Lookup> {
        self.get_at(key, Utc::now())
    }

    /// Look up a key against an explicit time
    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<Lookup> {
        let entries = self.entries.read().expect("cache lock poisoned");
        entries.get(key).map(|entry| Lookup {
            payload: entry.payload.clone(),
            stale: now - entry.stored_at > self.ttl,
        })
    }

    /// Store a payload under a key, stamped with the current time
    pub fn put(&self, key: &str, payload: serde_json::Value) {
        self.put_at(key, payload, Utc::now());
    }

    /// Store a payload under a key with an explicit timestamp
    pub fn put_at(&self, key: &str, payload: serde_json::Value, now: DateTime<Utc>) {
        let mut entries = self.entries.write().expect("cache lock poisoned");
        entries.insert(
            key.to_string(),
            CacheEntry {
                payload,
                stored_at: now,
            },
        );
    }

    /// Write the snapshot to disk
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.snapshot_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let entries = self.entries.read().expect("cache lock poisoned");
        let snapshot = Snapshot {
            version: Self::VERSION,
            entries: entries.clone(),
        };
        let content = serde_json::to_string_pretty(&snapshot)?;
        fs::write(&self.snapshot_path, content)?;
        Ok(())
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.read().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_miss_then_hit() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ContentCache::new(3600, dir.path().join("db.json"));

        assert!(cache.get_at("posts", fixed_time(0)).is_none());

        cache.put_at("posts", serde_json::json!(["a", "b"]), fixed_time(0));
        let hit = cache.get_at("posts", fixed_time(10)).unwrap();
        assert!(!hit.stale);
        assert_eq!(hit.payload, serde_json::json!(["a", "b"]));
    }

    #[test]
    fn test_stale_after_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ContentCache::new(3600, dir.path().join("db.json"));

        cache.put_at("posts", serde_json::json!([]), fixed_time(0));

        // one second before the ttl boundary
        assert!(!cache.get_at("posts", fixed_time(3599)).unwrap().stale);
        // just past it
        assert!(cache.get_at("posts", fixed_time(3601)).unwrap().stale);
    }

    #[test]
    fn test_put_resets_staleness() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ContentCache::new(3600, dir.path().join("db.json"));

        cache.put_at("k", serde_json::json!(1), fixed_time(0));
        assert!(cache.get_at("k", fixed_time(4000)).unwrap().stale);

        cache.put_at("k", serde_json::json!(2), fixed_time(4000));
        let hit = cache.get_at("k", fixed_time(4100)).unwrap();
        assert!(!hit.stale);
        assert_eq!(hit.payload, serde_json::json!(2));
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("db.json");

        let cache = ContentCache::new(3600, &path);
        cache.put_at("k", serde_json::json!({"v": 1}), fixed_time(100));
        cache.save().unwrap();

        let warmed = ContentCache::new(3600, &path);
        let hit = warmed.get_at("k", fixed_time(200)).unwrap();
        assert!(!hit.stale);
        assert_eq!(hit.payload, serde_json::json!({"v": 1}));
    }

    #[test]
    fn test_bad_snapshot_starts_cold() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        fs::write(&path, "not json").unwrap();

        let cache = ContentCache::new(3600, &path);
        assert!(cache.is_empty());
    }
}
