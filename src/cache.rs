/// Namespaced, size-bounded, TTL-expiring key → value cache.
///
/// One JSON document per namespace, shaped as
///
/// ```text
/// { "<key>": { "value": <T>, "expiresAt": <epoch ms> }, ... }
/// ```
///
/// The cache is hydrated from its `CacheStore` when constructed and written
/// back after every mutation. Storage failures are logged and otherwise
/// ignored: a cache that cannot persist still works for the life of the process.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

pub const DEFAULT_MAX_ENTRIES: usize = 32;
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

// ---------------------------------------------------------------------------
// Persistence hooks
// ---------------------------------------------------------------------------

pub trait CacheStore: Send + Sync {
    fn load(&self, namespace: &str) -> io::Result<Option<String>>;
    fn save(&self, namespace: &str, contents: &str) -> io::Result<()>;
}

/// `<dir>/<namespace>.json`
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStore { dir: dir.into() }
    }

    pub fn path_for(&self, namespace: &str) -> PathBuf {
        self.dir.join(format!("{}.json", namespace))
    }
}

impl CacheStore for FileStore {
    fn load(&self, namespace: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path_for(namespace)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn save(&self, namespace: &str, contents: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(namespace), contents)
    }
}

/// In-process store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw persisted document for `namespace`.
    pub fn snapshot(&self, namespace: &str) -> Option<String> {
        lock(&self.data).get(namespace).cloned()
    }
}

impl CacheStore for MemoryStore {
    fn load(&self, namespace: &str) -> io::Result<Option<String>> {
        Ok(self.snapshot(namespace))
    }

    fn save(&self, namespace: &str, contents: &str) -> io::Result<()> {
        lock(&self.data).insert(namespace.to_string(), contents.to_string());
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry<T> {
    value: T,
    #[serde(rename = "expiresAt")]
    expires_at: i64,
}

pub struct LocalCache<T> {
    namespace: String,
    max_entries: usize,
    ttl: Duration,
    store: Arc<dyn CacheStore>,
    /// Oldest first.
    entries: Mutex<Vec<(String, StoredEntry<T>)>>,
}

impl<T> LocalCache<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    pub fn new(
        namespace: impl Into<String>,
        store: Arc<dyn CacheStore>,
        max_entries: usize,
        ttl: Duration,
    ) -> Self {
        let namespace = namespace.into();
        let entries = hydrate(&namespace, store.as_ref());
        debug!(namespace = %namespace, entries = entries.len(), "cache hydrated");
        LocalCache {
            namespace,
            max_entries: max_entries.max(1),
            ttl,
            store,
            entries: Mutex::new(entries),
        }
    }

    pub fn with_defaults(namespace: impl Into<String>, store: Arc<dyn CacheStore>) -> Self {
        Self::new(namespace, store, DEFAULT_MAX_ENTRIES, DEFAULT_TTL)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn get(&self, key: &str) -> Option<T> {
        self.get_at(key, Utc::now())
    }

    /// Entries at or past their expiry are dropped on read.
    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<T> {
        let mut entries = lock(&self.entries);
        let idx = entries.iter().position(|(k, _)| k == key)?;

        if entries[idx].1.expires_at <= now.timestamp_millis() {
            entries.remove(idx);
            self.persist(&entries);
            debug!(namespace = %self.namespace, key, "cache entry expired");
            return None;
        }
        Some(entries[idx].1.value.clone())
    }

    pub fn set(&self, key: &str, value: T) {
        self.set_at(key, value, Utc::now());
    }

    /// Inserts or refreshes `key` as the newest entry, then evicts the oldest
    /// entries past `max_entries`.
    pub fn set_at(&self, key: &str, value: T, now: DateTime<Utc>) {
        let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = now.timestamp_millis().saturating_add(ttl_ms);

        let mut entries = lock(&self.entries);
        entries.retain(|(k, _)| k != key);
        entries.push((key.to_string(), StoredEntry { value, expires_at }));

        let overflow = entries.len().saturating_sub(self.max_entries);
        if overflow > 0 {
            entries.drain(..overflow);
        }
        self.persist(&entries);
    }

    pub fn clear(&self) {
        let mut entries = lock(&self.entries);
        entries.clear();
        self.persist(&entries);
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys oldest first.
    pub fn keys(&self) -> Vec<String> {
        lock(&self.entries).iter().map(|(k, _)| k.clone()).collect()
    }

    fn persist(&self, entries: &[(String, StoredEntry<T>)]) {
        let mut doc = Map::new();
        for (key, entry) in entries {
            match serde_json::to_value(entry) {
                Ok(v) => {
                    doc.insert(key.clone(), v);
                }
                Err(e) => warn!(namespace = %self.namespace, key = %key, error = %e, "cache entry not serializable"),
            }
        }

        let contents = Value::Object(doc).to_string();
        if let Err(e) = self.store.save(&self.namespace, &contents) {
            warn!(namespace = %self.namespace, error = %e, "failed to persist cache");
        }
    }
}

fn hydrate<T: DeserializeOwned>(namespace: &str, store: &dyn CacheStore) -> Vec<(String, StoredEntry<T>)> {
    let contents = match store.load(namespace) {
        Ok(Some(contents)) => contents,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!(namespace, error = %e, "failed to load cache");
            return Vec::new();
        }
    };

    let doc: Map<String, Value> = match serde_json::from_str(&contents) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(namespace, error = %e, "cache document is corrupt, starting empty");
            return Vec::new();
        }
    };

    let mut entries: Vec<(String, StoredEntry<T>)> = doc
        .into_iter()
        .filter_map(|(key, raw)| match serde_json::from_value(raw) {
            Ok(entry) => Some((key, entry)),
            Err(e) => {
                debug!(namespace, key = %key, error = %e, "skipping unreadable cache entry");
                None
            }
        })
        .collect();
    entries.sort_by_key(|(_, entry)| entry.expires_at);
    entries
}
