//! # Nodescan fingerprint store
//!
//! A write-through, best-effort cache of `note id -> fingerprint set` kept on
//! the local device, so fingerprints of notes this client authored survive a
//! reload without recomputing them or asking the remote store.
//!
//! The remote node store is the source of truth. Nothing in search depends on
//! this cache being present or complete, so every read path degrades to "fewer
//! entries" instead of failing.
//!
//! ## Layout
//!
//! Entries live in any [`KvBackend`] under two kinds of keys:
//!
//! - `{namespace}:ids`: bincode list of tracked note ids, in insertion order
//! - `{namespace}:entry:{id}`: bincode [`CacheEntry`] for one note
//!
//! ## Example Usage
//!
//! ```
//! use fpstore::{FingerprintStore, StoreConfig};
//!
//! let store = FingerprintStore::new(&StoreConfig::default()).unwrap();
//! store.store_one("note-1", &ngram::extract("call the plumber")).unwrap();
//!
//! let entries = store.load_all().unwrap();
//! assert_eq!(entries.len(), 1);
//! assert_eq!(entries[0].id, "note-1");
//! ```

mod backend;

pub use backend::{BackendConfig, InMemoryBackend, KvBackend};
#[cfg(feature = "backend-redb")]
pub use backend::RedbBackend;

use std::sync::Mutex;

use bincode::config::standard;
use bincode::error::{DecodeError, EncodeError};
use bincode::serde::{decode_from_slice, encode_to_vec};
use chrono::{DateTime, Utc};
use ngram::FingerprintSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default key prefix.
pub const DEFAULT_NAMESPACE: &str = "fingerprints";

/// One cached note.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CacheEntry {
    pub id: String,
    pub fingerprints: FingerprintSet,
    pub last_updated: DateTime<Utc>,
}

/// Store configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: BackendConfig,
    /// Key prefix, so several stores can share one backend.
    pub namespace: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("backend error: {0}")]
    Backend(String),
    #[error("serialization encode error: {0}")]
    Encode(String),
    #[error("serialization decode error: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }
}

impl From<EncodeError> for StoreError {
    fn from(e: EncodeError) -> Self {
        StoreError::Encode(e.to_string())
    }
}

impl From<DecodeError> for StoreError {
    fn from(e: DecodeError) -> Self {
        StoreError::Decode(e.to_string())
    }
}

/// Cache of fingerprint sets keyed by note id.
pub struct FingerprintStore {
    backend: Box<dyn KvBackend>,
    namespace: String,
    /// Serializes read-modify-write of the id list within this handle.
    ids_lock: Mutex<()>,
}

impl FingerprintStore {
    /// Build the configured backend and wrap it.
    pub fn new(cfg: &StoreConfig) -> Result<Self, StoreError> {
        let backend = cfg.backend.build()?;
        Ok(Self::with_backend(cfg.namespace.clone(), backend))
    }

    /// Wrap an existing backend (custom persistence, tests).
    pub fn with_backend(namespace: impl Into<String>, backend: Box<dyn KvBackend>) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
            ids_lock: Mutex::new(()),
        }
    }

    fn ids_key(&self) -> String {
        format!("{}:ids", self.namespace)
    }

    fn entry_key(&self, id: &str) -> String {
        format!("{}:entry:{id}", self.namespace)
    }

    /// Upsert one entry.
    ///
    /// New ids are appended to the tracked list; existing ids are overwritten
    /// in place, so repeating the call is harmless.
    pub fn store_one(&self, id: &str, fingerprints: &FingerprintSet) -> Result<(), StoreError> {
        self.store_all([(id.to_string(), fingerprints.clone())])
    }

    /// Upsert many entries with one id-list update.
    pub fn store_all<I>(&self, entries: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = (String, FingerprintSet)>,
    {
        let now = Utc::now();
        let mut writes = Vec::new();
        let mut ids = Vec::new();
        for (id, fingerprints) in entries {
            let entry = CacheEntry {
                id: id.clone(),
                fingerprints,
                last_updated: now,
            };
            writes.push((self.entry_key(&id), encode_to_vec(&entry, standard())?));
            ids.push(id);
        }
        if writes.is_empty() {
            return Ok(());
        }

        let _guard = self.ids_lock.lock().unwrap_or_else(|p| p.into_inner());
        // Entries first: a reader that sees an id in the list should find it.
        self.backend.batch_set(writes)?;

        let mut tracked = self.read_ids()?;
        let before = tracked.len();
        for id in ids {
            if !tracked.contains(&id) {
                tracked.push(id);
            }
        }
        if tracked.len() != before {
            self.write_ids(&tracked)?;
        }
        tracing::debug!(namespace = %self.namespace, tracked = tracked.len(), "stored fingerprints");
        Ok(())
    }

    /// Load entries for every tracked id.
    ///
    /// Ids whose entry is missing or unreadable are skipped. An unreadable id
    /// list yields no entries rather than an error.
    pub fn load_all(&self) -> Result<Vec<CacheEntry>, StoreError> {
        let ids = match self.read_ids() {
            Ok(ids) => ids,
            Err(StoreError::Decode(err)) => {
                tracing::warn!(namespace = %self.namespace, error = %err, "fingerprint id list unreadable");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err),
        };

        let mut entries = Vec::with_capacity(ids.len());
        for id in &ids {
            match self.get(id) {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => tracing::debug!(id = %id, "tracked id has no cached entry"),
                Err(StoreError::Decode(err)) => {
                    tracing::debug!(id = %id, error = %err, "skipping unreadable cache entry")
                }
                Err(err) => return Err(err),
            }
        }
        Ok(entries)
    }

    /// Fetch a single entry.
    pub fn get(&self, id: &str) -> Result<Option<CacheEntry>, StoreError> {
        match self.backend.get(&self.entry_key(id))? {
            Some(bytes) => {
                let (entry, _): (CacheEntry, usize) = decode_from_slice(&bytes, standard())?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// Forget an entry and drop its id from the tracked list.
    pub fn remove(&self, id: &str) -> Result<(), StoreError> {
        let _guard = self.ids_lock.lock().unwrap_or_else(|p| p.into_inner());
        let mut tracked = self.read_ids()?;
        let before = tracked.len();
        tracked.retain(|tracked_id| tracked_id != id);
        if tracked.len() != before {
            self.write_ids(&tracked)?;
        }
        self.backend.remove(&self.entry_key(id))
    }

    /// Tracked ids in insertion order.
    pub fn ids(&self) -> Result<Vec<String>, StoreError> {
        self.read_ids()
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.backend.flush()
    }

    fn read_ids(&self) -> Result<Vec<String>, StoreError> {
        match self.backend.get(&self.ids_key())? {
            Some(bytes) => {
                let (ids, _): (Vec<String>, usize) = decode_from_slice(&bytes, standard())?;
                Ok(ids)
            }
            None => Ok(Vec::new()),
        }
    }

    fn write_ids(&self, ids: &[String]) -> Result<(), StoreError> {
        let bytes = encode_to_vec(ids, standard())?;
        self.backend.set(&self.ids_key(), &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> FingerprintStore {
        FingerprintStore::with_backend(DEFAULT_NAMESPACE, Box::new(InMemoryBackend::new()))
    }

    fn fps(text: &str) -> FingerprintSet {
        ngram::extract(text)
    }

    #[test]
    fn store_one_is_idempotent() {
        let store = store();
        let set = fps("water the ferns");
        store.store_one("a", &set).unwrap();
        store.store_one("a", &set).unwrap();

        let entries = store.load_all().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "a");
        assert_eq!(entries[0].fingerprints, set);
        assert_eq!(store.ids().unwrap(), vec!["a".to_string()]);
    }

    #[test]
    fn store_one_overwrites_existing_entry() {
        let store = store();
        store.store_one("a", &fps("first draft")).unwrap();
        store.store_one("b", &fps("other note")).unwrap();
        store.store_one("a", &fps("second draft")).unwrap();

        let entries = store.load_all().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "a");
        assert_eq!(entries[0].fingerprints, fps("second draft"));
        assert_eq!(entries[1].id, "b");
    }

    #[test]
    fn store_all_tracks_every_id_once() {
        let store = store();
        store
            .store_all(vec![
                ("x".to_string(), fps("one")),
                ("y".to_string(), fps("two")),
                ("x".to_string(), fps("three")),
            ])
            .unwrap();
        assert_eq!(store.ids().unwrap(), vec!["x".to_string(), "y".to_string()]);
        assert_eq!(store.get("x").unwrap().unwrap().fingerprints, fps("three"));
    }

    #[test]
    fn store_all_empty_is_noop() {
        let store = store();
        store.store_all(Vec::new()).unwrap();
        assert!(store.ids().unwrap().is_empty());
    }

    #[test]
    fn load_all_skips_ids_without_entries() {
        let backend = InMemoryBackend::new();
        let ids = encode_to_vec(vec!["ghost".to_string()], standard()).unwrap();
        backend.set("fingerprints:ids", &ids).unwrap();
        let store = FingerprintStore::with_backend(DEFAULT_NAMESPACE, Box::new(backend));
        store.store_one("real", &fps("real note")).unwrap();

        let entries = store.load_all().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "real");
    }

    #[test]
    fn load_all_skips_corrupt_entries() {
        let store = store();
        store.store_one("good", &fps("good note")).unwrap();
        store.store_one("bad", &fps("bad note")).unwrap();
        store.backend.set("fingerprints:entry:bad", &[0xFF]).unwrap();

        let entries = store.load_all().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "good");
    }

    #[test]
    fn load_all_tolerates_corrupt_id_list() {
        let backend = InMemoryBackend::new();
        backend.set("fingerprints:ids", &[0xFF]).unwrap();
        let store = FingerprintStore::with_backend(DEFAULT_NAMESPACE, Box::new(backend));
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn remove_forgets_entry_and_id() {
        let store = store();
        store.store_one("a", &fps("alpha")).unwrap();
        store.store_one("b", &fps("beta")).unwrap();
        store.remove("a").unwrap();
        store.remove("missing").unwrap();

        assert_eq!(store.ids().unwrap(), vec!["b".to_string()]);
        assert!(store.get("a").unwrap().is_none());
    }

    #[test]
    fn namespaces_do_not_collide() {
        let backend: std::sync::Arc<InMemoryBackend> = std::sync::Arc::new(InMemoryBackend::new());
        let a = FingerprintStore::with_backend("a", Box::new(SharedBackend(backend.clone())));
        let b = FingerprintStore::with_backend("b", Box::new(SharedBackend(backend)));
        a.store_one("n", &fps("from a")).unwrap();
        assert!(b.load_all().unwrap().is_empty());
        assert_eq!(a.load_all().unwrap().len(), 1);
    }

    struct SharedBackend(std::sync::Arc<InMemoryBackend>);

    impl KvBackend for SharedBackend {
        fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
            self.0.get(key)
        }
        fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
            self.0.set(key, value)
        }
        fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.0.remove(key)
        }
    }

    #[cfg(feature = "backend-redb")]
    #[test]
    fn redb_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fp.redb");
        let cfg = StoreConfig::new().with_backend(BackendConfig::redb(path.to_string_lossy()));
        {
            let store = FingerprintStore::new(&cfg).unwrap();
            store.store_one("kept", &fps("persist me")).unwrap();
        }
        let store = FingerprintStore::new(&cfg).unwrap();
        let entries = store.load_all().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].fingerprints, fps("persist me"));
    }
}
