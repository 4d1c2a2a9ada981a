//! Workspace umbrella crate for Nodescan, approximate search over notes whose
//! bodies the server never sees.
//!
//! Each note is reduced on the client to a set of hashed character n-grams,
//! packed with a random salt and stored next to the note. Searching pages
//! backward through the store, rebuilds a small inverted index per slice and
//! keeps the notes that share nearly all of the query's n-grams.
//!
//! [`Searcher`] ties the components together:
//!
//! - [`Searcher::index_document`]: extract, pack, cache, and hand the packed
//!   attributes to the store.
//! - [`Searcher::search`]: start a windowed search session.
//! - [`Searcher::republish_cached`]: re-pack cached fingerprints with fresh
//!   salt without re-reading note text.

pub mod config;

pub use attributes::{
    AttributeError, Attributes, PackedAttributes, pack, try_unpack, unpack,
};
pub use config::{ConfigLoadError, NodescanConfig};
pub use fetch::{
    FetchConfig, FetchController, FetchError, FetchMetrics, FetchState, MemoryNodeStore,
    NodeStore, NodeStoreError, SearchSession, SearchSessionHandle, SessionEvent, Slice,
    SliceRequest, set_fetch_metrics,
};
pub use fpstore::{
    BackendConfig, CacheEntry, FingerprintStore, InMemoryBackend, KvBackend, StoreConfig,
    StoreError,
};
pub use index::{InvertedIndex, NodeRecord, RankConfig, RankedMatches, rank};
pub use ngram::{
    ExtractConfig, ExtractConfigError, Fingerprint, FingerprintSet, extract, extract_with_config,
    hash_ngram, normalize,
};

use std::sync::Arc;

use thiserror::Error;

/// Errors surfaced by [`Searcher`].
///
/// Cache failures never appear here; they are logged and skipped.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigLoadError),
    #[error("attribute packing failed: {0}")]
    Attributes(#[from] AttributeError),
    #[error("fingerprint cache unavailable: {0}")]
    Cache(#[from] StoreError),
    #[error("node store write failed: {0}")]
    Store(#[from] NodeStoreError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Indexes and searches notes held in a [`NodeStore`].
pub struct Searcher {
    extract_cfg: ExtractConfig,
    cache: FingerprintStore,
    controller: FetchController,
}

impl Searcher {
    /// Build a searcher from a validated configuration.
    ///
    /// Fails only when the configuration is invalid or the cache backend
    /// cannot be opened.
    pub fn new(store: Arc<dyn NodeStore>, config: &NodescanConfig) -> Result<Self, SearchError> {
        config.validate()?;
        let cache = FingerprintStore::new(&config.store)?;
        let controller = FetchController::new(store)
            .with_extract_config(config.extract.clone())
            .with_rank_config(config.rank)
            .with_fetch_config(config.fetch.clone());
        Ok(Self {
            extract_cfg: config.extract.clone(),
            cache,
            controller,
        })
    }

    /// Default configuration over an explicit cache.
    pub fn with_cache(store: Arc<dyn NodeStore>, cache: FingerprintStore) -> Self {
        Self {
            extract_cfg: ExtractConfig::default(),
            cache,
            controller: FetchController::new(store),
        }
    }

    pub fn cache(&self) -> &FingerprintStore {
        &self.cache
    }

    pub fn controller(&self) -> &FetchController {
        &self.controller
    }

    /// Fingerprint `text`, cache the result and write the packed attributes
    /// for `id` to the node store.
    ///
    /// Returns the extracted fingerprints. A cache failure is logged and does
    /// not fail the call.
    pub async fn index_document(
        &self,
        id: &str,
        text: &str,
    ) -> Result<FingerprintSet, SearchError> {
        let fingerprints = extract_with_config(text, &self.extract_cfg);
        let packed = pack(&fingerprints, None)?;

        if let Err(err) = self.cache.store_one(id, &fingerprints) {
            tracing::warn!(id = %id, error = %err, "fingerprint cache write failed");
        }

        self.controller.store().put_attributes(id, packed).await?;
        tracing::debug!(id = %id, fingerprints = fingerprints.len(), "indexed note");
        Ok(fingerprints)
    }

    /// Start a search for `query_text`, canceling the previous one.
    ///
    /// An empty query lists every note, newest first.
    pub fn search(&self, query_text: &str) -> SearchSessionHandle {
        self.controller.search(query_text)
    }

    /// Cached fingerprint sets, or an empty list when the cache is unreadable.
    pub fn cached_fingerprints(&self) -> Vec<CacheEntry> {
        self.cache.load_all().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "fingerprint cache read failed");
            Vec::new()
        })
    }

    /// Re-pack every cached fingerprint set under fresh salt and write it
    /// back to the node store. Returns the number of notes written.
    ///
    /// Stops at the first store failure.
    pub async fn republish_cached(&self) -> Result<usize, SearchError> {
        let entries = self.cached_fingerprints();
        let mut written = 0;
        for entry in &entries {
            let packed = pack(&entry.fingerprints, None)?;
            self.controller.store().put_attributes(&entry.id, packed).await?;
            written += 1;
        }
        tracing::info!(written, "republished cached fingerprints");
        Ok(written)
    }
}
