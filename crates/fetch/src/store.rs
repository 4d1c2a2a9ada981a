//! Remote node-store interface and an in-memory implementation.

use std::sync::RwLock;

use async_trait::async_trait;
use attributes::PackedAttributes;
use chrono::{DateTime, TimeDelta, Utc};
use index::NodeRecord;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::NodeStoreError;

/// Parameters of one slice request. `None` bounds on the first request of a
/// session mean "most recent".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceRequest {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub offset: usize,
}

/// A time-bounded, offset-paginated batch of notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slice {
    pub nodes: Vec<NodeRecord>,
    /// Window the store actually served.
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Offset of `nodes[0]` within the window.
    pub offset: usize,
    /// Total notes in the window.
    pub full_size: usize,
}

/// The remote store a search session pages through.
///
/// Implementations should stop work and return [`NodeStoreError::Canceled`]
/// once `cancel` fires; the session drops the call either way.
#[async_trait]
pub trait NodeStore: Send + Sync {
    async fn get_slice(
        &self,
        request: SliceRequest,
        cancel: CancellationToken,
    ) -> Result<Slice, NodeStoreError>;

    /// Replace the packed attributes of note `id`.
    async fn put_attributes(
        &self,
        id: &str,
        attributes: PackedAttributes,
    ) -> Result<(), NodeStoreError>;
}

pub const DEFAULT_PAGE_SIZE: usize = 50;

/// [`NodeStore`] over a process-local list of notes.
///
/// Windows are half-open, `(start_time, end_time]`, so a note sitting exactly
/// on a window boundary belongs to exactly one of two adjacent windows. An
/// unbounded request ends at the newest note. By default it starts at the
/// earliest representable instant and so covers every stored note; with
/// [`MemoryNodeStore::with_initial_window`] it spans only that width. Pages
/// are ordered newest first.
pub struct MemoryNodeStore {
    nodes: RwLock<Vec<NodeRecord>>,
    page_size: usize,
    initial_window: Option<TimeDelta>,
}

impl Default for MemoryNodeStore {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl MemoryNodeStore {
    pub fn new(page_size: usize) -> Self {
        Self {
            nodes: RwLock::new(Vec::new()),
            page_size: page_size.max(1),
            initial_window: None,
        }
    }

    /// Serve unbounded requests as a window of `width` ending at the newest
    /// note, so a session has to slide back through older windows.
    pub fn with_initial_window(mut self, width: TimeDelta) -> Self {
        self.initial_window = Some(width);
        self
    }

    pub fn with_nodes<I>(page_size: usize, nodes: I) -> Self
    where
        I: IntoIterator<Item = NodeRecord>,
    {
        let store = Self::new(page_size);
        for node in nodes {
            store.upsert(node);
        }
        store
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Insert a note or replace the one with the same id.
    pub fn upsert(&self, node: NodeRecord) {
        let mut nodes = self
            .nodes
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match nodes.iter_mut().find(|existing| existing.id == node.id) {
            Some(existing) => *existing = node,
            None => nodes.push(node),
        }
        // Newest first; ties broken by id for stable pages.
        nodes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
    }

    pub fn get(&self, id: &str) -> Option<NodeRecord> {
        self.read().iter().find(|node| node.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<NodeRecord>> {
        self.nodes
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn slice(&self, request: SliceRequest) -> Slice {
        let nodes = self.read();
        let end_time = request
            .end_time
            .or_else(|| nodes.first().map(|n| n.created_at))
            .unwrap_or_else(Utc::now);
        let start_time = match (request.start_time, self.initial_window) {
            (Some(start), _) => start,
            (None, Some(width)) => end_time
                .checked_sub_signed(width)
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            (None, None) => DateTime::<Utc>::MIN_UTC,
        };

        let window: Vec<&NodeRecord> = nodes
            .iter()
            .filter(|n| n.created_at > start_time && n.created_at <= end_time)
            .collect();
        let page = window
            .iter()
            .skip(request.offset)
            .take(self.page_size)
            .map(|&n| n.clone())
            .collect();

        Slice {
            nodes: page,
            start_time,
            end_time,
            offset: request.offset,
            full_size: window.len(),
        }
    }
}

#[async_trait]
impl NodeStore for MemoryNodeStore {
    async fn get_slice(
        &self,
        request: SliceRequest,
        cancel: CancellationToken,
    ) -> Result<Slice, NodeStoreError> {
        if cancel.is_cancelled() {
            return Err(NodeStoreError::Canceled);
        }
        Ok(self.slice(request))
    }

    async fn put_attributes(
        &self,
        id: &str,
        attributes: PackedAttributes,
    ) -> Result<(), NodeStoreError> {
        let now = Utc::now();
        let node = match self.get(id) {
            Some(existing) => NodeRecord {
                packed_attributes: Some(attributes),
                updated_at: now,
                ..existing
            },
            None => NodeRecord::new(id, now, Some(attributes)),
        };
        self.upsert(node);
        Ok(())
    }
}
