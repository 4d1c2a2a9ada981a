//! # Nodescan fetch
//!
//! Pages backward in time through a remote note store, indexing and ranking
//! each slice locally against the query fingerprints.
//!
//! A search session is single-flight: at most one slice request is
//! outstanding, and triggers that arrive while it runs are dropped. Each
//! answer is indexed with [`index::InvertedIndex`], ranked, and the new
//! matches are appended to the session results, deduplicated by id. When a
//! slice finishes its time window the cursor slides back by the window's own
//! width; the session stops once the window passes the retention horizon.
//!
//! ## Layout
//!
//! - [`SearchSession`]: the runtime-free state machine.
//! - [`FetchController`] / [`SearchSessionHandle`]: the Tokio driver, with
//!   cancellation through [`tokio_util::sync::CancellationToken`].
//! - [`NodeStore`]: the remote store interface, with [`MemoryNodeStore`] for
//!   local use.
//! - [`metrics`]: optional per-slice instrumentation.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use chrono::Utc;
//! use fetch::{FetchController, FetchState, MemoryNodeStore};
//! use index::NodeRecord;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let packed = attributes::pack(&ngram::extract("water the plants"), None).unwrap();
//! let store = MemoryNodeStore::with_nodes(20, vec![NodeRecord::new("n1", Utc::now(), Some(packed))]);
//! let controller = FetchController::new(Arc::new(store));
//!
//! let mut handle = controller.search("plants");
//! // One slice covers the whole store, so the session ends right away.
//! assert_eq!(handle.settled().await, Ok(FetchState::Exhausted));
//! assert_eq!(handle.results()[0].id, "n1");
//! # }
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod metrics;
pub mod session;
pub mod store;

pub use crate::config::{
    FetchConfig, FetchConfigError, DEFAULT_FALLBACK_WINDOW_SECS, DEFAULT_RETENTION_DAYS,
};
pub use crate::controller::{FetchController, SearchSessionHandle, SessionEvent};
pub use crate::error::{FetchError, NodeStoreError};
pub use crate::metrics::{set_fetch_metrics, FetchMetrics};
pub use crate::session::{FetchState, SearchSession, SliceOutcome};
pub use crate::store::{MemoryNodeStore, NodeStore, Slice, SliceRequest, DEFAULT_PAGE_SIZE};
