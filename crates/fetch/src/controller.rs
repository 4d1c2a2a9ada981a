//! Async driver for search sessions.
//!
//! [`FetchController::search`] starts one Tokio task per query. The task owns
//! the only outstanding slice request of its session and races it against the
//! session's [`CancellationToken`]; starting a new query cancels the previous
//! token first, so a superseded session stops before the new one issues its
//! first request.
//!
//! Triggers move the session from `Idle` to `Fetching` under its lock and hand
//! the resulting request to the task, so a trigger that finds the session busy
//! is dropped rather than remembered.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use chrono::Utc;
use index::{NodeRecord, RankConfig};
use ngram::{extract_with_config, ExtractConfig, FingerprintSet};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::metrics::metrics_recorder;
use crate::{
    FetchConfig, FetchError, FetchState, NodeStore, NodeStoreError, SearchSession, SliceRequest,
};

/// Progress notifications for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A slice was indexed and ranked.
    SliceApplied {
        nodes: usize,
        added: usize,
        total: usize,
    },
    /// Fetching paused until the next trigger.
    Idle,
    /// No older notes will be requested.
    Exhausted,
    /// A slice request failed. The session is `Idle` again with its results
    /// intact; it does not retry on its own.
    Failed(FetchError),
}

struct Shared {
    session: Mutex<SearchSession>,
    near_bottom: AtomicBool,
}

impl Shared {
    fn session(&self) -> MutexGuard<'_, SearchSession> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Starts search sessions against one [`NodeStore`].
pub struct FetchController {
    store: Arc<dyn NodeStore>,
    extract_cfg: ExtractConfig,
    rank_cfg: RankConfig,
    fetch_cfg: FetchConfig,
    active: Mutex<Option<CancellationToken>>,
}

impl FetchController {
    pub fn new(store: Arc<dyn NodeStore>) -> Self {
        Self {
            store,
            extract_cfg: ExtractConfig::default(),
            rank_cfg: RankConfig::default(),
            fetch_cfg: FetchConfig::default(),
            active: Mutex::new(None),
        }
    }

    pub fn with_extract_config(mut self, cfg: ExtractConfig) -> Self {
        self.extract_cfg = cfg;
        self
    }

    pub fn with_rank_config(mut self, cfg: RankConfig) -> Self {
        self.rank_cfg = cfg;
        self
    }

    pub fn with_fetch_config(mut self, cfg: FetchConfig) -> Self {
        self.fetch_cfg = cfg;
        self
    }

    pub fn store(&self) -> &Arc<dyn NodeStore> {
        &self.store
    }

    /// Start a session for `query_text`, superseding the previous one.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn search(&self, query_text: &str) -> SearchSessionHandle {
        self.search_fingerprints(extract_with_config(query_text, &self.extract_cfg))
    }

    /// Start a session for already extracted query fingerprints.
    pub fn search_fingerprints(&self, query: FingerprintSet) -> SearchSessionHandle {
        let token = CancellationToken::new();
        if let Some(previous) = self.active_slot().replace(token.clone()) {
            previous.cancel();
        }

        let horizon = self.fetch_cfg.horizon(Utc::now());
        let mut session = SearchSession::new(query, horizon, self.fetch_cfg.clone(), self.rank_cfg);
        let first = session.begin_fetch();
        tracing::debug!(
            query_len = session.query().len(),
            %horizon,
            "starting search session"
        );

        let shared = Arc::new(Shared {
            session: Mutex::new(session),
            near_bottom: AtomicBool::new(false),
        });
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (requests_tx, requests_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_session(
            Arc::clone(&self.store),
            Arc::clone(&shared),
            token.clone(),
            events_tx,
            requests_rx,
            first,
        ));

        SearchSessionHandle {
            shared,
            token,
            events: events_rx,
            requests: requests_tx,
        }
    }

    /// Cancel the current session, if any.
    pub fn cancel_active(&self) {
        if let Some(token) = self.active_slot().take() {
            token.cancel();
        }
    }

    fn active_slot(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Caller's view of a running session. Dropping the handle cancels it.
pub struct SearchSessionHandle {
    shared: Arc<Shared>,
    token: CancellationToken,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    requests: mpsc::UnboundedSender<SliceRequest>,
}

impl SearchSessionHandle {
    /// Snapshot of the matches collected so far, deduplicated by id.
    pub fn results(&self) -> Vec<NodeRecord> {
        self.shared.session().results().to_vec()
    }

    pub fn result_count(&self) -> usize {
        self.shared.session().results().len()
    }

    pub fn state(&self) -> FetchState {
        self.shared.session().state()
    }

    pub fn query(&self) -> FingerprintSet {
        self.shared.session().query().clone()
    }

    /// Ask for one more slice. Ignored unless the session is `Idle`.
    ///
    /// Returns whether a request was issued.
    pub fn load_more(&self) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        let mut session = self.shared.session();
        let Some(request) = session.begin_fetch() else {
            return false;
        };
        if self.requests.send(request).is_err() {
            session.fail();
            return false;
        }
        true
    }

    /// Report whether the user is near the end of the visible results.
    /// Turning it on also requests the next slice.
    pub fn set_near_bottom(&self, near_bottom: bool) {
        self.shared.near_bottom.store(near_bottom, Ordering::Release);
        if near_bottom {
            self.load_more();
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_canceled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Next progress event; `None` once the session has ended.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    /// Wait until the session stops fetching.
    ///
    /// Returns the state it settled in, the failure it reported, or
    /// [`FetchError::Canceled`] when it ended without settling.
    pub async fn settled(&mut self) -> Result<FetchState, FetchError> {
        while let Some(event) = self.events.recv().await {
            match event {
                SessionEvent::SliceApplied { .. } => continue,
                SessionEvent::Idle => return Ok(FetchState::Idle),
                SessionEvent::Exhausted => return Ok(FetchState::Exhausted),
                SessionEvent::Failed(err) => return Err(err),
            }
        }
        Err(FetchError::Canceled)
    }
}

impl Drop for SearchSessionHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn run_session(
    store: Arc<dyn NodeStore>,
    shared: Arc<Shared>,
    token: CancellationToken,
    events: mpsc::UnboundedSender<SessionEvent>,
    mut requests: mpsc::UnboundedReceiver<SliceRequest>,
    first: Option<SliceRequest>,
) {
    let mut pending = first;
    loop {
        let Some(request) = pending.take() else {
            pending = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                request = requests.recv() => match request {
                    Some(request) => Some(request),
                    None => break,
                },
            };
            continue;
        };

        let started = Instant::now();
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            result = store.get_slice(request, token.clone()) => result,
        };
        let latency = started.elapsed();
        if token.is_cancelled() {
            break;
        }

        match result {
            Ok(slice) => {
                let near_bottom = shared.near_bottom.load(Ordering::Acquire);
                let outcome = shared.session().apply_slice(slice, near_bottom);
                if let Some(metrics) = metrics_recorder() {
                    metrics.record_slice(latency, outcome.nodes, outcome.added);
                }
                let _ = events.send(SessionEvent::SliceApplied {
                    nodes: outcome.nodes,
                    added: outcome.added,
                    total: outcome.total,
                });

                match outcome.state {
                    FetchState::Fetching => pending = outcome.next,
                    FetchState::Idle => {
                        let _ = events.send(SessionEvent::Idle);
                    }
                    FetchState::Exhausted => {
                        let _ = events.send(SessionEvent::Exhausted);
                        break;
                    }
                }
            }
            Err(NodeStoreError::Canceled) => {
                // The store gave up on its own; nothing to report.
                tracing::debug!("slice request canceled by store");
                shared.session().fail();
                let _ = events.send(SessionEvent::Idle);
            }
            Err(err) => {
                tracing::warn!(error = %err, latency_ms = latency.as_millis() as u64, "slice request failed");
                shared.session().fail();
                if let Some(metrics) = metrics_recorder() {
                    metrics.record_failure(latency);
                }
                let _ = events.send(SessionEvent::Failed(err.into()));
            }
        }
    }
    tracing::debug!(canceled = token.is_cancelled(), "search session ended");
}
