//! Search session state, independent of any runtime.
//!
//! A [`SearchSession`] owns everything one query accumulates: its
//! fingerprints, the deduplicated results, and the time-window cursor. The
//! async driver in [`crate::controller`] feeds it slices; tests can drive it
//! directly.

use chrono::{DateTime, TimeDelta, Utc};
use index::{InvertedIndex, NodeRecord, RankConfig};
use ngram::FingerprintSet;
use serde::{Deserialize, Serialize};

use crate::{FetchConfig, Slice, SliceRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchState {
    /// Waiting for a trigger.
    Idle,
    /// One slice request is outstanding.
    Fetching,
    /// The window slid past the retention horizon. Terminal.
    Exhausted,
}

/// What [`SearchSession::apply_slice`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceOutcome {
    /// Notes the store returned.
    pub nodes: usize,
    /// Matches appended to the results.
    pub added: usize,
    /// Results collected so far.
    pub total: usize,
    /// Whether the slice finished its window and the cursor slid back.
    pub slid: bool,
    /// Request to issue immediately, when the session keeps fetching.
    pub next: Option<SliceRequest>,
    pub state: FetchState,
}

#[derive(Debug, Clone)]
pub struct SearchSession {
    query: FingerprintSet,
    results: Vec<NodeRecord>,
    seen: hashbrown::HashSet<String>,
    /// `(start, end)` of the window being paged; `None` until the store
    /// answers the first request.
    window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    offset: usize,
    state: FetchState,
    horizon: DateTime<Utc>,
    fetch_cfg: FetchConfig,
    rank_cfg: RankConfig,
}

impl SearchSession {
    pub fn new(
        query: FingerprintSet,
        horizon: DateTime<Utc>,
        fetch_cfg: FetchConfig,
        rank_cfg: RankConfig,
    ) -> Self {
        Self {
            query,
            results: Vec::new(),
            seen: hashbrown::HashSet::new(),
            window: None,
            offset: 0,
            state: FetchState::Idle,
            horizon,
            fetch_cfg,
            rank_cfg,
        }
    }

    pub fn query(&self) -> &FingerprintSet {
        &self.query
    }

    /// Matches in the order they were first seen.
    pub fn results(&self) -> &[NodeRecord] {
        &self.results
    }

    pub fn into_results(self) -> Vec<NodeRecord> {
        self.results
    }

    pub fn state(&self) -> FetchState {
        self.state
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == FetchState::Exhausted
    }

    pub fn window(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        self.window
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn horizon(&self) -> DateTime<Utc> {
        self.horizon
    }

    /// Move from `Idle` to `Fetching` and return the request to issue.
    ///
    /// Returns `None` while a request is already outstanding or once the
    /// session is exhausted, so overlapping triggers coalesce.
    pub fn begin_fetch(&mut self) -> Option<SliceRequest> {
        if self.state != FetchState::Idle {
            return None;
        }
        self.state = FetchState::Fetching;
        Some(self.cursor())
    }

    /// Return to `Idle` after a request that produced no slice. The cursor
    /// and the collected results are left as they were, so the next trigger
    /// retries the same request.
    pub fn fail(&mut self) {
        if self.state == FetchState::Fetching {
            self.state = FetchState::Idle;
        }
    }

    /// Index and rank `slice`, append new matches, then advance the cursor.
    ///
    /// With `near_bottom` set the session stays `Fetching` and hands back
    /// the next request, unless the cursor slid past the horizon.
    pub fn apply_slice(&mut self, slice: Slice, near_bottom: bool) -> SliceOutcome {
        let Slice {
            nodes,
            start_time,
            end_time,
            offset,
            full_size,
        } = slice;
        let returned = nodes.len();

        let index = if self.fetch_cfg.parallel_index {
            InvertedIndex::build_parallel(nodes)
        } else {
            InvertedIndex::build(nodes)
        };
        let mut added = 0;
        for matched in index.rank(&self.query, &self.rank_cfg).matches {
            // First sighting wins.
            if self.seen.insert(matched.record.id.clone()) {
                self.results.push(matched.record.clone());
                added += 1;
            }
        }

        // An empty page can never advance the offset, so it ends the window.
        let window_done = returned == 0 || returned + offset >= full_size;
        let slid = if window_done {
            let mut width = end_time - start_time;
            if width <= TimeDelta::zero() {
                width = self.fetch_cfg.fallback_window();
            }
            let new_start = start_time
                .checked_sub_signed(width)
                .unwrap_or(DateTime::<Utc>::MIN_UTC);
            self.window = Some((new_start, start_time));
            self.offset = 0;
            true
        } else {
            self.window = Some((start_time, end_time));
            self.offset = offset + returned;
            false
        };

        // A window that cannot slide any further counts as past the horizon.
        let past_horizon = slid
            && self
                .window
                .is_some_and(|(start, _)| start < self.horizon || start == start_time);
        let next = if past_horizon {
            self.state = FetchState::Exhausted;
            None
        } else if near_bottom {
            self.state = FetchState::Fetching;
            Some(self.cursor())
        } else {
            self.state = FetchState::Idle;
            None
        };

        tracing::debug!(
            nodes = returned,
            added,
            total = self.results.len(),
            offset = self.offset,
            slid,
            state = ?self.state,
            "applied slice"
        );

        SliceOutcome {
            nodes: returned,
            added,
            total: self.results.len(),
            slid,
            next,
            state: self.state,
        }
    }

    fn cursor(&self) -> SliceRequest {
        SliceRequest {
            start_time: self.window.map(|(start, _)| start),
            end_time: self.window.map(|(_, end)| end),
            offset: self.offset,
        }
    }
}
