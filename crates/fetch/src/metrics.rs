// Metrics hooks for the `fetch` crate.
//
// Install a global `FetchMetrics` implementation via [`set_fetch_metrics`] and
// every search session reports per-slice latency and match counts. No
// exporter is bundled.
use std::sync::{Arc, RwLock};
use std::time::Duration;

use once_cell::sync::OnceCell;

/// Metrics observer for slice fetches.
pub trait FetchMetrics: Send + Sync {
    /// Record a completed slice.
    ///
    /// `latency` covers the store round trip only, `nodes` is the number of
    /// notes the store returned and `added` the number of new matches
    /// appended to the session results.
    fn record_slice(&self, latency: Duration, nodes: usize, added: usize);

    /// Record a failed slice request. Cancellations are not reported.
    fn record_failure(&self, _latency: Duration) {}
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn FetchMetrics>>> {
    static METRICS: OnceCell<RwLock<Option<Arc<dyn FetchMetrics>>>> = OnceCell::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

pub(crate) fn metrics_recorder() -> Option<Arc<dyn FetchMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

/// Install or clear the global fetch metrics recorder.
pub fn set_fetch_metrics(recorder: Option<Arc<dyn FetchMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}
