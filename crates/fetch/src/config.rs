use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How far back a search session may page before it stops.
pub const DEFAULT_RETENTION_DAYS: i64 = 365;
/// Width used when the store reports an empty window (`start == end`).
pub const DEFAULT_FALLBACK_WINDOW_SECS: i64 = 7 * 24 * 60 * 60;

/// Windowed fetch policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Notes older than `now - retention_days` are never requested.
    pub retention_days: i64,
    /// Slide width for degenerate windows, in seconds.
    pub fallback_window_secs: i64,
    /// Decode slice attributes on the rayon pool.
    pub parallel_index: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            retention_days: DEFAULT_RETENTION_DAYS,
            fallback_window_secs: DEFAULT_FALLBACK_WINDOW_SECS,
            parallel_index: false,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchConfigError {
    #[error("retention_days must be >= 0 (got {0})")]
    InvalidRetention(i64),
    #[error("fallback_window_secs must be > 0 (got {0})")]
    InvalidFallbackWindow(i64),
}

impl FetchConfig {
    pub fn with_retention_days(mut self, days: i64) -> Self {
        self.retention_days = days;
        self
    }

    pub fn with_fallback_window_secs(mut self, secs: i64) -> Self {
        self.fallback_window_secs = secs;
        self
    }

    pub fn with_parallel_index(mut self, enabled: bool) -> Self {
        self.parallel_index = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), FetchConfigError> {
        if self.retention_days < 0 {
            return Err(FetchConfigError::InvalidRetention(self.retention_days));
        }
        if self.fallback_window_secs <= 0 {
            return Err(FetchConfigError::InvalidFallbackWindow(
                self.fallback_window_secs,
            ));
        }
        Ok(())
    }

    /// Oldest instant a session started at `now` may reach.
    pub fn horizon(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        TimeDelta::try_days(self.retention_days)
            .and_then(|retention| now.checked_sub_signed(retention))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn fallback_window(&self) -> TimeDelta {
        TimeDelta::try_seconds(self.fallback_window_secs.max(1)).unwrap_or(TimeDelta::MAX)
    }
}
