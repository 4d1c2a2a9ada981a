//! Configuration and error types for n-gram fingerprint extraction.
//!
//! Extraction is a pure function of `(text, config)`. Fingerprints computed at
//! indexing time are only comparable with query fingerprints computed under
//! the same configuration, so every field here is part of the compatibility
//! contract.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of characters per n-gram window.
pub const DEFAULT_WINDOW_SIZE: usize = 3;

/// Default number of characters considered per document.
pub const DEFAULT_MAX_TEXT_CHARS: usize = 600;

/// Default cap on the number of distinct fingerprints kept per document.
pub const DEFAULT_MAX_FINGERPRINTS: usize = 500;

/// Largest accepted `max_fingerprints`; keeps a packed set well inside the
/// attribute blob size limit.
pub const MAX_FINGERPRINTS_LIMIT: usize = 10_000;

/// Tuning knobs for [`crate::extract_with_config`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExtractConfig {
    /// Number of characters per window.
    pub window_size: usize,
    /// Input is truncated to this many characters before normalization.
    pub max_text_chars: usize,
    /// Once this many distinct fingerprints are collected, later n-grams are
    /// dropped (first-found wins).
    pub max_fingerprints: usize,
}

impl ExtractConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn with_max_text_chars(mut self, max_text_chars: usize) -> Self {
        self.max_text_chars = max_text_chars;
        self
    }

    pub fn with_max_fingerprints(mut self, max_fingerprints: usize) -> Self {
        self.max_fingerprints = max_fingerprints;
        self
    }

    /// Validate configuration parameters.
    ///
    /// Extraction itself never fails; a zero window or zero cap simply yields
    /// empty sets. Validation exists for configuration loaded from files,
    /// where such values are almost certainly a mistake.
    pub fn validate(&self) -> Result<(), ExtractConfigError> {
        if self.window_size == 0 {
            return Err(ExtractConfigError::InvalidWindowSize {
                window_size: self.window_size,
            });
        }
        if self.max_text_chars == 0 {
            return Err(ExtractConfigError::InvalidMaxTextChars {
                max_text_chars: self.max_text_chars,
            });
        }
        if self.max_fingerprints == 0 {
            return Err(ExtractConfigError::InvalidMaxFingerprints {
                max_fingerprints: self.max_fingerprints,
            });
        }
        if self.max_fingerprints > MAX_FINGERPRINTS_LIMIT {
            return Err(ExtractConfigError::MaxFingerprintsTooLarge {
                max_fingerprints: self.max_fingerprints,
                limit: MAX_FINGERPRINTS_LIMIT,
            });
        }
        Ok(())
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            max_text_chars: DEFAULT_MAX_TEXT_CHARS,
            max_fingerprints: DEFAULT_MAX_FINGERPRINTS,
        }
    }
}

/// Errors returned by [`ExtractConfig::validate`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractConfigError {
    #[error("invalid config: window_size must be >= 1 (got {window_size})")]
    InvalidWindowSize { window_size: usize },

    #[error("invalid config: max_text_chars must be >= 1 (got {max_text_chars})")]
    InvalidMaxTextChars { max_text_chars: usize },

    #[error("invalid config: max_fingerprints must be >= 1 (got {max_fingerprints})")]
    InvalidMaxFingerprints { max_fingerprints: usize },

    #[error("invalid config: max_fingerprints must be <= {limit} (got {max_fingerprints})")]
    MaxFingerprintsTooLarge { max_fingerprints: usize, limit: usize },
}
