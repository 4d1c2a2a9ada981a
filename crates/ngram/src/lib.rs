//! # Nodescan n-gram fingerprints
//!
//! Turns short free text into a bounded set of hashed character n-grams. The
//! same function runs when a note is indexed and when a query is typed, and
//! approximate matching works purely by comparing the two sets.
//!
//! ## Contract
//!
//! - The API is a pure function of `(text, config)`: no I/O, no clocks, no
//!   global mutable state. Concurrent callers never interfere.
//! - For the same text and the same [`ExtractConfig`], the output is identical
//!   across runs and platforms.
//! - There are no error cases. Empty or very short text yields an empty set.
//!
//! ## Pipeline
//!
//! 1.  **Normalize** (see [`normalize`]): truncate, drop newlines and
//!     markdown link targets, strip punctuation, collapse whitespace,
//!     lower-case.
//! 2.  **Window**: pad with one space on each side and slide a window of
//!     `window_size` characters across the result.
//! 3.  **Hash**: each window is hashed to 32 bits with xxh32 under a fixed
//!     seed. Collisions are accepted.
//! 4.  **Cap**: distinct fingerprints are kept in first-seen order until
//!     `max_fingerprints` is reached; later n-grams are dropped.
//!
//! ## Example Usage
//!
//! ```
//! use ngram::{extract, ngrams, ExtractConfig};
//!
//! let grams = ngrams("Me too!", &ExtractConfig::default());
//! assert_eq!(grams, vec![" me", "me ", "e t", " to", "too", "oo "]);
//!
//! let fingerprints = extract("Me too!");
//! assert_eq!(fingerprints.len(), 6);
//! ```

pub mod config;
pub mod fingerprint;
mod normalize;
mod shingles;

pub use crate::config::{
    ExtractConfig, ExtractConfigError, DEFAULT_MAX_FINGERPRINTS, DEFAULT_MAX_TEXT_CHARS,
    DEFAULT_WINDOW_SIZE, MAX_FINGERPRINTS_LIMIT,
};
pub use crate::fingerprint::{Fingerprint, FingerprintSet};
pub use crate::normalize::normalize;
pub use crate::shingles::{hash_ngram, FINGERPRINT_SEED};

use crate::shingles::{char_windows, pad};

/// Extract fingerprints with the default configuration.
pub fn extract(text: &str) -> FingerprintSet {
    extract_with_config(text, &ExtractConfig::default())
}

/// Extract fingerprints from `text` under `cfg`.
pub fn extract_with_config(text: &str, cfg: &ExtractConfig) -> FingerprintSet {
    let normalized = normalize(text, cfg);
    if normalized.is_empty() || cfg.max_fingerprints == 0 {
        return FingerprintSet::new();
    }
    let padded = pad(&normalized);

    let mut seen = hashbrown::HashSet::with_capacity(cfg.max_fingerprints);
    let mut values = Vec::with_capacity(cfg.max_fingerprints.min(padded.len()));
    for gram in char_windows(&padded, cfg.window_size) {
        let fp = hash_ngram(gram);
        if seen.insert(fp) {
            values.push(fp);
            if values.len() == cfg.max_fingerprints {
                break;
            }
        }
    }
    FingerprintSet::from_distinct(values)
}

/// The raw n-gram strings `extract_with_config` would hash, in order and with
/// repeats.
///
/// Useful for debugging and for explaining a match; not bounded by
/// `max_fingerprints`.
pub fn ngrams(text: &str, cfg: &ExtractConfig) -> Vec<String> {
    let normalized = normalize(text, cfg);
    if normalized.is_empty() {
        return Vec::new();
    }
    let padded = pad(&normalized);
    char_windows(&padded, cfg.window_size)
        .map(str::to_owned)
        .collect()
}
