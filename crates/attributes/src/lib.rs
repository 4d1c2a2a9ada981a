//! # Nodescan packed attributes
//!
//! A note's fingerprint set travels to the remote node store inside an opaque,
//! transport-safe string attached to the note record. This crate owns that
//! string's layout.
//!
//! ## Layout
//!
//! ```text
//! base64url_nopad( bincode_standard( salt: u64, fingerprints: [u32], extra: json_bytes ) )
//! ```
//!
//! The layout carries no version tag and must never change: every blob ever
//! stored has to keep decoding. New data goes into `extra`, which is free-form
//! JSON.
//!
//! Every call to [`pack`] draws a fresh random salt, so two notes with the same
//! fingerprints still produce different blobs.
//!
//! Envelopes are capped at [`MAX_ENVELOPE_BYTES`] before base64. [`pack`]
//! refuses anything larger, so every blob it returns unpacks again. The
//! extractor's own cap, `ngram::MAX_FINGERPRINTS_LIMIT`, stays well inside it.
//!
//! ## Example Usage
//!
//! ```
//! use attributes::{pack, unpack};
//!
//! let fingerprints = ngram::extract("Buy oat milk");
//! let blob = pack(&fingerprints, None).unwrap();
//! let attrs = unpack(blob.as_str());
//! assert_eq!(attrs.fingerprints, fingerprints);
//!
//! // Corrupt input never fails, it just carries nothing.
//! assert!(unpack("not a blob").is_empty());
//! ```

mod envelope;

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use ngram::FingerprintSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::envelope::{decode_envelope, encode_envelope, Envelope};
pub use crate::envelope::MAX_ENVELOPE_BYTES;

/// Encoded attribute blob as stored next to a note record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackedAttributes(String);

impl PackedAttributes {
    /// Wrap a blob received from the node store.
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for PackedAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PackedAttributes {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Decoded contents of a [`PackedAttributes`] blob.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    pub fingerprints: FingerprintSet,
    /// Caller-supplied extra data; `Value::Null` when none was packed.
    pub extra: Value,
}

impl Attributes {
    /// True when the blob contributed no fingerprints.
    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttributeError {
    #[error("attribute blob is not valid base64: {0}")]
    Base64(String),
    #[error("attribute encode error: {0}")]
    Encode(String),
    #[error("attribute decode error: {0}")]
    Decode(String),
    #[error("attribute blob has {trailing} trailing bytes")]
    TrailingBytes { trailing: usize },
}

impl From<base64::DecodeError> for AttributeError {
    fn from(e: base64::DecodeError) -> Self {
        AttributeError::Base64(e.to_string())
    }
}

impl From<bincode::error::EncodeError> for AttributeError {
    fn from(e: bincode::error::EncodeError) -> Self {
        AttributeError::Encode(e.to_string())
    }
}

impl From<bincode::error::DecodeError> for AttributeError {
    fn from(e: bincode::error::DecodeError) -> Self {
        AttributeError::Decode(e.to_string())
    }
}

/// Pack a fingerprint set, and optional extra data, under a fresh random salt.
///
/// An empty set packs to a valid blob that unpacks to an empty set. Fails
/// with [`AttributeError::Encode`] when the envelope would exceed
/// [`MAX_ENVELOPE_BYTES`].
pub fn pack(
    fingerprints: &FingerprintSet,
    extra: Option<&Value>,
) -> Result<PackedAttributes, AttributeError> {
    pack_with_salt(fingerprints, extra, fastrand::u64(..))
}

/// Pack with a caller-chosen salt. Only useful for reproducible fixtures.
#[doc(hidden)]
pub fn pack_with_salt(
    fingerprints: &FingerprintSet,
    extra: Option<&Value>,
    salt: u64,
) -> Result<PackedAttributes, AttributeError> {
    let envelope = Envelope {
        salt,
        fingerprints: fingerprints.clone(),
        extra: extra.cloned().unwrap_or(Value::Null),
    };
    let bytes = encode_envelope(&envelope)?;
    Ok(PackedAttributes(URL_SAFE_NO_PAD.encode(bytes)))
}

/// Decode a blob, reporting why it could not be read.
pub fn try_unpack(blob: &str) -> Result<Attributes, AttributeError> {
    let bytes = URL_SAFE_NO_PAD.decode(blob.trim())?;
    let envelope = decode_envelope(&bytes)?;
    Ok(Attributes {
        fingerprints: envelope.fingerprints,
        extra: envelope.extra,
    })
}

/// Decode a blob, falling back to empty attributes when it is unreadable.
///
/// A note with unreadable attributes is treated as unindexed; it must never
/// fail the batch it arrived in.
pub fn unpack(blob: &str) -> Attributes {
    try_unpack(blob).unwrap_or_else(|err| {
        tracing::debug!(error = %err, "discarding unreadable attribute blob");
        Attributes::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn set(values: &[u32]) -> FingerprintSet {
        values.iter().copied().collect()
    }

    #[test]
    fn roundtrip_preserves_fingerprints_and_extra() {
        let fps = ngram::extract("Pick up the dry cleaning before six");
        let extra = json!({ "lang": "en", "kind": "todo" });
        let blob = pack(&fps, Some(&extra)).unwrap();
        let attrs = try_unpack(blob.as_str()).unwrap();
        assert_eq!(attrs.fingerprints, fps);
        assert_eq!(attrs.extra, extra);
    }

    #[test]
    fn empty_set_packs_to_valid_blob() {
        let blob = pack(&FingerprintSet::new(), None).unwrap();
        let attrs = try_unpack(blob.as_str()).unwrap();
        assert!(attrs.is_empty());
        assert_eq!(attrs.extra, Value::Null);
    }

    #[test]
    fn identical_sets_produce_different_blobs() {
        let fps = set(&[1, 2, 3]);
        let a = pack_with_salt(&fps, None, 1).unwrap();
        let b = pack_with_salt(&fps, None, 2).unwrap();
        assert_ne!(a, b);
        assert_eq!(unpack(a.as_str()).fingerprints, unpack(b.as_str()).fingerprints);
    }

    #[test]
    fn layout_is_pinned() {
        // salt=0, fingerprints=[1, 2], extra=null
        let blob = pack_with_salt(&set(&[1, 2]), None, 0).unwrap();
        assert_eq!(blob.as_str(), "AAIBAgRudWxs");
        assert_eq!(unpack("AAIBAgRudWxs").fingerprints, set(&[1, 2]));
    }

    #[test]
    fn blob_is_transport_safe() {
        let blob = pack(&ngram::extract("a fairly long note with many grams"), None).unwrap();
        assert!(blob
            .as_str()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn largest_extractable_set_roundtrips() {
        // Worst case: every fingerprint needs a five-byte varint.
        let fps: FingerprintSet = (0..ngram::MAX_FINGERPRINTS_LIMIT as u32)
            .map(|i| u32::MAX - i)
            .collect();
        let blob = pack(&fps, Some(&json!({ "note": "x".repeat(1024) }))).unwrap();
        assert_eq!(unpack(blob.as_str()).fingerprints, fps);
    }

    #[test]
    fn oversized_set_is_refused_by_pack() {
        let fps: FingerprintSet = (0..20_000u32).map(|i| u32::MAX - i).collect();
        assert!(matches!(pack(&fps, None), Err(AttributeError::Encode(_))));
    }

    #[test]
    fn corrupt_input_unpacks_to_empty() {
        assert!(unpack("").is_empty());
        assert!(unpack("%%%not base64%%%").is_empty());
        assert!(unpack("AAAA").is_empty());
        assert_eq!(unpack("garbage"), Attributes::default());
    }

    #[test]
    fn try_unpack_reports_reason() {
        assert!(matches!(try_unpack("%%%"), Err(AttributeError::Base64(_))));
        assert!(matches!(try_unpack(""), Err(AttributeError::Decode(_))));
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let blob = pack_with_salt(&set(&[5]), None, 9).unwrap();
        let mut bytes = URL_SAFE_NO_PAD.decode(blob.as_str()).unwrap();
        bytes.push(0);
        let tampered = URL_SAFE_NO_PAD.encode(bytes);
        assert_eq!(
            try_unpack(&tampered),
            Err(AttributeError::TrailingBytes { trailing: 1 })
        );
        assert!(unpack(&tampered).is_empty());
    }

    #[test]
    fn display_matches_encoded_string() {
        let blob = PackedAttributes::from_encoded("abc");
        assert_eq!(blob.to_string(), "abc");
        assert_eq!(blob.as_ref(), "abc");
        assert_eq!(blob.into_string(), "abc");
    }
}
