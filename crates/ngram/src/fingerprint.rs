//! Fingerprint set representation.

use serde::{Deserialize, Serialize};

/// A 32-bit hash of one normalized character n-gram.
pub type Fingerprint = u32;

/// Distinct fingerprints of one document, in first-seen order.
///
/// Order is preserved so that a set survives serialization byte-for-byte and
/// so that truncation at the cardinality cap is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FingerprintSet {
    values: Vec<Fingerprint>,
}

impl FingerprintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Fingerprint> {
        self.values.iter()
    }

    pub fn as_slice(&self) -> &[Fingerprint] {
        &self.values
    }

    pub fn contains(&self, fingerprint: Fingerprint) -> bool {
        self.values.contains(&fingerprint)
    }

    pub fn into_vec(self) -> Vec<Fingerprint> {
        self.values
    }

    /// Append values that are already known to be distinct.
    pub(crate) fn from_distinct(values: Vec<Fingerprint>) -> Self {
        Self { values }
    }

    /// Number of fingerprints shared with `other`.
    pub fn overlap(&self, other: &FingerprintSet) -> usize {
        let theirs: hashbrown::HashSet<Fingerprint> = other.values.iter().copied().collect();
        self.values.iter().filter(|fp| theirs.contains(*fp)).count()
    }
}

impl FromIterator<Fingerprint> for FingerprintSet {
    /// Collect fingerprints, dropping repeats and keeping first-seen order.
    fn from_iter<I: IntoIterator<Item = Fingerprint>>(iter: I) -> Self {
        let mut seen = hashbrown::HashSet::new();
        let values = iter.into_iter().filter(|fp| seen.insert(*fp)).collect();
        Self { values }
    }
}

impl<'a> IntoIterator for &'a FingerprintSet {
    type Item = &'a Fingerprint;
    type IntoIter = std::slice::Iter<'a, Fingerprint>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl IntoIterator for FingerprintSet {
    type Item = Fingerprint;
    type IntoIter = std::vec::IntoIter<Fingerprint>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}
