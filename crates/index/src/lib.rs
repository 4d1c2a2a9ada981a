//! # Nodescan index
//!
//! Ephemeral inverted index over the notes fetched so far in one search
//! session, plus the frequency-cutoff ranker that filters them against a
//! query.
//!
//! ## Core Features
//!
//! - [`InvertedIndex::build`] maps every fingerprint to the notes carrying it
//!   and keeps every record, in input order, for result hydration.
//! - Notes whose packed attributes are missing or unreadable still appear in
//!   the record list (so an empty query can show them) but never in the
//!   fingerprint postings.
//! - [`InvertedIndex::rank`] counts, per note, how many distinct query
//!   fingerprints it carries, and keeps the notes that clear the cutoff
//!   `min(query_len - slack, frequency_max)`.
//!
//! The index is never persisted and never merged: each fetched slice builds a
//! fresh one. Building and ranking are pure over their inputs and can run on
//! any thread.
//!
//! ## Example Usage
//!
//! ```
//! use chrono::Utc;
//! use index::{InvertedIndex, NodeRecord, RankConfig};
//!
//! let now = Utc::now();
//! let pack = |text: &str| Some(attributes::pack(&ngram::extract(text), None).unwrap());
//! let index = InvertedIndex::build(vec![
//!     NodeRecord::new("groceries", now, pack("buy oat milk and eggs")),
//!     NodeRecord::new("work", now, pack("finish the quarterly report")),
//! ]);
//!
//! let query = ngram::extract("oat milk");
//! let ranked = index.rank(&query, &RankConfig::default());
//! assert_eq!(ranked.ids(), vec!["groceries"]);
//! ```

mod query;
mod record;

pub use crate::query::{rank, Match, RankConfig, RankedMatches, DEFAULT_SLACK};
pub use crate::record::NodeRecord;

use attributes::try_unpack;
use ngram::{Fingerprint, FingerprintSet};
use rayon::prelude::*;

/// Inverted index over one batch of note records.
#[derive(Debug, Clone, Default)]
pub struct InvertedIndex {
    /// Fingerprint to positions in `records`. A position may repeat when the
    /// same id arrives twice in one batch.
    postings: hashbrown::HashMap<Fingerprint, Vec<usize>>,
    /// Distinct records in first-seen order.
    records: Vec<NodeRecord>,
    /// Note id to position in `records`.
    positions: hashbrown::HashMap<String, usize>,
    /// Records that contributed at least one fingerprint.
    indexed: usize,
}

impl InvertedIndex {
    /// Build the index from a batch of records.
    pub fn build<I>(records: I) -> Self
    where
        I: IntoIterator<Item = NodeRecord>,
    {
        let mut index = Self::default();
        for record in records {
            let fingerprints = usable_fingerprints(&record);
            index.insert(record, fingerprints);
        }
        index.log_built();
        index
    }

    /// Same result as [`InvertedIndex::build`], decoding attribute blobs on
    /// the rayon pool first.
    pub fn build_parallel(records: Vec<NodeRecord>) -> Self {
        let decoded: Vec<Option<FingerprintSet>> =
            records.par_iter().map(usable_fingerprints).collect();

        let mut index = Self::default();
        for (record, fingerprints) in records.into_iter().zip(decoded) {
            index.insert(record, fingerprints);
        }
        index.log_built();
        index
    }

    fn insert(&mut self, record: NodeRecord, fingerprints: Option<FingerprintSet>) {
        let position = match self.positions.get(&record.id) {
            // A repeat keeps the first sighting's record.
            Some(&position) => position,
            None => {
                let position = self.records.len();
                self.positions.insert(record.id.clone(), position);
                self.records.push(record);
                position
            }
        };

        if let Some(fingerprints) = fingerprints {
            self.indexed += 1;
            for fp in fingerprints {
                self.postings.entry(fp).or_default().push(position);
            }
        }
    }

    fn log_built(&self) {
        tracing::debug!(
            records = self.records.len(),
            indexed = self.indexed,
            fingerprints = self.postings.len(),
            "built inverted index"
        );
    }

    /// Records in the order they were supplied, without repeats.
    pub fn records(&self) -> &[NodeRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<NodeRecord> {
        self.records
    }

    pub fn record(&self, id: &str) -> Option<&NodeRecord> {
        self.positions.get(id).map(|&position| &self.records[position])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records that contributed fingerprints.
    pub fn indexed_len(&self) -> usize {
        self.indexed
    }

    /// Number of distinct fingerprints with at least one posting.
    pub fn fingerprint_count(&self) -> usize {
        self.postings.len()
    }

    /// Ids posted under `fingerprint`, in insertion order.
    pub fn ids_for(&self, fingerprint: Fingerprint) -> impl Iterator<Item = &str> + '_ {
        self.postings
            .get(&fingerprint)
            .into_iter()
            .flatten()
            .map(|&position| self.records[position].id.as_str())
    }

    pub(crate) fn postings(&self, fingerprint: Fingerprint) -> &[usize] {
        self.postings
            .get(&fingerprint)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Decoded fingerprints, or `None` when the record has no usable attributes.
fn usable_fingerprints(record: &NodeRecord) -> Option<FingerprintSet> {
    let blob = record.packed_attributes.as_ref()?;
    match try_unpack(blob.as_str()) {
        Ok(attrs) if !attrs.fingerprints.is_empty() => Some(attrs.fingerprints),
        Ok(_) => None,
        Err(err) => {
            tracing::debug!(id = %record.id, error = %err, "note excluded from fingerprint index");
            None
        }
    }
}
