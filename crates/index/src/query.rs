use ngram::FingerprintSet;
use serde::{Deserialize, Serialize};

use crate::{InvertedIndex, NodeRecord};

/// Number of query fingerprints a note may miss and still match.
pub const DEFAULT_SLACK: usize = 2;

/// Ranking policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankConfig {
    /// Tolerated missing n-grams (hash collisions, truncation, one-letter
    /// typos spanning a window).
    pub slack: usize,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            slack: DEFAULT_SLACK,
        }
    }
}

impl RankConfig {
    pub fn with_slack(mut self, slack: usize) -> Self {
        self.slack = slack;
        self
    }

    /// Minimum match frequency for a query of `query_len` fingerprints when
    /// the best candidate matched `frequency_max` of them.
    ///
    /// Queries no longer than the slack keep only the best candidates.
    pub fn cutoff(&self, query_len: usize, frequency_max: usize) -> usize {
        if query_len <= self.slack {
            frequency_max
        } else {
            (query_len - self.slack).min(frequency_max)
        }
    }
}

/// A note that survived ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match<'a> {
    pub record: &'a NodeRecord,
    /// Distinct query fingerprints the note carries; zero for the
    /// empty-query fallback.
    pub frequency: usize,
}

/// Outcome of [`InvertedIndex::rank`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankedMatches<'a> {
    /// Matches in record order. Not sorted by frequency.
    pub matches: Vec<Match<'a>>,
    /// Notes reachable from at least one query fingerprint.
    pub candidates: usize,
    pub frequency_max: usize,
    pub cutoff: usize,
}

impl<'a> RankedMatches<'a> {
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn ids(&self) -> Vec<&'a str> {
        self.matches.iter().map(|m| m.record.id.as_str()).collect()
    }

    pub fn to_records(&self) -> Vec<NodeRecord> {
        self.matches.iter().map(|m| m.record.clone()).collect()
    }
}

impl InvertedIndex {
    /// Filter the indexed notes against `query`.
    ///
    /// An empty query returns every record, unfiltered, in input order.
    pub fn rank(&self, query: &FingerprintSet, cfg: &RankConfig) -> RankedMatches<'_> {
        if query.is_empty() {
            return RankedMatches {
                matches: self
                    .records()
                    .iter()
                    .map(|record| Match {
                        record,
                        frequency: 0,
                    })
                    .collect(),
                ..RankedMatches::default()
            };
        }

        let record_count = self.records().len();
        let mut frequency = vec![0usize; record_count];
        // Last query fingerprint that counted for each record, so a position
        // posted twice under one fingerprint counts once.
        let mut last_counted = vec![usize::MAX; record_count];
        let mut candidates = 0usize;
        let mut frequency_max = 0usize;

        for (query_pos, &fp) in query.iter().enumerate() {
            for &position in self.postings(fp) {
                if last_counted[position] == query_pos {
                    continue;
                }
                last_counted[position] = query_pos;
                if frequency[position] == 0 {
                    candidates += 1;
                }
                frequency[position] += 1;
                frequency_max = frequency_max.max(frequency[position]);
            }
        }

        if candidates == 0 {
            return RankedMatches::default();
        }

        let cutoff = cfg.cutoff(query.len(), frequency_max);
        let matches: Vec<Match<'_>> = self
            .records()
            .iter()
            .zip(&frequency)
            .filter(|(_, freq)| **freq > 0 && **freq >= cutoff)
            .map(|(record, &freq)| Match {
                record,
                frequency: freq,
            })
            .collect();

        tracing::debug!(
            query_len = query.len(),
            candidates,
            frequency_max,
            cutoff,
            matched = matches.len(),
            "ranked candidates"
        );

        RankedMatches {
            matches,
            candidates,
            frequency_max,
            cutoff,
        }
    }
}

/// Rank with the default policy and return owned records.
pub fn rank(query: &FingerprintSet, index: &InvertedIndex) -> Vec<NodeRecord> {
    index.rank(query, &RankConfig::default()).to_records()
}

#[cfg(test)]
mod tests {
    use super::*;
    use attributes::pack;
    use chrono::{TimeZone, Utc};
    use ngram::Fingerprint;

    fn record_with(id: &str, fingerprints: &[Fingerprint]) -> NodeRecord {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let set: FingerprintSet = fingerprints.iter().copied().collect();
        NodeRecord::new(id, at, Some(pack(&set, None).unwrap()))
    }

    fn query(fingerprints: &[Fingerprint]) -> FingerprintSet {
        fingerprints.iter().copied().collect()
    }

    #[test]
    fn cutoff_formula() {
        let cfg = RankConfig::default();
        assert_eq!(cfg.cutoff(5, 5), 3);
        assert_eq!(cfg.cutoff(5, 2), 2);
        assert_eq!(cfg.cutoff(10, 4), 4);
        // Short queries collapse to the best frequency.
        assert_eq!(cfg.cutoff(2, 2), 2);
        assert_eq!(cfg.cutoff(1, 1), 1);
        assert_eq!(RankConfig::default().with_slack(0).cutoff(5, 5), 5);
    }

    #[test]
    fn five_fingerprint_example() {
        let index = InvertedIndex::build(vec![
            record_with("A", &[1, 2, 3, 4, 5]),
            record_with("B", &[1, 2, 3, 90, 91]),
            record_with("C", &[4, 5, 92]),
        ]);
        let ranked = index.rank(&query(&[1, 2, 3, 4, 5]), &RankConfig::default());

        assert_eq!(ranked.frequency_max, 5);
        assert_eq!(ranked.cutoff, 3);
        assert_eq!(ranked.candidates, 3);
        assert_eq!(ranked.ids(), vec!["A", "B"]);
        assert_eq!(ranked.matches[0].frequency, 5);
        assert_eq!(ranked.matches[1].frequency, 3);
    }

    #[test]
    fn empty_query_returns_every_record_in_order() {
        let mut unindexed = record_with("u", &[]);
        unindexed.packed_attributes = None;
        let index = InvertedIndex::build(vec![
            record_with("z", &[1]),
            unindexed,
            record_with("a", &[2]),
        ]);
        let ranked = index.rank(&FingerprintSet::new(), &RankConfig::default());
        assert_eq!(ranked.ids(), vec!["z", "u", "a"]);
        assert!(ranked.matches.iter().all(|m| m.frequency == 0));
    }

    #[test]
    fn no_candidates_yields_nothing() {
        let index = InvertedIndex::build(vec![record_with("a", &[1, 2])]);
        let ranked = index.rank(&query(&[7, 8, 9]), &RankConfig::default());
        assert!(ranked.is_empty());
        assert_eq!(ranked.frequency_max, 0);
    }

    #[test]
    fn short_query_keeps_only_best() {
        let index = InvertedIndex::build(vec![
            record_with("both", &[1, 2]),
            record_with("one", &[1]),
        ]);
        let ranked = index.rank(&query(&[1, 2]), &RankConfig::default());
        assert_eq!(ranked.ids(), vec!["both"]);
    }

    #[test]
    fn weak_best_match_still_returned() {
        // Nobody matches near-completely; the best partial matches survive.
        let index = InvertedIndex::build(vec![
            record_with("x", &[1, 2]),
            record_with("y", &[3]),
        ]);
        let ranked = index.rank(&query(&[1, 2, 3, 4, 5, 6, 7, 8]), &RankConfig::default());
        assert_eq!(ranked.cutoff, 2);
        assert_eq!(ranked.ids(), vec!["x"]);
    }

    #[test]
    fn repeated_postings_count_once() {
        let index = InvertedIndex::build(vec![record_with("d", &[1, 2]), record_with("d", &[1])]);
        let ranked = index.rank(&query(&[1, 2, 3]), &RankConfig::default());
        assert_eq!(ranked.matches[0].frequency, 2);
    }

    #[test]
    fn adding_a_stronger_match_does_not_shrink_results() {
        let q = query(&[1, 2, 3, 4, 5, 6]);
        let base = vec![
            record_with("a", &[1, 2, 3, 4]),
            record_with("b", &[1, 2, 3, 4, 5]),
        ];
        let before = InvertedIndex::build(base.clone()).rank(&q, &RankConfig::default()).len();

        let mut grown = base;
        grown.push(record_with("c", &[1, 2, 3, 4, 5, 6]));
        let grown_index = InvertedIndex::build(grown);
        let after = grown_index.rank(&q, &RankConfig::default());
        assert!(after.len() >= before);
        assert_eq!(after.ids(), vec!["a", "b", "c"]);
    }

    #[test]
    fn end_to_end_text_query() {
        let pack_text = |id: &str, text: &str| {
            let at = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
            NodeRecord::new(id, at, Some(pack(&ngram::extract(text), None).unwrap()))
        };
        let index = InvertedIndex::build(vec![
            pack_text("1", "Remember to renew the passport"),
            pack_text("2", "Dentist appointment on Tuesday"),
            pack_text("3", "passport photos at the pharmacy"),
        ]);
        let hits = rank(&ngram::extract("passport"), &index);
        let ids: Vec<&str> = hits.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);

        // One-letter typo is tolerated.
        let typo = rank(&ngram::extract("pasport"), &index);
        assert_eq!(typo.len(), 2);
    }
}
