//! Per-record token scoring.
//!
//! Every distinct word across a record's candidate description lines gets a
//! normalised importance score built from three cumulative components: bit
//! score, database weight, and alignment overlap. Tokens scoring above half
//! the record's highest token score count as informative; the rest are
//! penalised.

use std::collections::{HashMap, HashSet};

use regex::Regex;

use descry_common::entities::{AnnotationHit, SequenceRecord};
use descry_common::error::{DescryError, Result};

use crate::weights::ScoringWeights;

/// Fraction of the record covered by a hit's alignment span, in (0, 1].
pub fn overlap_score(start: usize, end: usize, sequence_length: usize) -> f64 {
    (end - start + 1) as f64 / sequence_length as f64
}

// ---------------------------------------------------------------------------
// Blacklist
// ---------------------------------------------------------------------------

/// Compiled reject patterns. A token matching any pattern is categorically
/// excluded from the score map; patterns are checked in configured order and
/// the first match excludes.
#[derive(Debug, Clone, Default)]
pub struct Blacklist {
    patterns: Vec<Regex>,
}

impl Blacklist {
    pub fn compile(patterns: &[String]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Empty tokens never pass; otherwise the token passes iff no pattern
    /// matches it.
    pub fn passes(&self, token: &str) -> bool {
        if token.is_empty() {
            return false;
        }
        for pattern in &self.patterns {
            if pattern.is_match(token) {
                return false;
            }
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Token scores
// ---------------------------------------------------------------------------

/// The token-score map of one record, together with the accumulators it was
/// built from.
#[derive(Debug, Clone, Default)]
pub struct TokenScores {
    cumulative_bit: HashMap<String, f64>,
    cumulative_database: HashMap<String, f64>,
    cumulative_overlap: HashMap<String, f64>,
    total_bit: f64,
    total_database: f64,
    total_overlap: f64,
    scores: HashMap<String, f64>,
    rejected: HashSet<String>,
    high_score: f64,
}

impl TokenScores {
    /// Run both scoring passes over `record`'s candidate hits.
    ///
    /// Pass 1 accumulates per-token cumulative sums and the three totals
    /// across all hits; pass 2 normalises each token's components against
    /// the totals and combines them under the configured weight trio.
    ///
    /// Records without candidate hits must never reach this point.
    pub fn for_record(
        record: &SequenceRecord,
        weights: &ScoringWeights,
        blacklist: &Blacklist,
    ) -> Result<Self> {
        weights.validate()?;
        if !record.has_hits() {
            return Err(DescryError::EmptyRecord(record.accession.clone()));
        }
        for database in record.hits.keys() {
            if weights.database_weight(database).is_none() {
                return Err(DescryError::Config(format!(
                    "no weight configured for database '{database}'"
                )));
            }
        }

        let mut this = Self::default();
        this.accumulate(record, weights, blacklist);
        this.normalise(record, weights)?;
        Ok(this)
    }

    fn accumulate(
        &mut self,
        record: &SequenceRecord,
        weights: &ScoringWeights,
        blacklist: &Blacklist,
    ) {
        for db in &weights.databases {
            let Some(hits) = record.hits.get(&db.name) else {
                continue;
            };
            let database_weight = f64::from(db.weight);
            for hit in hits {
                let overlap = overlap_score(hit.start, hit.end, record.sequence_length);
                // Totals are measured once per hit, independent of its tokens.
                self.total_bit += hit.bit_score;
                self.total_database += database_weight;
                self.total_overlap += overlap;
                for token in &hit.tokens {
                    if self.rejected.contains(token.as_str()) {
                        continue;
                    }
                    // The blacklist verdict for a token is decided on first sight.
                    if !self.cumulative_bit.contains_key(token.as_str())
                        && !blacklist.passes(token)
                    {
                        self.rejected.insert(token.clone());
                        continue;
                    }
                    *self.cumulative_bit.entry(token.clone()).or_insert(0.0) += hit.bit_score;
                    *self.cumulative_database.entry(token.clone()).or_insert(0.0) +=
                        database_weight;
                    *self.cumulative_overlap.entry(token.clone()).or_insert(0.0) += overlap;
                }
            }
        }
    }

    fn normalise(&mut self, record: &SequenceRecord, weights: &ScoringWeights) -> Result<()> {
        if self.total_bit == 0.0 || self.total_database == 0.0 || self.total_overlap == 0.0 {
            return Err(DescryError::DataIntegrity(format!(
                "record '{}': zero total in token-score normalisation",
                record.accession
            )));
        }
        for (token, cumulative_bit) in &self.cumulative_bit {
            let score = weights.token_bit_score_weight * cumulative_bit / self.total_bit
                + weights.token_database_weight * self.cumulative_database[token]
                    / self.total_database
                + weights.token_overlap_weight * self.cumulative_overlap[token]
                    / self.total_overlap;
            self.scores.insert(token.clone(), score);
            if score > self.high_score {
                self.high_score = score;
            }
        }
        Ok(())
    }

    /// Informative tokens score strictly above half the record's highest
    /// token score.
    pub fn is_informative(&self, token: &str) -> bool {
        self.scores
            .get(token)
            .map(|score| *score > self.high_score / 2.0)
            .unwrap_or(false)
    }

    /// Re-assign every non-informative token the score
    /// `old score − high score / 2`. A fixed penalty, not a floor: scores
    /// may go negative.
    pub fn filter_non_informative(&mut self) {
        let penalty = self.high_score / 2.0;
        for score in self.scores.values_mut() {
            if !(*score > penalty) {
                *score -= penalty;
            }
        }
    }

    /// Score of a token, failing if the token never entered the map.
    pub fn score(&self, token: &str) -> Result<f64> {
        self.scores.get(token).copied().ok_or_else(|| {
            DescryError::DataIntegrity(format!("token '{token}' has no score assigned"))
        })
    }

    pub fn get(&self, token: &str) -> Option<f64> {
        self.scores.get(token).copied()
    }

    /// Whether the token was excluded by the blacklist.
    pub fn is_rejected(&self, token: &str) -> bool {
        self.rejected.contains(token)
    }

    pub fn high_score(&self) -> f64 {
        self.high_score
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Sum of a hit's tokens' scores. Blacklisted tokens are skipped; a
    /// token that is neither scored nor blacklisted means the passes ran
    /// out of order.
    pub fn summed_token_score(&self, hit: &AnnotationHit) -> Result<f64> {
        let mut sum = 0.0;
        for token in &hit.tokens {
            if self.rejected.contains(token.as_str()) {
                continue;
            }
            sum += self.score(token)?;
        }
        Ok(sum)
    }

    pub fn scores(&self) -> &HashMap<String, f64> {
        &self.scores
    }

    pub fn into_scores(self) -> HashMap<String, f64> {
        self.scores
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use descry_common::entities::AnnotationHit;

    use super::*;

    fn record_with_hits(hits: Vec<AnnotationHit>) -> SequenceRecord {
        let mut record = SequenceRecord::new("prot_1", 200);
        for hit in hits {
            record.add_hit(hit);
        }
        record
    }

    fn scores_for(record: &SequenceRecord, weights: &ScoringWeights) -> TokenScores {
        let blacklist = Blacklist::compile(&weights.blacklist).unwrap();
        TokenScores::for_record(record, weights, &blacklist).unwrap()
    }

    #[test]
    fn test_overlap_score() {
        assert!((overlap_score(10, 20, 200) - 0.055).abs() < 1e-12);
        assert!((overlap_score(1, 200, 200) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_hit_token_gets_full_score() {
        // A token appearing in only one hit still receives a full score:
        // with one hit, every component ratio is 1, so the score is the
        // weight sum.
        let record = record_with_hits(vec![AnnotationHit::new(
            "a1",
            "goat sheep wool",
            1,
            100,
            30.0,
            "swissprot",
        )]);
        let scores = scores_for(&record, &ScoringWeights::default());
        assert!((scores.score("goat").unwrap() - 1.0).abs() < 1e-12);
        assert!((scores.high_score() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_shared_token_outscores_lonely_token() {
        let record = record_with_hits(vec![
            AnnotationHit::new("a1", "sheep wool", 1, 100, 30.0, "swissprot"),
            AnnotationHit::new("a2", "sheep horn", 1, 100, 30.0, "swissprot"),
        ]);
        let scores = scores_for(&record, &ScoringWeights::default());
        assert!(scores.score("sheep").unwrap() > scores.score("wool").unwrap());
    }

    #[test]
    fn test_bit_score_monotonicity() {
        let base = record_with_hits(vec![
            AnnotationHit::new("a1", "sheep wool", 1, 100, 30.0, "swissprot"),
            AnnotationHit::new("a2", "goat horn", 1, 100, 20.0, "swissprot"),
        ]);
        let raised = record_with_hits(vec![
            AnnotationHit::new("a1", "sheep wool", 1, 100, 45.0, "swissprot"),
            AnnotationHit::new("a2", "goat horn", 1, 100, 20.0, "swissprot"),
        ]);
        let weights = ScoringWeights::default();
        let before = scores_for(&base, &weights);
        let after = scores_for(&raised, &weights);
        for token in ["sheep", "wool"] {
            assert!(
                after.score(token).unwrap() >= before.score(token).unwrap(),
                "raising a hit's bit score must not lower its tokens' scores"
            );
        }
    }

    #[test]
    fn test_informative_threshold_is_strict() {
        let mut scores = TokenScores::default();
        scores.scores.insert("exactly_half".to_string(), 0.5);
        scores.scores.insert("above_half".to_string(), 0.5 + 1e-9);
        scores.high_score = 1.0;
        assert!(!scores.is_informative("exactly_half"));
        assert!(scores.is_informative("above_half"));
        assert!(!scores.is_informative("unknown"));
    }

    #[test]
    fn test_filter_applies_fixed_penalty() {
        let mut scores = TokenScores::default();
        scores.scores.insert("strong".to_string(), 1.0);
        scores.scores.insert("weak".to_string(), 0.1);
        scores.scores.insert("border".to_string(), 0.5);
        scores.high_score = 1.0;
        scores.filter_non_informative();
        assert!((scores.score("strong").unwrap() - 1.0).abs() < 1e-12);
        assert!((scores.score("weak").unwrap() - (0.1 - 0.5)).abs() < 1e-12);
        // Exactly at the threshold counts as non-informative.
        assert!((scores.score("border").unwrap() - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_blacklisted_tokens_never_enter_the_map() {
        let mut weights = ScoringWeights::default();
        weights.blacklist = vec!["^\\d+$".to_string(), "^subunit$".to_string()];
        let record = record_with_hits(vec![AnnotationHit::new(
            "a1",
            "cytochrome subunit 42",
            1,
            100,
            30.0,
            "swissprot",
        )]);
        let scores = scores_for(&record, &weights);
        assert!(scores.get("cytochrome").is_some());
        assert!(scores.get("subunit").is_none());
        assert!(scores.get("42").is_none());
        assert!(scores.is_rejected("42"));
        assert!(!scores.is_rejected("cytochrome"));
    }

    #[test]
    fn test_invalid_blacklist_pattern_is_a_config_error() {
        let err = Blacklist::compile(&["(unclosed".to_string()]).unwrap_err();
        assert!(matches!(err, DescryError::Pattern(_)));
    }

    #[test]
    fn test_empty_record_fails_fast() {
        let record = SequenceRecord::new("prot_1", 200);
        let weights = ScoringWeights::default();
        let blacklist = Blacklist::default();
        let err = TokenScores::for_record(&record, &weights, &blacklist).unwrap_err();
        assert!(matches!(err, DescryError::EmptyRecord(_)));
    }

    #[test]
    fn test_unconfigured_database_is_a_config_error() {
        let record = record_with_hits(vec![AnnotationHit::new(
            "a1",
            "sheep wool",
            1,
            100,
            30.0,
            "pfam",
        )]);
        let weights = ScoringWeights::default();
        let blacklist = Blacklist::default();
        let err = TokenScores::for_record(&record, &weights, &blacklist).unwrap_err();
        assert!(matches!(err, DescryError::Config(_)));
    }

    #[test]
    fn test_broken_weight_trio_fails_once() {
        let mut weights = ScoringWeights::default();
        weights.token_bit_score_weight = 0.9;
        let record = record_with_hits(vec![AnnotationHit::new(
            "a1",
            "sheep wool",
            1,
            100,
            30.0,
            "swissprot",
        )]);
        let blacklist = Blacklist::default();
        let err = TokenScores::for_record(&record, &weights, &blacklist).unwrap_err();
        assert!(matches!(err, DescryError::Config(_)));
    }

    #[test]
    fn test_missing_token_is_a_data_integrity_error() {
        let record = record_with_hits(vec![AnnotationHit::new(
            "a1",
            "sheep wool",
            1,
            100,
            30.0,
            "swissprot",
        )]);
        let scores = scores_for(&record, &ScoringWeights::default());
        let err = scores.score("unseen").unwrap_err();
        assert!(matches!(err, DescryError::DataIntegrity(_)));
    }

    #[test]
    fn test_determinism_across_passes() {
        let record = record_with_hits(vec![
            AnnotationHit::new("a1", "putative sheep wool protein", 1, 150, 55.5, "swissprot"),
            AnnotationHit::new("a2", "wool keratin", 20, 90, 41.0, "swissprot"),
            AnnotationHit::new("a3", "sheep keratin fragment", 5, 60, 12.25, "trembl"),
        ]);
        let weights = ScoringWeights::default();
        let first = scores_for(&record, &weights);
        let second = scores_for(&record, &weights);
        assert_eq!(first.scores(), second.scores());
        assert_eq!(first.high_score(), second.high_score());
    }
}
