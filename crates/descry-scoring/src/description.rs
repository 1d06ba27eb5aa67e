//! Description-line scoring and selection.
//!
//! Each candidate hit's description line gets one scalar score combining the
//! lexical signal, how often the line's pattern recurs across the record's
//! hits, and the hit's alignment quality relative to the record's best.

use std::collections::HashMap;

use descry_common::entities::{AnnotationHit, ChosenDescription, SequenceRecord};
use descry_common::error::{DescryError, Result};

use crate::lexical::LexicalScorer;
use crate::token::TokenScores;
use crate::weights::ScoringWeights;

/// Per-record aggregates needed to score description lines.
#[derive(Debug, Clone, Default)]
pub struct DescriptionScorer {
    /// How often each pattern signature occurs among the record's hits.
    pub pattern_frequencies: HashMap<String, u32>,
    pub max_pattern_frequency: u32,
    pub max_bit_score: f64,
}

impl DescriptionScorer {
    /// Scan a record's hits once to collect pattern frequencies and the
    /// maximum bit score.
    pub fn for_record(record: &SequenceRecord) -> Self {
        let mut scorer = Self::default();
        for hits in record.hits.values() {
            for hit in hits {
                let frequency = scorer
                    .pattern_frequencies
                    .entry(hit.pattern.clone())
                    .or_insert(0);
                *frequency += 1;
                if *frequency > scorer.max_pattern_frequency {
                    scorer.max_pattern_frequency = *frequency;
                }
                if hit.bit_score > scorer.max_bit_score {
                    scorer.max_bit_score = hit.bit_score;
                }
            }
        }
        scorer
    }

    /// Weighted share of the record's maximum pattern frequency held by this
    /// hit's pattern signature.
    pub fn pattern_factor(&self, hit: &AnnotationHit, weights: &ScoringWeights) -> f64 {
        let frequency = self
            .pattern_frequencies
            .get(&hit.pattern)
            .copied()
            .unwrap_or(0);
        weights.pattern_factor_weight * f64::from(frequency)
            / f64::from(self.max_pattern_frequency)
    }

    /// Weighted share of the record's maximum bit score held by this hit,
    /// under the bit-score weight configured for the hit's database.
    pub fn relative_bit_score(
        &self,
        hit: &AnnotationHit,
        weights: &ScoringWeights,
    ) -> Result<f64> {
        let weight = weights.bit_score_weight(&hit.database).ok_or_else(|| {
            DescryError::Config(format!(
                "no bit-score weight configured for database '{}'",
                hit.database
            ))
        })?;
        Ok(weight * hit.bit_score / self.max_bit_score)
    }

    /// Combined description score of one hit.
    pub fn description_score(
        &self,
        hit: &AnnotationHit,
        tokens: &TokenScores,
        weights: &ScoringWeights,
        lexical: &dyn LexicalScorer,
    ) -> Result<f64> {
        Ok(lexical.lexical_score(hit, tokens)?
            + self.relative_bit_score(hit, weights)?
            + self.pattern_factor(hit, weights))
    }

    /// Score every hit of `record`, writing each hit's score in place, and
    /// record the strictly highest-scoring hit as the chosen description.
    ///
    /// Hits are visited in the weight configuration's database order, then
    /// in their original per-database order, so ties resolve to the
    /// first-seen hit.
    pub fn select_best(
        &self,
        record: &mut SequenceRecord,
        tokens: &TokenScores,
        weights: &ScoringWeights,
        lexical: &dyn LexicalScorer,
    ) -> Result<Option<ChosenDescription>> {
        let mut best: Option<ChosenDescription> = None;
        for db in &weights.databases {
            let Some(hits) = record.hits.get_mut(&db.name) else {
                continue;
            };
            for hit in hits.iter_mut() {
                let score = self.description_score(hit, tokens, weights, lexical)?;
                hit.description_score = Some(score);
                let is_new_best = match &best {
                    None => true,
                    Some(chosen) => score > chosen.score,
                };
                if is_new_best {
                    best = Some(ChosenDescription {
                        database: db.name.clone(),
                        accession: hit.accession.clone(),
                        description: hit.description.clone(),
                        score,
                    });
                }
            }
        }
        record.chosen = best.clone();
        Ok(best)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
