//! Per-record annotation pass.
//!
//! Orchestrates the full flow for one weight configuration:
//!   1. Assign token scores (two-pass accumulation + normalisation)
//!   2. Penalise non-informative tokens
//!   3. Score every candidate description line and keep the best
//!
//! Records are independent, so the collection pass runs them in parallel;
//! each record's mutation stays confined to that record.

use rayon::prelude::*;
use tracing::{debug, info};

use descry_common::entities::SequenceRecord;
use descry_common::error::Result;

use crate::description::DescriptionScorer;
use crate::lexical::LexicalScorer;
use crate::token::{Blacklist, TokenScores};
use crate::weights::ScoringWeights;

/// Runs scoring passes under one validated weight configuration.
#[derive(Debug)]
pub struct Annotator {
    weights: ScoringWeights,
    blacklist: Blacklist,
}

impl Annotator {
    /// Validate the configuration and compile its blacklist once.
    pub fn new(weights: ScoringWeights) -> Result<Self> {
        weights.validate()?;
        let blacklist = Blacklist::compile(&weights.blacklist)?;
        Ok(Self { weights, blacklist })
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score one record and store its outcome in place: the chosen
    /// description, every hit's description score, and the token-score map.
    pub fn annotate_record(
        &self,
        record: &mut SequenceRecord,
        lexical: &dyn LexicalScorer,
    ) -> Result<()> {
        let mut tokens = TokenScores::for_record(record, &self.weights, &self.blacklist)?;
        tokens.filter_non_informative();
        let scorer = DescriptionScorer::for_record(record);
        scorer.select_best(record, &tokens, &self.weights, lexical)?;
        record.token_scores = tokens.into_scores();
        debug!(
            record = %record.accession,
            score = record.chosen.as_ref().map(|c| c.score),
            "annotated record"
        );
        Ok(())
    }

    /// Score the whole collection. Records are processed in parallel; the
    /// pass fails on the first record-level error.
    pub fn annotate_all(
        &self,
        records: &mut [SequenceRecord],
        lexical: &dyn LexicalScorer,
    ) -> Result<()> {
        records
            .par_iter_mut()
            .try_for_each(|record| self.annotate_record(record, lexical))?;
        info!(records = records.len(), "assigned highest-scoring descriptions");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
