//! Lexical scoring seam.
//!
//! The description scorer treats the lexical contribution of a candidate
//! description line as a pluggable function over the record's token-score
//! map, so alternative lexical models can be swapped in without touching
//! the selection logic.

use descry_common::entities::AnnotationHit;
use descry_common::error::Result;

use crate::token::TokenScores;

/// Lexical contribution of one candidate description line.
///
/// Implementations must be deterministic given the current token-score map.
pub trait LexicalScorer: Send + Sync {
    fn lexical_score(&self, hit: &AnnotationHit, tokens: &TokenScores) -> Result<f64>;
}

/// Default lexical model: the sum of the hit's tokens' scores.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummedTokenScore;

impl LexicalScorer for SummedTokenScore {
    fn lexical_score(&self, hit: &AnnotationHit, tokens: &TokenScores) -> Result<f64> {
        tokens.summed_token_score(hit)
    }
}

// ── Mock Implementation for Testing ────────────────────────────────────────

/// Lexical scorer returning a fixed value for every hit.
#[derive(Debug, Clone, Copy)]
pub struct FixedLexicalScore(pub f64);

impl LexicalScorer for FixedLexicalScore {
    fn lexical_score(&self, _hit: &AnnotationHit, _tokens: &TokenScores) -> Result<f64> {
        Ok(self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
