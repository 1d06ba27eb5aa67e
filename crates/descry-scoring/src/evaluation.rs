//! Evaluation seam for training runs.
//!
//! Compares a record's chosen description against its reference and emits
//! the scalar signal the trainer optimises. Real evaluation models live
//! outside this crate; the default token-overlap model here covers the
//! common case and the mock covers tests.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use descry_common::entities::{tokenize, EvaluationOutcome, SequenceRecord};

/// Per-record performance signal against a reference description.
pub trait EvaluationSignal: Send + Sync {
    fn evaluate(&self, record: &SequenceRecord, reference: &str) -> EvaluationOutcome;
}

/// Token-overlap evaluation: F1 of the chosen description's tokens against
/// the reference's tokens.
///
/// The true-positive rate is recall over the reference tokens. The
/// false-positive rate is measured against the record's full candidate
/// token universe: of all candidate tokens not in the reference, the share
/// that made it into the chosen description.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenOverlapEvaluation;

impl EvaluationSignal for TokenOverlapEvaluation {
    fn evaluate(&self, record: &SequenceRecord, reference: &str) -> EvaluationOutcome {
        let Some(chosen) = &record.chosen else {
            return EvaluationOutcome {
                evaluation_score: 0.0,
                true_positive_rate: 0.0,
                false_positive_rate: 0.0,
            };
        };
        let reference_tokens = tokenize(reference);
        let chosen_tokens = tokenize(&chosen.description);

        let true_positives = chosen_tokens.intersection(&reference_tokens).count() as f64;
        let precision = if chosen_tokens.is_empty() {
            0.0
        } else {
            true_positives / chosen_tokens.len() as f64
        };
        let recall = if reference_tokens.is_empty() {
            0.0
        } else {
            true_positives / reference_tokens.len() as f64
        };
        let f_score = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };

        let universe = record.token_universe();
        let negatives: BTreeSet<&String> = universe
            .iter()
            .filter(|t| !reference_tokens.contains(*t))
            .collect();
        let false_positives = chosen_tokens
            .iter()
            .filter(|t| negatives.contains(t))
            .count() as f64;
        let false_positive_rate = if negatives.is_empty() {
            0.0
        } else {
            false_positives / negatives.len() as f64
        };

        EvaluationOutcome {
            evaluation_score: f_score,
            true_positive_rate: recall,
            false_positive_rate,
        }
    }
}

// ── Mock Implementation for Testing ────────────────────────────────────────

/// Mock signal with per-accession outcomes and a call counter.
#[derive(Debug, Default)]
pub struct MockEvaluationSignal {
    outcomes: std::collections::HashMap<String, EvaluationOutcome>,
    calls: AtomicUsize,
}

impl MockEvaluationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the outcome returned for a record accession.
    pub fn with(mut self, accession: &str, score: f64, tpr: f64, fpr: f64) -> Self {
        self.outcomes.insert(
            accession.to_string(),
            EvaluationOutcome {
                evaluation_score: score,
                true_positive_rate: tpr,
                false_positive_rate: fpr,
            },
        );
        self
    }

    /// Number of times `evaluate` was invoked.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl EvaluationSignal for MockEvaluationSignal {
    fn evaluate(&self, record: &SequenceRecord, _reference: &str) -> EvaluationOutcome {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.outcomes
            .get(&record.accession)
            .cloned()
            .unwrap_or(EvaluationOutcome {
                evaluation_score: 0.0,
                true_positive_rate: 0.0,
                false_positive_rate: 0.0,
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
