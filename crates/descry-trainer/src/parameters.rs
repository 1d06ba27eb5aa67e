//! Annealing schedule and neighbour generation in weight space.

use rand::Rng;
use serde::{Deserialize, Serialize};

use descry_common::error::{DescryError, Result};
use descry_scoring::weights::ScoringWeights;

/// Control parameters of one training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnealingSchedule {
    /// Starting temperature; the run performs
    /// `initial_temperature / cool_down_by` iterations.
    #[serde(default = "default_initial_temperature")]
    pub initial_temperature: f64,
    /// Temperature decrease per iteration.
    #[serde(default = "default_cool_down_by")]
    pub cool_down_by: f64,
    /// Maximum absolute delta applied to each fractional weight when
    /// deriving a neighbour.
    #[serde(default = "default_weight_mutation_bound")]
    pub weight_mutation_bound: f64,
    /// Maximum absolute delta applied to each integer database weight.
    #[serde(default = "default_database_weight_mutation_bound")]
    pub database_weight_mutation_bound: u32,
    /// Remember evaluated configurations and reuse their outcomes when the
    /// walk revisits one.
    #[serde(default = "default_true")]
    pub remember_tested: bool,
    /// RNG seed; a fixed seed makes the whole trajectory reproducible.
    pub seed: Option<u64>,
}

fn default_initial_temperature() -> f64 { 1000.0 }
fn default_cool_down_by() -> f64 { 1.0 }
fn default_weight_mutation_bound() -> f64 { 0.1 }
fn default_database_weight_mutation_bound() -> u32 { 10 }
fn default_true() -> bool { true }

impl Default for AnnealingSchedule {
    fn default() -> Self {
        Self {
            initial_temperature: default_initial_temperature(),
            cool_down_by: default_cool_down_by(),
            weight_mutation_bound: default_weight_mutation_bound(),
            database_weight_mutation_bound: default_database_weight_mutation_bound(),
            remember_tested: default_true(),
            seed: None,
        }
    }
}

impl AnnealingSchedule {
    pub fn validate(&self) -> Result<()> {
        if !self.initial_temperature.is_finite() {
            return Err(DescryError::Config(format!(
                "initial temperature must be finite, got {}",
                self.initial_temperature
            )));
        }
        if !(self.cool_down_by > 0.0) {
            return Err(DescryError::Config(format!(
                "cool-down step must be positive, got {}",
                self.cool_down_by
            )));
        }
        if !self.weight_mutation_bound.is_finite() || self.weight_mutation_bound < 0.0 {
            return Err(DescryError::Config(format!(
                "weight mutation bound must be finite and non-negative, got {}",
                self.weight_mutation_bound
            )));
        }
        Ok(())
    }

    /// Number of iterations the schedule yields before the temperature
    /// reaches zero.
    pub fn planned_iterations(&self) -> u64 {
        if self.initial_temperature <= 0.0 {
            return 0;
        }
        (self.initial_temperature / self.cool_down_by).ceil() as u64
    }
}

/// Derive a random neighbour of `weights`.
///
/// Every tunable weight moves by a delta drawn uniformly from the
/// schedule's bounds; the token-score trio is then renormalised so the
/// sum-to-one invariant survives the move. Zero bounds leave the vector
/// unchanged.
pub fn neighbour(
    weights: &ScoringWeights,
    schedule: &AnnealingSchedule,
    rng: &mut impl Rng,
) -> ScoringWeights {
    if schedule.weight_mutation_bound == 0.0 && schedule.database_weight_mutation_bound == 0 {
        return weights.clone();
    }

    let bound = schedule.weight_mutation_bound;
    let mut next = weights.clone();
    next.token_bit_score_weight = perturb(next.token_bit_score_weight, bound, rng);
    next.token_database_weight = perturb(next.token_database_weight, bound, rng);
    next.token_overlap_weight = perturb(next.token_overlap_weight, bound, rng);
    if next.token_score_weight_sum() > 0.0 {
        next.normalise_token_weights();
    } else {
        // All three clamped to zero; keep the parent's trio.
        next.token_bit_score_weight = weights.token_bit_score_weight;
        next.token_database_weight = weights.token_database_weight;
        next.token_overlap_weight = weights.token_overlap_weight;
    }
    next.pattern_factor_weight = perturb(next.pattern_factor_weight, bound, rng);
    for db in &mut next.databases {
        db.bit_score_weight = perturb(db.bit_score_weight, bound, rng);
        db.weight = perturb_integer(db.weight, schedule.database_weight_mutation_bound, rng);
    }
    next
}

fn perturb(value: f64, bound: f64, rng: &mut impl Rng) -> f64 {
    if bound == 0.0 {
        return value;
    }
    (value + rng.gen_range(-bound..=bound)).max(0.0)
}

fn perturb_integer(value: u32, bound: u32, rng: &mut impl Rng) -> u32 {
    if bound == 0 {
        return value;
    }
    let delta = rng.gen_range(-i64::from(bound)..=i64::from(bound));
    // Database weights stay at least 1 so the token scorer's database
    // total can never vanish.
    (i64::from(value) + delta).max(1) as u32
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
