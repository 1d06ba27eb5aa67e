//! Weight configuration for token and description scoring.
//!
//! A `ScoringWeights` instance is immutable for the duration of one scoring
//! pass. The trainer derives new instances from accepted ones; it never
//! mutates a configuration that has already been evaluated.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use descry_common::error::{DescryError, Result};

/// Tolerance for the sum-to-one invariant on the token-score weight trio.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-4;

/// Per-database weights.
///
/// `weight` feeds the token scorer's database component; `bit_score_weight`
/// scales the description scorer's relative-bit-score term for hits from
/// this database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseWeights {
    pub name: String,
    #[serde(default = "default_database_weight")]
    pub weight: u32,
    #[serde(default = "default_bit_score_weight")]
    pub bit_score_weight: f64,
}

fn default_database_weight() -> u32 { 100 }
fn default_bit_score_weight() -> f64 { 0.2 }

impl DatabaseWeights {
    pub fn new(name: impl Into<String>, weight: u32, bit_score_weight: f64) -> Self {
        Self { name: name.into(), weight, bit_score_weight }
    }
}

/// The full weight configuration of one scoring pass.
///
/// The three token-score weights must sum to 1.0 (± `WEIGHT_SUM_TOLERANCE`);
/// `validate` enforces this once per pass. Database order in `databases` is
/// the enumeration order used during scoring, so it also fixes tie-breaking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Token-score weight on the cumulative bit-score component.
    #[serde(default = "default_token_bit_score_weight")]
    pub token_bit_score_weight: f64,
    /// Token-score weight on the cumulative database-weight component.
    #[serde(default = "default_token_database_weight")]
    pub token_database_weight: f64,
    /// Token-score weight on the cumulative overlap component.
    #[serde(default = "default_token_overlap_weight")]
    pub token_overlap_weight: f64,
    /// Description-score weight on the pattern-frequency factor.
    #[serde(default = "default_pattern_factor_weight")]
    pub pattern_factor_weight: f64,
    /// Searched databases, in scoring order.
    pub databases: Vec<DatabaseWeights>,
    /// Reject patterns; a token matching any of them never enters the
    /// score map. Checked in order, first match excludes.
    #[serde(default)]
    pub blacklist: Vec<String>,
}

fn default_token_bit_score_weight() -> f64 { 0.5 }
fn default_token_database_weight() -> f64 { 0.3 }
fn default_token_overlap_weight() -> f64 { 0.2 }
fn default_pattern_factor_weight() -> f64 { 0.6 }

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            token_bit_score_weight: default_token_bit_score_weight(),
            token_database_weight: default_token_database_weight(),
            token_overlap_weight: default_token_overlap_weight(),
            pattern_factor_weight: default_pattern_factor_weight(),
            databases: vec![
                DatabaseWeights::new("swissprot", 100, 0.2),
                DatabaseWeights::new("trembl", 10, 0.4),
            ],
            blacklist: vec![],
        }
    }
}

impl ScoringWeights {
    /// Check the static invariants of this configuration.
    ///
    /// Called once per scoring pass, not per token.
    pub fn validate(&self) -> Result<()> {
        let sum = self.token_score_weight_sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(DescryError::Config(format!(
                "the three token-score weights must sum to 1.0, but sum to {sum}"
            )));
        }
        if !self.pattern_factor_weight.is_finite() || self.pattern_factor_weight < 0.0 {
            return Err(DescryError::Config(format!(
                "pattern-factor weight must be finite and non-negative, got {}",
                self.pattern_factor_weight
            )));
        }
        for db in &self.databases {
            if !db.bit_score_weight.is_finite() || db.bit_score_weight < 0.0 {
                return Err(DescryError::Config(format!(
                    "bit-score weight of database '{}' must be finite and non-negative, got {}",
                    db.name, db.bit_score_weight
                )));
            }
        }
        Ok(())
    }

    pub fn token_score_weight_sum(&self) -> f64 {
        self.token_bit_score_weight + self.token_database_weight + self.token_overlap_weight
    }

    /// Renormalise the token-score weight trio so it sums to 1.0.
    pub fn normalise_token_weights(&mut self) {
        let sum = self.token_score_weight_sum();
        if sum > 0.0 {
            self.token_bit_score_weight /= sum;
            self.token_database_weight /= sum;
            self.token_overlap_weight /= sum;
        }
    }

    /// Integer database weight for the token scorer.
    pub fn database_weight(&self, database: &str) -> Option<u32> {
        self.databases.iter().find(|db| db.name == database).map(|db| db.weight)
    }

    /// Description-score bit-score weight for hits from `database`.
    pub fn bit_score_weight(&self, database: &str) -> Option<f64> {
        self.databases
            .iter()
            .find(|db| db.name == database)
            .map(|db| db.bit_score_weight)
    }

    /// Load from YAML file
    pub fn from_yaml(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let weights: Self = serde_yaml::from_str(&content)?;
        Ok(weights)
    }

    /// Load from JSON file
    pub fn from_json(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let weights: Self = serde_json::from_str(&content)?;
        Ok(weights)
    }
}

// Structural equality and a stable hash over the raw f64 bits keep the
// configuration usable as a memoisation key in the trainer.
impl PartialEq for ScoringWeights {
    fn eq(&self, other: &Self) -> bool {
        self.token_bit_score_weight.to_bits() == other.token_bit_score_weight.to_bits()
            && self.token_database_weight.to_bits() == other.token_database_weight.to_bits()
            && self.token_overlap_weight.to_bits() == other.token_overlap_weight.to_bits()
            && self.pattern_factor_weight.to_bits() == other.pattern_factor_weight.to_bits()
            && self.databases.len() == other.databases.len()
            && self
                .databases
                .iter()
                .zip(&other.databases)
                .all(|(a, b)| {
                    a.name == b.name
                        && a.weight == b.weight
                        && a.bit_score_weight.to_bits() == b.bit_score_weight.to_bits()
                })
            && self.blacklist == other.blacklist
    }
}

impl Eq for ScoringWeights {}

impl Hash for ScoringWeights {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.token_bit_score_weight.to_bits().hash(state);
        self.token_database_weight.to_bits().hash(state);
        self.token_overlap_weight.to_bits().hash(state);
        self.pattern_factor_weight.to_bits().hash(state);
        for db in &self.databases {
            db.name.hash(state);
            db.weight.hash(state);
            db.bit_score_weight.to_bits().hash(state);
        }
        self.blacklist.hash(state);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
