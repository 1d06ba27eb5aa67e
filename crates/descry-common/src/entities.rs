/// Core entity types for description assignment.
/// Records and their candidate hits are built by the parsing layer and
/// mutated in place by one scoring pass; they are never destroyed mid-run.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Candidate annotation hit
// ---------------------------------------------------------------------------

/// One alignment result competing to become a record's description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationHit {
    pub accession: String,
    pub description: String,
    /// Case-normalised, deduplicated words of the description line.
    pub tokens: BTreeSet<String>,
    /// Alignment span on the query sequence (1-based, inclusive).
    pub start: usize,
    pub end: usize,
    pub bit_score: f64,
    /// Name of the search database this hit came from.
    pub database: String,
    /// Order-independent normal form of the description line, used to count
    /// repeated descriptions across hits.
    pub pattern: String,
    /// Assigned once per scoring pass.
    pub description_score: Option<f64>,
}

impl AnnotationHit {
    pub fn new(
        accession: impl Into<String>,
        description: impl Into<String>,
        start: usize,
        end: usize,
        bit_score: f64,
        database: impl Into<String>,
    ) -> Self {
        let description = description.into();
        let tokens = tokenize(&description);
        let pattern = pattern_signature(&tokens);
        Self {
            accession: accession.into(),
            description,
            tokens,
            start,
            end,
            bit_score,
            database: database.into(),
            pattern,
            description_score: None,
        }
    }
}

/// Split a description line into lowercase tokens.
/// Runs of non-alphanumeric characters act as separators.
pub fn tokenize(description: &str) -> BTreeSet<String> {
    description
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reduce a token set to its pattern signature: sorted, deduplicated tokens
/// joined without separator. Differently-worded but token-equal descriptions
/// map to the same signature.
pub fn pattern_signature(tokens: &BTreeSet<String>) -> String {
    tokens.iter().map(String::as_str).collect()
}

// ---------------------------------------------------------------------------
// Scoring outcome
// ---------------------------------------------------------------------------

/// The description a record ended up with, and how it scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChosenDescription {
    pub database: String,
    pub accession: String,
    pub description: String,
    pub score: f64,
}

/// Per-record performance against a reference description.
/// Present only for records that carry a reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationOutcome {
    /// Scalar performance delta (objective function contribution).
    pub evaluation_score: f64,
    pub true_positive_rate: f64,
    pub false_positive_rate: f64,
}

// ---------------------------------------------------------------------------
// Sequence record
// ---------------------------------------------------------------------------

/// One sequence entity being annotated.
///
/// Candidate hits are grouped by source database; the enumeration order used
/// during scoring is the database order of the active weight configuration,
/// with hits in their original per-database order, so score ties resolve
/// deterministically to the first-seen hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceRecord {
    pub accession: String,
    pub sequence_length: usize,
    pub hits: HashMap<String, Vec<AnnotationHit>>,
    /// Reference description, present only when training.
    pub reference: Option<String>,
    /// Token-score map of the latest scoring pass (diagnostics output).
    pub token_scores: HashMap<String, f64>,
    pub chosen: Option<ChosenDescription>,
    pub evaluation: Option<EvaluationOutcome>,
}

impl SequenceRecord {
    pub fn new(accession: impl Into<String>, sequence_length: usize) -> Self {
        Self {
            accession: accession.into(),
            sequence_length,
            hits: HashMap::new(),
            reference: None,
            token_scores: HashMap::new(),
            chosen: None,
            evaluation: None,
        }
    }

    /// Append a hit to its database's ordered list.
    pub fn add_hit(&mut self, hit: AnnotationHit) {
        self.hits.entry(hit.database.clone()).or_default().push(hit);
    }

    pub fn has_hits(&self) -> bool {
        self.hits.values().any(|hits| !hits.is_empty())
    }

    pub fn hit_count(&self) -> usize {
        self.hits.values().map(Vec::len).sum()
    }

    /// All distinct tokens across this record's candidate hits.
    pub fn token_universe(&self) -> BTreeSet<String> {
        self.hits
            .values()
            .flatten()
            .flat_map(|hit| hit.tokens.iter().cloned())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_lowercases_and_splits() {
        let tokens = tokenize("description_5 Fly-Wing formation");
        let expected: BTreeSet<String> = ["description", "5", "fly", "wing", "formation"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(tokens, expected);
    }

    #[test]
    fn test_tokenize_deduplicates() {
        let tokens = tokenize("sheep sheep SHEEP wool");
        assert_eq!(tokens.len(), 2);
        assert!(tokens.contains("sheep"));
        assert!(tokens.contains("wool"));
    }

    #[test]
    fn test_pattern_signature_is_order_independent() {
        let a = tokenize("one two three");
        let b = tokenize("three two one");
        assert_eq!(pattern_signature(&a), "onethreetwo");
        assert_eq!(pattern_signature(&a), pattern_signature(&b));
    }

    #[test]
    fn test_hit_construction() {
        let hit = AnnotationHit::new("P12345", "goat sheep wool", 10, 20, 30.0, "swissprot");
        assert_eq!(hit.pattern, "goatsheepwool");
        assert_eq!(hit.tokens.len(), 3);
        assert!(hit.description_score.is_none());
    }

    #[test]
    fn test_record_groups_hits_by_database() {
        let mut record = SequenceRecord::new("prot_1", 200);
        record.add_hit(AnnotationHit::new("a1", "goat sheep wool", 1, 100, 30.0, "swissprot"));
        record.add_hit(AnnotationHit::new("a2", "sheep horn", 1, 50, 20.0, "swissprot"));
        record.add_hit(AnnotationHit::new("a3", "wool factor", 5, 60, 25.0, "trembl"));
        assert_eq!(record.hit_count(), 3);
        assert_eq!(record.hits["swissprot"].len(), 2);
        assert!(record.has_hits());
        assert!(record.token_universe().contains("horn"));
    }
}
