//! descry-scoring — Token and description-line scoring engine.
//!
//! Assigns each sequence record the best-scoring human-readable description
//! from its pool of candidate annotation hits.

pub mod annotate;
pub mod description;
pub mod evaluation;
pub mod lexical;
pub mod token;
pub mod weights;

pub use annotate::Annotator;
pub use description::DescriptionScorer;
pub use evaluation::EvaluationSignal;
pub use lexical::{LexicalScorer, SummedTokenScore};
pub use token::{Blacklist, TokenScores};
pub use weights::{DatabaseWeights, ScoringWeights};
