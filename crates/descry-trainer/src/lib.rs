//! descry-trainer — Simulated-annealing search over scoring weights.
//!
//! Repeatedly re-scores the whole record collection under perturbed weight
//! configurations and keeps the best-performing one, using per-record
//! evaluation against reference descriptions as the objective function.

pub mod annealing;
pub mod parameters;
pub mod sink;

pub use annealing::{Trainer, TrainingResult, TrialOutcome};
pub use parameters::{neighbour, AnnealingSchedule};
pub use sink::{IterationReport, MemorySink, TracingSink, TrainerSink};
