//! Iteration output seam.
//!
//! The trainer reports every iteration's trial configuration and metrics
//! through a sink so output formatting stays outside the optimisation loop.

use tracing::info;

use descry_common::error::Result;
use descry_scoring::weights::ScoringWeights;

use crate::annealing::{TrainingResult, TrialOutcome};

/// One optimizer iteration as reported to the outside.
#[derive(Debug, Clone, serde::Serialize)]
pub struct IterationReport {
    pub iteration: u64,
    pub temperature: f64,
    pub weights: ScoringWeights,
    pub outcome: TrialOutcome,
    /// Whether the Metropolis criterion accepted this configuration.
    pub accepted: bool,
    /// Whether the outcome came from the tested-configuration cache.
    pub from_cache: bool,
}

pub trait TrainerSink {
    fn write_iteration(&mut self, report: &IterationReport) -> Result<()>;

    fn write_final(&mut self, result: &TrainingResult) -> Result<()> {
        let _ = result;
        Ok(())
    }
}

/// Logs each iteration through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TrainerSink for TracingSink {
    fn write_iteration(&mut self, report: &IterationReport) -> Result<()> {
        info!(
            iteration = report.iteration,
            temperature = report.temperature,
            avg_score = report.outcome.avg_evaluation_score,
            avg_tpr = report.outcome.avg_true_positive_rate,
            avg_fpr = report.outcome.avg_false_positive_rate,
            accepted = report.accepted,
            from_cache = report.from_cache,
            "trainer iteration"
        );
        Ok(())
    }

    fn write_final(&mut self, result: &TrainingResult) -> Result<()> {
        info!(
            iterations = result.iterations,
            best_score = result
                .best_outcome
                .as_ref()
                .map(|outcome| outcome.avg_evaluation_score),
            "training finished"
        );
        Ok(())
    }
}

/// Collects everything in memory; used by tests and diagnostics.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub iterations: Vec<IterationReport>,
    pub final_result: Option<TrainingResult>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TrainerSink for MemorySink {
    fn write_iteration(&mut self, report: &IterationReport) -> Result<()> {
        self.iterations.push(report.clone());
        Ok(())
    }

    fn write_final(&mut self, result: &TrainingResult) -> Result<()> {
        self.final_result = Some(result.clone());
        Ok(())
    }
}
