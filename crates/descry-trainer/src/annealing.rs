//! Simulated-annealing optimisation of the scoring weights.
//!
//! Each iteration re-scores the whole record collection under the trial
//! configuration, averages the per-record evaluation signal, and applies
//! the Metropolis criterion to decide whether the trial becomes the basis
//! for the next neighbour. The best configuration ever seen is what the
//! run returns; the walk itself is free to wander downhill.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, info};

use descry_common::entities::SequenceRecord;
use descry_common::error::{DescryError, Result};
use descry_scoring::annotate::Annotator;
use descry_scoring::evaluation::EvaluationSignal;
use descry_scoring::lexical::{LexicalScorer, SummedTokenScore};
use descry_scoring::weights::ScoringWeights;

use crate::parameters::{neighbour, AnnealingSchedule};
use crate::sink::{IterationReport, TrainerSink};

/// Run-level averages of one trial configuration.
///
/// Records without a reference contribute zero to every sum but stay in
/// the denominator; the average deliberately dilutes when only part of the
/// collection is annotated with references.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TrialOutcome {
    pub avg_evaluation_score: f64,
    pub avg_true_positive_rate: f64,
    pub avg_false_positive_rate: f64,
}

/// What a finished training run hands back.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TrainingResult {
    pub best_weights: ScoringWeights,
    /// Outcome of the best configuration; `None` when the schedule yielded
    /// zero iterations.
    pub best_outcome: Option<TrialOutcome>,
    pub iterations: u64,
}

/// Metropolis acceptance probability.
///
/// A trial at least as good as the accepted basis (or the very first
/// trial) is accepted with probability 1; a worse one with probability
/// `exp(−(accepted − current) / temperature)`.
pub fn acceptance_probability(
    accepted: Option<&TrialOutcome>,
    current: &TrialOutcome,
    temperature: f64,
) -> f64 {
    match accepted {
        Some(basis) if current.avg_evaluation_score < basis.avg_evaluation_score => {
            let score_diff = basis.avg_evaluation_score - current.avg_evaluation_score;
            (-score_diff / temperature).exp()
        }
        _ => 1.0,
    }
}

/// Simulated-annealing trainer.
pub struct Trainer<E: EvaluationSignal, S: TrainerSink> {
    schedule: AnnealingSchedule,
    evaluation: E,
    sink: S,
    lexical: Box<dyn LexicalScorer>,
}

impl<E: EvaluationSignal, S: TrainerSink> Trainer<E, S> {
    pub fn new(schedule: AnnealingSchedule, evaluation: E, sink: S) -> Self {
        Self {
            schedule,
            evaluation,
            sink,
            lexical: Box::new(SummedTokenScore),
        }
    }

    /// Swap in a different lexical model for the scoring passes.
    pub fn with_lexical_scorer(mut self, lexical: Box<dyn LexicalScorer>) -> Self {
        self.lexical = lexical;
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn evaluation(&self) -> &E {
        &self.evaluation
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Search for the weight configuration maximising the average
    /// evaluation score, starting from `initial`.
    ///
    /// The walk is strictly sequential across iterations; the scoring and
    /// evaluation of records inside one iteration runs in parallel. All
    /// random draws happen on this control path, so a fixed schedule seed
    /// reproduces the whole trajectory.
    pub fn train(
        &mut self,
        records: &mut [SequenceRecord],
        initial: ScoringWeights,
    ) -> Result<TrainingResult> {
        initial.validate()?;
        self.schedule.validate()?;
        if records.is_empty() {
            return Err(DescryError::Config(
                "training requires at least one record".to_string(),
            ));
        }

        let mut rng = match self.schedule.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut temperature = self.schedule.initial_temperature;
        let mut current = initial.clone();
        let mut accepted: Option<(ScoringWeights, TrialOutcome)> = None;
        let mut best: Option<(ScoringWeights, TrialOutcome)> = None;
        let mut tested: HashMap<ScoringWeights, TrialOutcome> = HashMap::new();
        let mut iterations = 0u64;

        info!(
            temperature,
            cool_down = self.schedule.cool_down_by,
            records = records.len(),
            planned_iterations = self.schedule.planned_iterations(),
            "starting simulated-annealing training"
        );

        while temperature > 0.0 {
            iterations += 1;

            let cached = if self.schedule.remember_tested {
                tested.get(&current).cloned()
            } else {
                None
            };
            let from_cache = cached.is_some();
            let outcome = match cached {
                Some(outcome) => outcome,
                None => self.evaluate_pass(records, &current)?,
            };

            let is_new_best = best
                .as_ref()
                .map_or(true, |(_, b)| outcome.avg_evaluation_score > b.avg_evaluation_score);
            if is_new_best {
                best = Some((current.clone(), outcome.clone()));
            }

            if self.schedule.remember_tested && !from_cache {
                tested.insert(current.clone(), outcome.clone());
            }

            let probability = acceptance_probability(
                accepted.as_ref().map(|(_, outcome)| outcome),
                &outcome,
                temperature,
            );
            let accept = if probability == 1.0 {
                true
            } else {
                rng.gen::<f64>() <= probability
            };
            if accept {
                accepted = Some((current.clone(), outcome.clone()));
            }

            self.sink.write_iteration(&IterationReport {
                iteration: iterations,
                temperature,
                weights: current.clone(),
                outcome: outcome.clone(),
                accepted: accept,
                from_cache,
            })?;
            debug!(
                iteration = iterations,
                temperature,
                score = outcome.avg_evaluation_score,
                accepted = accept,
                from_cache,
                "trainer iteration"
            );

            if let Some((basis, _)) = accepted.as_ref() {
                current = neighbour(basis, &self.schedule, &mut rng);
            }
            temperature -= self.schedule.cool_down_by;
        }

        let (best_weights, best_outcome) = match best {
            Some((weights, outcome)) => (weights, Some(outcome)),
            None => (initial, None),
        };
        let result = TrainingResult {
            best_weights,
            best_outcome,
            iterations,
        };
        self.sink.write_final(&result)?;
        Ok(result)
    }

    /// One full scoring-plus-evaluation pass under `weights`.
    fn evaluate_pass(
        &self,
        records: &mut [SequenceRecord],
        weights: &ScoringWeights,
    ) -> Result<TrialOutcome> {
        let annotator = Annotator::new(weights.clone())?;
        annotator.annotate_all(records, self.lexical.as_ref())?;

        let evaluation = &self.evaluation;
        records.par_iter_mut().for_each(|record| {
            record.evaluation = record
                .reference
                .clone()
                .map(|reference| evaluation.evaluate(record, &reference));
        });

        let mut sum_score = 0.0;
        let mut sum_tpr = 0.0;
        let mut sum_fpr = 0.0;
        for record in records.iter() {
            if let Some(outcome) = &record.evaluation {
                sum_score += outcome.evaluation_score;
                sum_tpr += outcome.true_positive_rate;
                sum_fpr += outcome.false_positive_rate;
            }
        }
        let denominator = records.len() as f64;
        Ok(TrialOutcome {
            avg_evaluation_score: sum_score / denominator,
            avg_true_positive_rate: sum_tpr / denominator,
            avg_false_positive_rate: sum_fpr / denominator,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use descry_common::entities::AnnotationHit;
    use descry_scoring::evaluation::MockEvaluationSignal;

    use crate::sink::MemorySink;

    use super::*;

    fn outcome(score: f64) -> TrialOutcome {
        TrialOutcome {
            avg_evaluation_score: score,
            avg_true_positive_rate: 0.0,
            avg_false_positive_rate: 0.0,
        }
    }

    fn corpus() -> Vec<SequenceRecord> {
        let mut first = SequenceRecord::new("prot_1", 200);
        first.add_hit(AnnotationHit::new("a1", "sheep wool protein", 1, 150, 55.0, "swissprot"));
        first.add_hit(AnnotationHit::new("a2", "hypothetical protein", 1, 40, 12.0, "trembl"));
        first.reference = Some("sheep wool protein".to_string());

        // No reference: contributes zero but stays in the denominator.
        let mut second = SequenceRecord::new("prot_2", 300);
        second.add_hit(AnnotationHit::new("b1", "goat horn keratin", 5, 280, 80.0, "swissprot"));

        vec![first, second]
    }

    #[test]
    fn test_acceptance_probability() {
        // First trial and improvements are certain.
        assert_eq!(acceptance_probability(None, &outcome(0.1), 10.0), 1.0);
        assert_eq!(
            acceptance_probability(Some(&outcome(0.5)), &outcome(0.7), 10.0),
            1.0
        );
        assert_eq!(
            acceptance_probability(Some(&outcome(0.5)), &outcome(0.5), 10.0),
            1.0
        );
        // A worse trial decays with the score difference.
        let p = acceptance_probability(Some(&outcome(0.8)), &outcome(0.5), 1.0);
        assert!((p - (-0.3f64 / 1.0).exp()).abs() < 1e-12);
        assert!(p < 1.0);
    }

    #[test]
    fn test_cold_start_performs_zero_iterations() {
        let schedule = AnnealingSchedule {
            initial_temperature: 0.0,
            ..Default::default()
        };
        let evaluation = MockEvaluationSignal::new();
        let mut trainer = Trainer::new(schedule, evaluation, MemorySink::new());
        let initial = ScoringWeights::default();
        let mut records = corpus();
        let result = trainer.train(&mut records, initial.clone()).unwrap();
        assert_eq!(result.iterations, 0);
        assert!(result.best_outcome.is_none());
        assert_eq!(result.best_weights, initial);
        assert!(trainer.sink().iterations.is_empty());
    }

    #[test]
    fn test_averages_dilute_over_reference_less_records() {
        let schedule = AnnealingSchedule {
            initial_temperature: 1.0,
            cool_down_by: 1.0,
            seed: Some(3),
            ..Default::default()
        };
        let evaluation = MockEvaluationSignal::new().with("prot_1", 1.0, 1.0, 0.0);
        let mut trainer = Trainer::new(schedule, evaluation, MemorySink::new());
        let mut records = corpus();
        let result = trainer.train(&mut records, ScoringWeights::default()).unwrap();
        assert_eq!(result.iterations, 1);
        // One of two records carries a reference: 1.0 / 2.
        let report = &trainer.sink().iterations[0];
        assert!((report.outcome.avg_evaluation_score - 0.5).abs() < 1e-12);
        assert!((report.outcome.avg_true_positive_rate - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_memoization_reuses_outcomes() {
        // Zero mutation bounds keep the walk stationary, so every
        // iteration after the first revisits the same configuration.
        let schedule = AnnealingSchedule {
            initial_temperature: 3.0,
            cool_down_by: 1.0,
            weight_mutation_bound: 0.0,
            database_weight_mutation_bound: 0,
            seed: Some(5),
            ..Default::default()
        };
        let evaluation = MockEvaluationSignal::new().with("prot_1", 0.8, 0.9, 0.1);
        let mut trainer = Trainer::new(schedule, evaluation, MemorySink::new());
        let mut records = corpus();
        let result = trainer.train(&mut records, ScoringWeights::default()).unwrap();
        assert_eq!(result.iterations, 3);
        let reports = &trainer.sink().iterations;
        assert!(!reports[0].from_cache);
        assert!(reports[1].from_cache);
        assert!(reports[2].from_cache);
        // The one record with a reference was evaluated exactly once.
        assert_eq!(trainer.evaluation().calls(), 1);
    }

    #[test]
    fn test_memoization_can_be_disabled() {
        let schedule = AnnealingSchedule {
            initial_temperature: 2.0,
            cool_down_by: 1.0,
            weight_mutation_bound: 0.0,
            database_weight_mutation_bound: 0,
            remember_tested: false,
            seed: Some(5),
            ..Default::default()
        };
        let evaluation = MockEvaluationSignal::new().with("prot_1", 0.8, 0.9, 0.1);
        let mut trainer = Trainer::new(schedule, evaluation, MemorySink::new());
        let mut records = corpus();
        trainer.train(&mut records, ScoringWeights::default()).unwrap();
        assert!(trainer.sink().iterations.iter().all(|r| !r.from_cache));
    }

    #[test]
    fn test_equal_scores_keep_first_configuration_as_best() {
        let schedule = AnnealingSchedule {
            initial_temperature: 4.0,
            cool_down_by: 1.0,
            weight_mutation_bound: 0.05,
            seed: Some(13),
            ..Default::default()
        };
        // Constant objective: nothing strictly beats the first trial.
        let evaluation = MockEvaluationSignal::new().with("prot_1", 0.4, 0.5, 0.2);
        let mut trainer = Trainer::new(schedule, evaluation, MemorySink::new());
        let initial = ScoringWeights::default();
        let mut records = corpus();
        let result = trainer.train(&mut records, initial.clone()).unwrap();
        assert_eq!(result.best_weights, initial);
        // Equal scores are accepted with probability 1.
        assert!(trainer.sink().iterations.iter().all(|r| r.accepted));
    }

    #[test]
    fn test_empty_collection_is_a_config_error() {
        let mut trainer = Trainer::new(
            AnnealingSchedule::default(),
            MockEvaluationSignal::new(),
            MemorySink::new(),
        );
        let err = trainer.train(&mut [], ScoringWeights::default()).unwrap_err();
        assert!(matches!(err, DescryError::Config(_)));
    }
}
