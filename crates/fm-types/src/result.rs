//! Search results and per-phase bookkeeping.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Why a search phase stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TerminationReason {
    /// The fixed evaluation budget ran out.
    BudgetExhausted,
    /// Neither the cost nor the normal-equation residual improved.
    Stagnation,
    /// The cancellation token fired at a poll point.
    Cancelled,
    /// The render/extract collaborator failed during an evaluation.
    OracleFailure,
    /// The normal-equation matrix was not invertible.
    SingularMatrix,
}

/// One oracle evaluation as recorded by the owning phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// Monotonic evaluation index within the phase.
    pub index: usize,
    /// Normalized (clipped) vector handed to the oracle.
    pub params01: Vec<f64>,
    /// Where the evaluation's artifact was persisted.
    pub artifact: PathBuf,
    pub cost: f64,
    pub render_time: Duration,
    pub io_time: Duration,
    pub feature_time: Duration,
}

/// Wall-clock split of a phase (or an aggregated run).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTimings {
    pub render: Duration,
    pub io: Duration,
    pub feature: Duration,
    pub total: Duration,
}

impl PhaseTimings {
    /// Time spent outside render/io/feature (surrogate fits, linear
    /// algebra, bookkeeping).
    pub fn other(&self) -> Duration {
        self.total
            .saturating_sub(self.render)
            .saturating_sub(self.io)
            .saturating_sub(self.feature)
    }

    pub fn merge(&mut self, other: &PhaseTimings) {
        self.render += other.render;
        self.io += other.io;
        self.feature += other.feature;
        self.total += other.total;
    }
}

/// Outcome of one search phase, always returned (never thrown past the
/// phase boundary).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Best vector observed across all evaluations of the phase.
    pub best: Vec<f64>,
    #[serde(with = "cost_as_nullable")]
    pub best_cost: f64,
    pub success: bool,
    pub reason: TerminationReason,
    /// Number of oracle evaluations the phase issued.
    pub evaluations: usize,
    pub timings: PhaseTimings,
}

/// Mutable state of a running phase: the best observation, the evaluation
/// counter and the timing accumulators.
///
/// Single-writer, owned by the phase that created it; replaces the global
/// counters the procedure would otherwise capture in nested closures.
#[derive(Debug, Clone)]
pub struct PhaseState {
    best: Vec<f64>,
    best_cost: f64,
    evaluations: usize,
    timings: PhaseTimings,
    records: Vec<IterationRecord>,
}

impl PhaseState {
    /// Seeds the state with an initial vector and an unknown (+inf) cost;
    /// no assumption that the seed is evaluated first.
    pub fn seeded(seed: Vec<f64>) -> Self {
        Self {
            best: seed,
            best_cost: f64::INFINITY,
            evaluations: 0,
            timings: PhaseTimings::default(),
            records: Vec::new(),
        }
    }

    /// Folds one completed evaluation into the state. Returns `true` when
    /// the evaluation improved on the best cost so far.
    pub fn observe(&mut self, record: IterationRecord) -> bool {
        self.evaluations += 1;
        self.timings.render += record.render_time;
        self.timings.io += record.io_time;
        self.timings.feature += record.feature_time;

        let improved = record.cost < self.best_cost;
        if improved {
            self.best_cost = record.cost;
            self.best = record.params01.clone();
        }
        self.records.push(record);
        improved
    }

    pub fn best(&self) -> &[f64] {
        &self.best
    }

    pub fn best_cost(&self) -> f64 {
        self.best_cost
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    pub fn records(&self) -> &[IterationRecord] {
        &self.records
    }

    pub fn next_index(&self) -> usize {
        self.evaluations
    }

    /// Seals the state into a phase result, stamping the total wall time.
    pub fn finish(self, success: bool, reason: TerminationReason, total: Duration) -> SearchResult {
        let mut timings = self.timings;
        timings.total = total;
        SearchResult {
            best: self.best,
            best_cost: self.best_cost,
            success,
            reason,
            evaluations: self.evaluations,
            timings,
        }
    }
}

/// Serde adapter for best-cost fields. A phase that recorded no
/// evaluation carries `+inf`, which JSON cannot represent: non-finite
/// costs serialize as `null`, and `null` reads back as `+inf`.
pub mod cost_as_nullable {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(cost: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if cost.is_finite() {
            serializer.serialize_some(cost)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(index: usize, cost: f64) -> IterationRecord {
        IterationRecord {
            index,
            params01: vec![index as f64 * 0.1; 2],
            artifact: PathBuf::from(format!("/tmp/iter_{index:04}")),
            cost,
            render_time: Duration::from_millis(10),
            io_time: Duration::from_millis(2),
            feature_time: Duration::from_millis(5),
        }
    }

    #[test]
    fn best_cost_is_monotone_non_increasing() {
        let mut state = PhaseState::seeded(vec![0.5, 0.5]);
        let costs = [4.0, 2.0, 3.0, 1.5, 1.5, 9.0];
        let mut last_best = f64::INFINITY;
        for (i, &c) in costs.iter().enumerate() {
            state.observe(record(i, c));
            assert!(state.best_cost() <= last_best);
            last_best = state.best_cost();
        }
        assert_eq!(state.best_cost(), 1.5);
        assert_eq!(state.best(), &[0.3, 0.3]);
        assert_eq!(state.evaluations(), 6);
    }

    #[test]
    fn observe_reports_improvement() {
        let mut state = PhaseState::seeded(vec![0.0]);
        assert!(state.observe(record(0, 2.0)));
        assert!(!state.observe(record(1, 2.0)));
        assert!(state.observe(record(2, 1.0)));
    }

    #[test]
    fn seed_is_returned_when_nothing_was_observed() {
        let state = PhaseState::seeded(vec![0.25, 0.75]);
        let result = state.finish(false, TerminationReason::Cancelled, Duration::ZERO);
        assert_eq!(result.best, vec![0.25, 0.75]);
        assert_eq!(result.best_cost, f64::INFINITY);
        assert_eq!(result.evaluations, 0);
    }

    #[test]
    fn unevaluated_best_cost_survives_json() {
        let result = PhaseState::seeded(vec![0.5]).finish(
            false,
            TerminationReason::OracleFailure,
            Duration::ZERO,
        );
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"best_cost\":null"), "{json}");

        let back: SearchResult = serde_json::from_str(&json).unwrap();
        assert!(back.best_cost.is_infinite());
        assert_eq!(back.best, vec![0.5]);
        assert_eq!(back.reason, TerminationReason::OracleFailure);
    }

    #[test]
    fn finite_best_cost_round_trips_unchanged() {
        let mut state = PhaseState::seeded(vec![0.0]);
        state.observe(record(0, 1.25));
        let result = state.finish(
            true,
            TerminationReason::BudgetExhausted,
            Duration::from_millis(1),
        );
        let json = serde_json::to_string(&result).unwrap();
        let back: SearchResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.best_cost, 1.25);
    }

    #[test]
    fn finish_accumulates_timings() {
        let mut state = PhaseState::seeded(vec![0.0]);
        state.observe(record(0, 1.0));
        state.observe(record(1, 0.5));
        let result = state.finish(
            true,
            TerminationReason::BudgetExhausted,
            Duration::from_millis(100),
        );
        assert_eq!(result.timings.render, Duration::from_millis(20));
        assert_eq!(result.timings.io, Duration::from_millis(4));
        assert_eq!(result.timings.feature, Duration::from_millis(10));
        assert_eq!(result.timings.total, Duration::from_millis(100));
        assert_eq!(result.timings.other(), Duration::from_millis(66));
    }
}
