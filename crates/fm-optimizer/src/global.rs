//! Surrogate-driven global search over the unit hypercube.
//!
//! Ask/evaluate/tell loop with a hard evaluation budget: the surrogate
//! proposes a candidate, the oracle renders and scores it, the
//! observation is reported back. Improvements persist a tentative-best
//! marker next to the phase artifacts so an interrupted run can be
//! audited.

use std::path::PathBuf;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info, warn};

use fm_types::{
    CancelToken, FeatureSignature, Interrupt, Oracle, ParameterDomain, SearchOptions, SearchResult,
    TerminationReason,
};

use crate::evaluator::Evaluator;
use crate::surrogate::Surrogate;

/// The global phase: explores `[0,1]^D` without gradients.
pub struct GlobalSearch<'a, O: Oracle + ?Sized> {
    evaluator: Evaluator<'a, O>,
    options: &'a SearchOptions,
    phase_dir: PathBuf,
}

impl<'a, O: Oracle + ?Sized> GlobalSearch<'a, O> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        oracle: &'a mut O,
        reference: &'a FeatureSignature,
        domain: &'a ParameterDomain,
        options: &'a SearchOptions,
        cancel: &'a CancelToken,
        phase_dir: PathBuf,
        seed01: Vec<f64>,
    ) -> Self {
        Self {
            evaluator: Evaluator::new(oracle, reference, domain, cancel, seed01),
            options,
            phase_dir,
        }
    }

    /// Runs up to `budget` oracle evaluations and returns the best
    /// observation. Never returns an error: cancellation and oracle
    /// failures are reported through the result's flags.
    pub fn run(mut self) -> SearchResult {
        let started = Instant::now();
        let dims = self.evaluator.dims();
        let mut surrogate = Surrogate::new(dims, self.options.exploitation);
        let rng_seed = self.options.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(rng_seed);

        info!(
            dims,
            budget = self.options.budget,
            exploitation = self.options.exploitation,
            "starting global search"
        );

        for iteration in 0..self.options.budget {
            let candidate = surrogate.ask(&mut rng);
            let artifact = self.phase_dir.join(format!("iter_{iteration:04}"));

            match self.evaluator.probe(&candidate, artifact) {
                Ok(probe) => {
                    surrogate.tell(&candidate, probe.cost);
                    if probe.improved {
                        info!(iteration, cost = probe.cost, "tentative best improved");
                        self.write_best_marker(iteration);
                    }
                }
                Err(Interrupt::Cancelled) => {
                    warn!(iteration, "global search cancelled");
                    return self.finish(false, TerminationReason::Cancelled, started);
                }
                Err(Interrupt::Failed(err)) => {
                    error!(iteration, error = %err, "global search evaluation failed");
                    return self.finish(false, TerminationReason::OracleFailure, started);
                }
            }
        }

        self.finish(true, TerminationReason::BudgetExhausted, started)
    }

    /// Persists a small JSON marker recording the best observation so far.
    fn write_best_marker(&self, iteration: usize) {
        let state = self.evaluator.state();
        let marker = serde_json::json!({
            "iteration": iteration,
            "cost": state.best_cost(),
            "params01": state.best(),
        });
        let path = self.phase_dir.join("_best_so_far.json");
        if let Err(err) = std::fs::write(&path, marker.to_string()) {
            warn!(path = %path.display(), error = %err, "failed to write best marker");
        }
    }

    fn finish(self, success: bool, reason: TerminationReason, started: Instant) -> SearchResult {
        let total = started.elapsed();
        let result = self.evaluator.into_state().finish(success, reason, total);
        info!(
            best_cost = result.best_cost,
            evaluations = result.evaluations,
            reason = ?result.reason,
            "global search finished"
        );
        result
    }
}
