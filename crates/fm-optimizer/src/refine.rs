//! Local refinement: finite-difference Jacobian descent in feature space
//! with a bounded line search.
//!
//! No analytic gradient is available from the oracle. Each outer iteration
//! spends one evaluation on the current point, `D` on single-coordinate
//! perturbations to build the Jacobian `A`, solves the normal equations
//! `(AᵗA)s = Aᵗb` for a descent direction, and up to `max_step`
//! evaluations on a golden-section line search along that direction.

use std::path::PathBuf;
use std::time::Instant;

use nalgebra::{DMatrix, DVector};
use tracing::{debug, error, info, warn};

use fm_types::{
    clip01, CancelToken, FeatureSignature, Interrupt, Oracle, ParameterDomain, SearchOptions,
    SearchResult, TerminationReason,
};

use crate::evaluator::Evaluator;
use crate::linesearch::golden_section;

/// Below this, a Jacobian or direction carries no usable signal.
const ZERO_SIGNAL: f64 = 1e-12;

/// The refinement phase: descends from a seed vector.
pub struct LocalRefine<'a, O: Oracle + ?Sized> {
    evaluator: Evaluator<'a, O>,
    options: &'a SearchOptions,
    phase_dir: PathBuf,
    ref_flat: DVector<f64>,
    x: Vec<f64>,
}

impl<'a, O: Oracle + ?Sized> LocalRefine<'a, O> {
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
        let x = clip01(&seed01);
        Self {
            evaluator: Evaluator::new(oracle, reference, domain, cancel, x.clone()),
            options,
            phase_dir,
            ref_flat: DVector::from_vec(reference.flattened()),
            x,
        }
    }

    /// Runs the descent and returns the best observation across all inner
    /// and outer evaluations, never the last accepted point. Cancellation
    /// and failures are reported through the result's flags.
    pub fn run(mut self) -> SearchResult {
        let started = Instant::now();
        info!(
            dims = self.evaluator.dims(),
            max_iter = self.options.max_iter,
            max_step = self.options.max_step,
            delta = self.options.delta,
            "starting local refinement"
        );

        let (success, reason) = match self.descend() {
            Ok(reason) => (
                matches!(
                    reason,
                    TerminationReason::BudgetExhausted | TerminationReason::Stagnation
                ),
                reason,
            ),
            Err(Interrupt::Cancelled) => {
                warn!("local refinement cancelled");
                (false, TerminationReason::Cancelled)
            }
            Err(Interrupt::Failed(err)) => {
                error!(error = %err, "local refinement evaluation failed");
                (false, TerminationReason::OracleFailure)
            }
        };

        let total = started.elapsed();
        let result = self.evaluator.into_state().finish(success, reason, total);
        info!(
            best_cost = result.best_cost,
            evaluations = result.evaluations,
            reason = ?result.reason,
            "local refinement finished"
        );
        result
    }

    fn descend(&mut self) -> Result<TerminationReason, Interrupt> {
        let dims = self.evaluator.dims();
        let delta = self.options.delta;
        let mut r_prev = f64::INFINITY;

        for iteration in 0..self.options.max_iter {
            // 0) current point.
            let center = self
                .evaluator
                .probe(&self.x, self.phase_dir.join(format!("iter_{iteration:04}")))?;
            let cost_prev = center.cost;
            let g0 = DVector::from_vec(center.signature.flattened());

            // 1) finite-difference Jacobian, one oracle call per dimension.
            // The increment sign points away from the 0.5 midpoint so the
            // perturbed coordinate never needs boundary clipping.
            let mut a = DMatrix::zeros(g0.len(), dims);
            for dim in 0..dims {
                let increment = if self.x[dim] < 0.5 { delta } else { -delta };
                let mut xd = self.x.clone();
                xd[dim] += increment;
                let artifact = self
                    .phase_dir
                    .join("grad")
                    .join(format!("iter_{iteration:04}_{dim:02}"));
                let probe = self.evaluator.probe(&xd, artifact)?;
                let gd = DVector::from_vec(probe.signature.flattened());
                a.set_column(dim, &((gd - &g0) / increment));
            }

            // A zero Jacobian means the renderer did not respond to any
            // perturbation; there is no direction to follow.
            if a.amax() <= ZERO_SIGNAL {
                info!(iteration, "no feature response to any perturbation");
                return Ok(TerminationReason::Stagnation);
            }

            // 2) descent direction from the normal equations.
            let b = &self.ref_flat - &g0;
            let ata = a.tr_mul(&a);
            let atb = a.tr_mul(&b);
            let s = match ata.clone().lu().solve(&atb) {
                Some(s) => s,
                None => {
                    error!(iteration, "normal-equation matrix is singular");
                    self.dump_normal_matrix(iteration, &ata);
                    return Ok(TerminationReason::SingularMatrix);
                }
            };

            let r_this = (&a * &s - &b).norm_squared();

            // 3) unit-scale the direction; the scale bounds the step.
            let beta = s.amax();
            if beta <= ZERO_SIGNAL {
                info!(iteration, "descent direction vanished");
                return Ok(TerminationReason::Stagnation);
            }
            let w = &s / beta;

            // 4) bounded line search for the step length.
            let step_root = self.phase_dir.join("step");
            let x_base = self.x.clone();
            let evaluator = &mut self.evaluator;
            let mut step = 0usize;
            let (alpha_star, cost_this) = golden_section(
                |alpha| {
                    let xt: Vec<f64> = x_base
                        .iter()
                        .zip(w.iter())
                        .map(|(xi, wi)| xi + alpha * wi)
                        .collect();
                    let artifact = step_root.join(format!("iter_{iteration:04}_{step:02}"));
                    step += 1;
                    Ok(evaluator.probe(&xt, artifact)?.cost)
                },
                0.0,
                beta,
                self.options.max_step,
            )?;

            debug!(
                iteration,
                cost_prev,
                cost_this,
                residual = r_this,
                alpha = alpha_star,
                "outer iteration complete"
            );

            // 5) stop only when neither the cost nor the residual improved.
            if cost_this >= cost_prev && r_this >= r_prev {
                return Ok(TerminationReason::Stagnation);
            }

            self.x = clip01(
                &x_base
                    .iter()
                    .zip(w.iter())
                    .map(|(xi, wi)| xi + alpha_star * wi)
                    .collect::<Vec<_>>(),
            );
            r_prev = r_this;
        }

        Ok(TerminationReason::BudgetExhausted)
    }

    /// Persists `AᵗA` for postmortem when the solve fails.
    fn dump_normal_matrix(&self, iteration: usize, ata: &DMatrix<f64>) {
        let rows: Vec<Vec<f64>> = ata.row_iter().map(|r| r.iter().copied().collect()).collect();
        let path = self.phase_dir.join(format!("ata_iter_{iteration:04}.json"));
        match serde_json::to_string_pretty(&rows) {
            Ok(json) => {
                if let Err(err) = std::fs::write(&path, json) {
                    warn!(path = %path.display(), error = %err, "failed to dump normal matrix");
                }
            }
            Err(err) => warn!(error = %err, "failed to serialize normal matrix"),
        }
    }
}
