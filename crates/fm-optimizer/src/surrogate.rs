//! Gaussian-process surrogate and acquisition for the global phase.
//!
//! Exact GP regression over the observed `(vector, cost)` pairs: RBF
//! kernel on the unit cube, standardized targets, Cholesky factorization
//! with jitter escalation when the kernel matrix is near-singular.
//! Candidates are proposed ask/tell style: uniform exploration of the
//! hypercube plus local perturbations of the incumbent best, ranked by an
//! expected-improvement acquisition.

use nalgebra::{Cholesky, DMatrix, DVector, Dyn};
use rand::Rng;
use tracing::trace;

/// Uniform warm-up evaluations before the first fit.
const WARMUP_OBSERVATIONS: usize = 10;
/// Candidate pool per ask: uniform draws plus incumbent perturbations.
const UNIFORM_CANDIDATES: usize = 128;
const LOCAL_CANDIDATES: usize = 64;
/// Half-width of the perturbation around the incumbent best.
const LOCAL_NOISE: f64 = 0.1;
/// RBF length scale; the search space is always the unit cube.
const LENGTH_SCALE: f64 = 0.25;
/// Base observation noise added to the kernel diagonal.
const BASE_NOISE: f64 = 1e-6;

struct Fitted {
    chol: Cholesky<f64, Dyn>,
    alpha: DVector<f64>,
    y_mean: f64,
    y_scale: f64,
}

/// Probabilistic model of the cost surface over `[0,1]^D`.
pub struct Surrogate {
    dims: usize,
    /// Acquisition exploitation weight; 1.96 is neutral (95% confidence).
    exploitation: f64,
    xs: Vec<DVector<f64>>,
    ys: Vec<f64>,
    model: Option<Fitted>,
    stale: bool,
}

impl Surrogate {
    pub fn new(dims: usize, exploitation: f64) -> Self {
        Self {
            dims,
            exploitation,
            xs: Vec::new(),
            ys: Vec::new(),
            model: None,
            stale: true,
        }
    }

    pub fn observations(&self) -> usize {
        self.ys.len()
    }

    /// Reports a completed observation back to the model.
    pub fn tell(&mut self, x01: &[f64], cost: f64) {
        debug_assert_eq!(x01.len(), self.dims);
        self.xs.push(DVector::from_column_slice(x01));
        self.ys.push(cost);
        self.stale = true;
    }

    /// Proposes the next candidate, clipped to the unit cube.
    pub fn ask<R: Rng>(&mut self, rng: &mut R) -> Vec<f64> {
        if self.ys.len() < WARMUP_OBSERVATIONS {
            return self.uniform(rng);
        }
        self.refit();
        if self.model.is_none() {
            // Kernel matrix would not factor even with jitter.
            return self.uniform(rng);
        }

        let (incumbent_x, best_cost) = {
            let (x, cost) = self.incumbent();
            (x.clone(), cost)
        };

        let mut best_candidate = self.uniform(rng);
        let mut best_score = f64::NEG_INFINITY;

        for i in 0..UNIFORM_CANDIDATES + LOCAL_CANDIDATES {
            let candidate = if i < UNIFORM_CANDIDATES {
                self.uniform(rng)
            } else {
                self.perturb(&incumbent_x, rng)
            };
            let (mean, std) = self.predict_slice(&candidate);
            let score = self.expected_improvement(mean, std, best_cost);
            if score > best_score {
                best_score = score;
                best_candidate = candidate;
            }
        }

        trace!(score = best_score, "surrogate candidate selected");
        best_candidate
    }

    /// Posterior mean and standard deviation at `x01`.
    pub fn predict(&mut self, x01: &[f64]) -> (f64, f64) {
        self.refit();
        self.predict_slice(x01)
    }

    fn predict_slice(&self, x01: &[f64]) -> (f64, f64) {
        let Some(fitted) = &self.model else {
            return (0.0, 1.0);
        };
        let x = DVector::from_column_slice(x01);
        let k = DVector::from_iterator(self.xs.len(), self.xs.iter().map(|xi| rbf(&x, xi)));

        let mean = k.dot(&fitted.alpha) * fitted.y_scale + fitted.y_mean;
        let v = fitted.chol.solve(&k);
        let var = (1.0 + BASE_NOISE - k.dot(&v)).max(0.0);
        let std = var.sqrt() * fitted.y_scale;
        (mean, std)
    }

    fn refit(&mut self) {
        if !self.stale || self.ys.is_empty() {
            return;
        }
        self.stale = false;

        let n = self.ys.len();
        let y_mean = self.ys.iter().sum::<f64>() / n as f64;
        let variance = self.ys.iter().map(|y| (y - y_mean).powi(2)).sum::<f64>() / n as f64;
        let y_scale = variance.sqrt().max(1e-12);

        let yt = DVector::from_iterator(n, self.ys.iter().map(|y| (y - y_mean) / y_scale));

        // Jitter escalation: retry the factorization with a fatter
        // diagonal when duplicated observations make K near-singular.
        self.model = None;
        for jitter in [BASE_NOISE, 1e-4, 1e-2] {
            let k = DMatrix::from_fn(n, n, |i, j| {
                rbf(&self.xs[i], &self.xs[j]) + if i == j { jitter } else { 0.0 }
            });
            if let Some(chol) = Cholesky::new(k) {
                let alpha = chol.solve(&yt);
                self.model = Some(Fitted {
                    chol,
                    alpha,
                    y_mean,
                    y_scale,
                });
                return;
            }
        }
    }

    fn incumbent(&self) -> (&DVector<f64>, f64) {
        let (idx, cost) = self
            .ys
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, y)| (i, *y))
            .unwrap_or((0, f64::INFINITY));
        (&self.xs[idx], cost)
    }

    fn uniform<R: Rng>(&self, rng: &mut R) -> Vec<f64> {
        (0..self.dims).map(|_| rng.random_range(0.0..=1.0)).collect()
    }

    fn perturb<R: Rng>(&self, base: &DVector<f64>, rng: &mut R) -> Vec<f64> {
        base.iter()
            .map(|v| (v + rng.random_range(-LOCAL_NOISE..=LOCAL_NOISE)).clamp(0.0, 1.0))
            .collect()
    }

    /// Expected improvement over the incumbent, with the predictive std
    /// scaled by the exploitation weight (1.96, the 95%-confidence
    /// weight, leaves it unchanged).
    fn expected_improvement(&self, mean: f64, std: f64, best_cost: f64) -> f64 {
        let std_eff = std * self.exploitation / 1.96;
        if std_eff < 1e-12 {
            return 0.0;
        }
        let z = (best_cost - mean) / std_eff;
        ((best_cost - mean) * normal_cdf(z) + std_eff * normal_pdf(z)).max(0.0)
    }
}

fn rbf(a: &DVector<f64>, b: &DVector<f64>) -> f64 {
    let d2 = (a - b).norm_squared();
    (-d2 / (2.0 * LENGTH_SCALE * LENGTH_SCALE)).exp()
}

fn normal_pdf(z: f64) -> f64 {
    (-0.5 * z * z).exp() / (2.0 * std::f64::consts::PI).sqrt()
}

/// Standard normal CDF via the Abramowitz-Stegun polynomial approximation
/// (absolute error < 7.5e-8).
fn normal_cdf(z: f64) -> f64 {
    let t = 1.0 / (1.0 + 0.231_641_9 * z.abs());
    let poly = t
        * (0.319_381_530
            + t * (-0.356_563_782
                + t * (1.781_477_937 + t * (-1.821_255_978 + t * 1.330_274_429))));
    let tail = normal_pdf(z.abs()) * poly;
    if z >= 0.0 {
        1.0 - tail
    } else {
        tail
    }
}
