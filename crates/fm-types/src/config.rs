//! Search configuration with explicit defaults.
//!
//! Built once per run and never mutated afterwards; the phases borrow it.

use serde::{Deserialize, Serialize};

/// Tunables for both search phases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Outer-iteration cap for local refinement.
    pub max_iter: usize,
    /// Line-search evaluation cap per outer iteration.
    pub max_step: usize,
    /// Finite-difference increment magnitude in normalized space.
    pub delta: f64,
    /// Global-search evaluation cap.
    pub budget: usize,
    /// Acquisition exploitation weight; 1.96 biases the acquisition
    /// toward the ~95%-confidence exploitation regime.
    pub exploitation: f64,
    /// Seed for the surrogate's sampler; `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_iter: 30,
            max_step: 20,
            delta: 0.10,
            budget: 80,
            exploitation: 1.96,
            seed: None,
        }
    }
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iter(mut self, n: usize) -> Self {
        self.max_iter = n;
        self
    }

    pub fn with_max_step(mut self, n: usize) -> Self {
        self.max_step = n;
        self
    }

    pub fn with_delta(mut self, delta: f64) -> Self {
        self.delta = delta;
        self
    }

    pub fn with_budget(mut self, n: usize) -> Self {
        self.budget = n;
        self
    }

    pub fn with_exploitation(mut self, weight: f64) -> Self {
        self.exploitation = weight;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
