//! # fm-optimizer
//!
//! The parameter-search engine for furmatch.
//!
//! Two phases over the normalized unit hypercube: a global search driven
//! by a Gaussian-process surrogate with an expected-improvement
//! acquisition, and a local refinement that estimates a Jacobian in
//! feature space by finite differences, solves the normal equations for a
//! descent direction and picks the step length with a bounded
//! golden-section line search.
//!
//! Every oracle evaluation is blocking; the phases are strictly
//! sequential and poll a cooperative cancellation token once per
//! evaluation.

mod evaluator;
mod global;
mod linesearch;
mod refine;
mod surrogate;

pub use evaluator::{Evaluator, Probe};
pub use global::GlobalSearch;
pub use linesearch::golden_section;
pub use refine::LocalRefine;
pub use surrogate::Surrogate;
