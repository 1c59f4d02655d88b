//! # fm-types
//!
//! Shared vocabulary for the furmatch perceptual parameter search:
//! parameter domains and unit-cube normalization, feature signatures and
//! the perceptual cost model, the oracle contract consumed by the search
//! phases, cancellation, search results and per-phase bookkeeping, and
//! the error taxonomy.

pub mod config;
pub mod errors;
pub mod feature;
pub mod oracle;
pub mod result;
pub mod space;

pub use config::*;
pub use errors::*;
pub use feature::*;
pub use oracle::*;
pub use result::*;
pub use space::*;
