//! # fm-engine
//!
//! Orchestration for the furmatch parameter search: per-channel parameter
//! tables, the on-disk artifact layout, preset persistence, and the
//! orchestrator that sequences the global and refinement phases for each
//! channel of a target.

pub mod artifacts;
pub mod channels;
pub mod orchestrator;
pub mod presets;

pub use artifacts::RunLayout;
pub use channels::Channel;
pub use orchestrator::{ChannelOutcome, FitReport, SearchOrchestrator};
pub use presets::{read_preset, seed_from_preset, write_preset};
