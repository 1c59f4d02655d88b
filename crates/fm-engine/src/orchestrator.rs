//! Phase sequencing for one optimization target.
//!
//! Per channel: global search over the full hypercube, then local
//! refinement seeded from its best vector. The final preset and a
//! confirming render are persisted per channel; timings are aggregated
//! across phases. A failed phase records the failure and skips the
//! remaining channels; a meaningless seed is never forwarded.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use fm_optimizer::{GlobalSearch, LocalRefine};
use fm_types::{
    CancelToken, FeatureSignature, FmResult, Oracle, PhaseTimings, SearchOptions, SearchResult,
};

use crate::artifacts::RunLayout;
use crate::channels::Channel;
use crate::presets::{seed_from_preset, write_preset};

/// Outcome of one channel: both phase results and the persisted best.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelOutcome {
    pub channel: String,
    /// `None` when the channel was refined from a preset directly.
    pub global: Option<SearchResult>,
    /// `None` when the global phase failed and refinement was skipped.
    pub refine: Option<SearchResult>,
    /// Final best parameters, renderer-side, canonical key order.
    pub best_params: Vec<(String, f64)>,
    /// `+inf` (serialized as `null`) when no evaluation completed.
    #[serde(with = "fm_types::cost_as_nullable")]
    pub best_cost: f64,
    pub success: bool,
}

/// Aggregate report of one run, serialized to `report.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub channels: Vec<ChannelOutcome>,
    pub timings: PhaseTimings,
    pub success: bool,
}

/// Sequences the two search phases per channel for one target.
pub struct SearchOrchestrator<O: Oracle> {
    oracle: O,
    options: SearchOptions,
    cancel: CancelToken,
    layout: RunLayout,
}

impl<O: Oracle> SearchOrchestrator<O> {
    pub fn new(
        oracle: O,
        options: SearchOptions,
        cancel: CancelToken,
        run_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            oracle,
            options,
            cancel,
            layout: RunLayout::new(run_root),
        }
    }

    pub fn layout(&self) -> &RunLayout {
        &self.layout
    }

    pub fn into_oracle(self) -> O {
        self.oracle
    }

    /// Fits every channel in order against the reference artifact.
    ///
    /// Returns `Err` only for orchestration faults (reference extraction,
    /// preset IO); phase failures are reported inside the returned
    /// report.
    pub fn run_target(
        &mut self,
        reference_artifact: &Path,
        channels: &[Channel],
    ) -> FmResult<FitReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let run_started = Instant::now();
        std::fs::create_dir_all(self.layout.root())?;

        info!(
            %run_id,
            reference = %reference_artifact.display(),
            channels = channels.len(),
            "starting fit"
        );

        let mut timings = PhaseTimings::default();
        let mut outcomes = Vec::new();
        let mut run_success = true;

        for channel in channels {
            // The reference view can differ per channel (e.g. grayscale
            // statistics for geometry), so it is extracted fresh.
            let reference = self.oracle.extract(reference_artifact)?;
            timings.feature += reference.extract_time;

            let outcome = self.run_channel(channel, &reference.signature, &mut timings)?;
            let failed = !outcome.success;
            outcomes.push(outcome);

            if failed {
                run_success = false;
                warn!(
                    channel = %channel.name,
                    "channel failed; skipping remaining channels"
                );
                break;
            }
        }

        // Run wall clock supersedes the summed phase totals.
        timings.total = run_started.elapsed();
        let report = FitReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            channels: outcomes,
            timings,
            success: run_success,
        };

        let report_json = serde_json::to_string_pretty(&report)?;
        std::fs::write(self.layout.report_path(), report_json)?;
        info!(
            %run_id,
            success = report.success,
            total_secs = report.timings.total.as_secs_f64(),
            render_secs = report.timings.render.as_secs_f64(),
            io_secs = report.timings.io.as_secs_f64(),
            feature_secs = report.timings.feature.as_secs_f64(),
            other_secs = report.timings.other().as_secs_f64(),
            "fit finished"
        );
        Ok(report)
    }

    /// Refines one channel from a previously persisted preset, skipping
    /// the global phase. Useful for resuming a run whose global phase
    /// already converged, or for polishing a hand-tuned preset.
    pub fn refine_from_preset(
        &mut self,
        reference_artifact: &Path,
        channel: &Channel,
        preset: &Path,
    ) -> FmResult<ChannelOutcome> {
        std::fs::create_dir_all(self.layout.root())?;
        let reference = self.oracle.extract(reference_artifact)?;
        let seed = seed_from_preset(&channel.domain, preset)?;
        info!(
            channel = %channel.name,
            preset = %preset.display(),
            "refining from preset"
        );

        let refine = LocalRefine::new(
            &mut self.oracle,
            &reference.signature,
            &channel.domain,
            &self.options,
            &self.cancel,
            self.layout.refine_dir(&channel.name),
            seed.clone(),
        )
        .run();

        let (best01, best_cost) = if refine.best_cost.is_finite() {
            (refine.best.clone(), refine.best_cost)
        } else {
            (seed, f64::INFINITY)
        };
        let best_params = channel.domain.denormalize_vec(&best01)?;
        write_preset(&self.layout.best_preset(&channel.name), &best_params)?;

        let success = refine.success;
        Ok(ChannelOutcome {
            channel: channel.name.clone(),
            global: None,
            refine: Some(refine),
            best_params,
            best_cost,
            success,
        })
    }

    fn run_channel(
        &mut self,
        channel: &Channel,
        reference: &FeatureSignature,
        timings: &mut PhaseTimings,
    ) -> FmResult<ChannelOutcome> {
        let dims = channel.domain.len();
        info!(channel = %channel.name, dims, "starting channel");

        let global = GlobalSearch::new(
            &mut self.oracle,
            reference,
            &channel.domain,
            &self.options,
            &self.cancel,
            self.layout.global_dir(&channel.name),
            vec![0.5; dims],
        )
        .run();
        timings.merge(&global.timings);

        if !global.success {
            return Ok(ChannelOutcome {
                channel: channel.name.clone(),
                best_params: channel.domain.denormalize_vec(&global.best)?,
                best_cost: global.best_cost,
                success: false,
                global: Some(global),
                refine: None,
            });
        }

        let refine = LocalRefine::new(
            &mut self.oracle,
            reference,
            &channel.domain,
            &self.options,
            &self.cancel,
            self.layout.refine_dir(&channel.name),
            global.best.clone(),
        )
        .run();
        timings.merge(&refine.timings);

        // The refinement evaluates its seed first, so its best can only
        // drift below the global one; the guard covers an abort before
        // any evaluation landed.
        let (best01, best_cost) = if refine.best_cost.is_finite() {
            (refine.best.clone(), refine.best_cost)
        } else {
            (global.best.clone(), global.best_cost)
        };
        let best_params = channel.domain.denormalize_vec(&best01)?;

        write_preset(&self.layout.best_preset(&channel.name), &best_params)?;

        let success = refine.success;
        if success {
            // One confirming render of the persisted best.
            match self
                .oracle
                .render(&best_params, &self.layout.confirm_artifact(&channel.name))
            {
                Ok(rendered) => {
                    timings.render += rendered.render_time;
                    timings.io += rendered.io_time;
                }
                Err(err) => {
                    warn!(channel = %channel.name, error = %err, "confirming render failed");
                }
            }
        }

        info!(
            channel = %channel.name,
            best_cost,
            success,
            "channel finished"
        );
        Ok(ChannelOutcome {
            channel: channel.name.clone(),
            global: Some(global),
            refine: Some(refine),
            best_params,
            best_cost,
            success,
        })
    }
}
