//! End-to-end demo run against a synthetic renderer.
//!
//! Renders a ground-truth parameter set into a reference artifact, then
//! fits both channels against it. The synthetic oracle maps normalized
//! parameters through a fixed linear feature bank and persists the
//! feature vector as the artifact, so the whole pipeline runs in seconds
//! without a real renderer attached.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::info;

use fm_engine::{Channel, SearchOrchestrator};
use fm_types::{
    CancelToken, FeatureOutput, FeatureSignature, Oracle, OracleError, ParameterDomain,
    RenderOutput, SearchOptions,
};

const FEATURE_BANK: usize = 32;

#[derive(Serialize, Deserialize)]
struct SyntheticArtifact {
    feature: Vec<f64>,
}

/// Deterministic stand-in for the renderer + extractor pair.
///
/// Parameters absent from a render call (the other channel's) are held at
/// their range midpoints, so candidate and reference features always have
/// the same shape.
struct SyntheticOracle {
    domain: ParameterDomain,
}

impl SyntheticOracle {
    fn new(channels: &[Channel]) -> Self {
        let mut domain = ParameterDomain::new();
        for channel in channels {
            for def in channel.domain.parameters() {
                domain = domain.add(&def.name, def.min, def.max);
            }
        }
        Self { domain }
    }

    fn weight(dim: usize, bank: usize) -> f64 {
        ((dim as f64 + 1.0) * (bank as f64 + 1.0) * 0.37).sin()
    }

    fn feature_of(&self, params: &[(String, f64)]) -> Result<Vec<f64>, OracleError> {
        let mut x01 = Vec::with_capacity(self.domain.len());
        for def in self.domain.parameters() {
            let value = params
                .iter()
                .find(|(k, _)| k == &def.name)
                .map(|(_, v)| *v)
                .unwrap_or((def.min + def.max) / 2.0);
            let v01 = self.domain.normalize(&def.name, value).map_err(|e| {
                OracleError::RenderFailed {
                    artifact: String::new(),
                    message: e.to_string(),
                }
            })?;
            x01.push(v01);
        }
        Ok((0..FEATURE_BANK)
            .map(|bank| {
                x01.iter()
                    .enumerate()
                    .map(|(dim, v)| Self::weight(dim, bank) * v)
                    .sum()
            })
            .collect())
    }
}

impl Oracle for SyntheticOracle {
    fn render(
        &mut self,
        params: &[(String, f64)],
        artifact: &Path,
    ) -> Result<RenderOutput, OracleError> {
        let render_started = Instant::now();
        let feature = self.feature_of(params)?;
        let render_time = render_started.elapsed();

        let io_started = Instant::now();
        let body = serde_json::to_string(&SyntheticArtifact { feature }).map_err(|e| {
            OracleError::RenderFailed {
                artifact: artifact.display().to_string(),
                message: e.to_string(),
            }
        })?;
        std::fs::write(artifact, body)?;
        Ok(RenderOutput {
            artifact: artifact.to_path_buf(),
            render_time,
            io_time: io_started.elapsed(),
        })
    }

    fn extract(&mut self, artifact: &Path) -> Result<FeatureOutput, OracleError> {
        let started = Instant::now();
        let body = std::fs::read_to_string(artifact).map_err(|_| OracleError::ArtifactNotFound {
            artifact: artifact.display().to_string(),
        })?;
        let parsed: SyntheticArtifact =
            serde_json::from_str(&body).map_err(|e| OracleError::ExtractFailed {
                artifact: artifact.display().to_string(),
                message: e.to_string(),
            })?;
        let signature = FeatureSignature::new(vec![parsed.feature]).map_err(|e| {
            OracleError::ExtractFailed {
                artifact: artifact.display().to_string(),
                message: e.to_string(),
            }
        })?;
        Ok(FeatureOutput {
            signature,
            extract_time: started.elapsed(),
        })
    }
}

fn ground_truth(channels: &[Channel]) -> Vec<(String, f64)> {
    let mut params = Vec::new();
    for channel in channels {
        for (i, def) in channel.domain.parameters().iter().enumerate() {
            // Spread the targets across the cube, away from the midpoints.
            let t = 0.2 + 0.6 * ((i % 5) as f64 / 4.0);
            params.push((def.name.clone(), def.min + t * (def.max - def.min)));
        }
    }
    params
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let run_root: PathBuf = std::env::var("FURMATCH_RUN_DIR")
        .unwrap_or_else(|_| "runs/fit_demo".to_string())
        .into();
    std::fs::create_dir_all(&run_root)?;

    let channels = vec![Channel::geometry(), Channel::color()];
    let mut oracle = SyntheticOracle::new(&channels);

    let target = ground_truth(&channels);
    let reference_artifact = run_root.join("target");
    oracle.render(&target, &reference_artifact)?;
    info!(reference = %reference_artifact.display(), "rendered ground-truth reference");

    let options = SearchOptions::new()
        .with_budget(40)
        .with_max_iter(8)
        .with_max_step(10)
        .with_seed(7);
    let mut orchestrator =
        SearchOrchestrator::new(oracle, options, CancelToken::new(), run_root.clone());
    let report = orchestrator.run_target(&reference_artifact, &channels)?;

    for outcome in &report.channels {
        info!(
            channel = %outcome.channel,
            best_cost = outcome.best_cost,
            success = outcome.success,
            "fitted"
        );
    }
    info!(
        report = %run_root.join("report.json").display(),
        success = report.success,
        "demo finished"
    );
    Ok(())
}
