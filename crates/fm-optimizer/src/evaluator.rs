//! Shared evaluation plumbing for both search phases.
//!
//! One `probe` call is one logical oracle evaluation: clip to the unit
//! cube, denormalize through the channel's domain, render and extract,
//! score against the reference signature, fold the record into the
//! phase state, then poll cancellation.

use std::path::PathBuf;

use tracing::debug;

use fm_types::{
    clip01, perceptual_cost, CancelToken, FeatureSignature, Interrupt, IterationRecord, Oracle,
    ParameterDomain, PhaseState,
};

/// Outcome of one completed evaluation.
#[derive(Debug, Clone)]
pub struct Probe {
    pub cost: f64,
    pub signature: FeatureSignature,
    /// Whether this evaluation improved the phase's best cost.
    pub improved: bool,
}

/// Drives oracle evaluations for one phase and owns the phase state.
///
/// Failures inside a single evaluation never corrupt the best-so-far
/// state: the record is only observed after the evaluation completed.
pub struct Evaluator<'a, O: Oracle + ?Sized> {
    oracle: &'a mut O,
    reference: &'a FeatureSignature,
    domain: &'a ParameterDomain,
    cancel: &'a CancelToken,
    state: PhaseState,
}

impl<'a, O: Oracle + ?Sized> Evaluator<'a, O> {
    pub fn new(
        oracle: &'a mut O,
        reference: &'a FeatureSignature,
        domain: &'a ParameterDomain,
        cancel: &'a CancelToken,
        seed01: Vec<f64>,
    ) -> Self {
        Self {
            oracle,
            reference,
            domain,
            cancel,
            state: PhaseState::seeded(clip01(&seed01)),
        }
    }

    pub fn dims(&self) -> usize {
        self.domain.len()
    }

    pub fn state(&self) -> &PhaseState {
        &self.state
    }

    pub fn into_state(self) -> PhaseState {
        self.state
    }

    /// Evaluates the oracle at `x01`, persisting the artifact at
    /// `artifact`. Returns `Err(Interrupt::Cancelled)` when the token
    /// fired at the post-evaluation poll; the completed evaluation is
    /// still part of the recorded best-so-far.
    pub fn probe(&mut self, x01: &[f64], artifact: PathBuf) -> Result<Probe, Interrupt> {
        let clipped = clip01(x01);
        let params = self.domain.denormalize_vec(&clipped)?;

        if let Some(parent) = artifact.parent() {
            std::fs::create_dir_all(parent).map_err(fm_types::OracleError::Io)?;
        }

        let evaluation = self.oracle.evaluate(&params, &artifact)?;
        let cost = perceptual_cost(self.reference, &evaluation.signature)?;

        let record = IterationRecord {
            index: self.state.next_index(),
            params01: clipped,
            artifact,
            cost,
            render_time: evaluation.render_time,
            io_time: evaluation.io_time,
            feature_time: evaluation.feature_time,
        };
        debug!(index = record.index, cost, "oracle evaluation complete");
        let improved = self.state.observe(record);

        if self.cancel.is_cancelled() {
            return Err(Interrupt::Cancelled);
        }

        Ok(Probe {
            cost,
            signature: evaluation.signature,
            improved,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::Duration;

    use fm_types::{FeatureOutput, OracleError, RenderOutput};

    /// Cost surface: signature is the denormalized parameter values.
    struct EchoOracle {
        last_params: Vec<(String, f64)>,
    }

    impl Oracle for EchoOracle {
        fn render(
            &mut self,
            params: &[(String, f64)],
            artifact: &Path,
        ) -> Result<RenderOutput, OracleError> {
            self.last_params = params.to_vec();
            Ok(RenderOutput {
                artifact: artifact.to_path_buf(),
                render_time: Duration::from_millis(3),
                io_time: Duration::from_millis(1),
            })
        }

        fn extract(&mut self, _artifact: &Path) -> Result<FeatureOutput, OracleError> {
            let values = self.last_params.iter().map(|(_, v)| *v).collect();
            Ok(FeatureOutput {
                signature: FeatureSignature::new(vec![values]).unwrap(),
                extract_time: Duration::from_millis(2),
            })
        }
    }

    fn domain() -> ParameterDomain {
        ParameterDomain::new()
            .add("Length", 1.0, 5.0)
            .add("TipCurl", 0.0, 1.0)
    }

    #[test]
    fn probe_clips_before_denormalizing() {
        let mut oracle = EchoOracle {
            last_params: Vec::new(),
        };
        let reference = FeatureSignature::new(vec![vec![3.0, 0.5]]).unwrap();
        let domain = domain();
        let cancel = CancelToken::new();
        let dir = tempfile::tempdir().unwrap();

        let mut evaluator =
            Evaluator::new(&mut oracle, &reference, &domain, &cancel, vec![0.5, 0.5]);
        let probe = evaluator
            .probe(&[1.5, -0.25], dir.path().join("iter_0000"))
            .unwrap();

        // Clipped to [1.0, 0.0] then denormalized to [5.0, 0.0].
        assert_eq!(oracle.last_params[0].1, 5.0);
        assert_eq!(oracle.last_params[1].1, 0.0);
        let expected = (5.0f64 - 3.0).powi(2) + 0.25;
        assert!((probe.cost - expected).abs() < 1e-12);
        assert!(probe.improved);
    }

    #[test]
    fn cancellation_fires_after_the_evaluation_is_recorded() {
        let mut oracle = EchoOracle {
            last_params: Vec::new(),
        };
        let reference = FeatureSignature::new(vec![vec![3.0, 0.5]]).unwrap();
        let domain = domain();
        let cancel = CancelToken::new();
        cancel.cancel();
        let dir = tempfile::tempdir().unwrap();

        let mut evaluator =
            Evaluator::new(&mut oracle, &reference, &domain, &cancel, vec![0.5, 0.5]);
        let result = evaluator.probe(&[0.5, 0.5], dir.path().join("iter_0000"));

        assert!(matches!(result, Err(Interrupt::Cancelled)));
        // The completed evaluation still counted.
        assert_eq!(evaluator.state().evaluations(), 1);
        assert!(evaluator.state().best_cost().is_finite());
    }

    #[test]
    fn oracle_failure_leaves_best_state_untouched() {
        struct FailingOracle;
        impl Oracle for FailingOracle {
            fn render(
                &mut self,
                _params: &[(String, f64)],
                artifact: &Path,
            ) -> Result<RenderOutput, OracleError> {
                Err(OracleError::RenderFailed {
                    artifact: artifact.display().to_string(),
                    message: "renderer crashed".to_string(),
                })
            }
            fn extract(&mut self, _artifact: &Path) -> Result<FeatureOutput, OracleError> {
                unreachable!()
            }
        }

        let mut oracle = FailingOracle;
        let reference = FeatureSignature::new(vec![vec![0.0]]).unwrap();
        let domain = ParameterDomain::new().add("TipCurl", 0.0, 1.0);
        let cancel = CancelToken::new();
        let dir = tempfile::tempdir().unwrap();

        let mut evaluator = Evaluator::new(&mut oracle, &reference, &domain, &cancel, vec![0.5]);
        let result = evaluator.probe(&[0.5], dir.path().join("iter_0000"));

        assert!(matches!(result, Err(Interrupt::Failed(_))));
        assert_eq!(evaluator.state().evaluations(), 0);
        assert_eq!(evaluator.state().best_cost(), f64::INFINITY);
    }
}
