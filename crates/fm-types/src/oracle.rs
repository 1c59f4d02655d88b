//! The oracle contract consumed by the search phases, and cooperative
//! cancellation.
//!
//! The renderer and the feature extractor are external collaborators; the
//! core composes the two calls into one logical evaluation and never looks
//! at the artifact's pixel content. Every call is synchronous and blocking
//! and may take seconds; the engine performs no work while one is
//! outstanding.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::OracleError;
use crate::feature::FeatureSignature;

/// Output of one render call.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    /// Where the renderer persisted the visual artifact.
    pub artifact: PathBuf,
    pub render_time: Duration,
    pub io_time: Duration,
}

/// Output of one feature-extraction call.
#[derive(Debug, Clone)]
pub struct FeatureOutput {
    pub signature: FeatureSignature,
    pub extract_time: Duration,
}

/// One composed render + extract evaluation.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub signature: FeatureSignature,
    pub render_time: Duration,
    pub io_time: Duration,
    pub feature_time: Duration,
}

/// The expensive black box: renders denormalized parameters to a persisted
/// artifact and turns artifacts into feature signatures.
///
/// Implementations must tolerate repeated calls with different artifact
/// paths without interference; the path for each evaluation is chosen by
/// the caller.
pub trait Oracle {
    /// Renders `params` (renderer-side values, canonical key order) and
    /// persists the artifact at `artifact`.
    fn render(
        &mut self,
        params: &[(String, f64)],
        artifact: &Path,
    ) -> Result<RenderOutput, OracleError>;

    /// Extracts the perceptual signature of a persisted artifact.
    fn extract(&mut self, artifact: &Path) -> Result<FeatureOutput, OracleError>;

    /// One logical oracle call: render, then extract from the produced
    /// artifact.
    fn evaluate(
        &mut self,
        params: &[(String, f64)],
        artifact: &Path,
    ) -> Result<Evaluation, OracleError> {
        let rendered = self.render(params, artifact)?;
        let features = self.extract(&rendered.artifact)?;
        Ok(Evaluation {
            signature: features.signature,
            render_time: rendered.render_time,
            io_time: rendered.io_time,
            feature_time: features.extract_time,
        })
    }
}

/// Cooperative cancellation flag shared between the caller and a running
/// search. Polled once per oracle evaluation; an in-flight call always
/// completes before cancellation takes effect.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Why an in-phase evaluation did not yield a cost.
///
/// Cancellation travels as a value through the evaluation call sites
/// rather than unwinding the stack.
#[derive(Debug)]
pub enum Interrupt {
    Cancelled,
    Failed(crate::errors::FmError),
}

impl From<OracleError> for Interrupt {
    fn from(err: OracleError) -> Self {
        Interrupt::Failed(err.into())
    }
}

impl From<crate::errors::SpaceError> for Interrupt {
    fn from(err: crate::errors::SpaceError) -> Self {
        Interrupt::Failed(err.into())
    }
}

impl From<crate::errors::FeatureError> for Interrupt {
    fn from(err: crate::errors::FeatureError) -> Self {
        Interrupt::Failed(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingOracle {
        calls: usize,
    }

    impl Oracle for CountingOracle {
        fn render(
            &mut self,
            _params: &[(String, f64)],
            artifact: &Path,
        ) -> Result<RenderOutput, OracleError> {
            self.calls += 1;
            Ok(RenderOutput {
                artifact: artifact.to_path_buf(),
                render_time: Duration::from_millis(1),
                io_time: Duration::from_millis(1),
            })
        }

        fn extract(&mut self, _artifact: &Path) -> Result<FeatureOutput, OracleError> {
            Ok(FeatureOutput {
                signature: FeatureSignature::new(vec![vec![self.calls as f64]]).unwrap(),
                extract_time: Duration::from_millis(1),
            })
        }
    }

    #[test]
    fn evaluate_composes_render_and_extract() {
        let mut oracle = CountingOracle { calls: 0 };
        let eval = oracle
            .evaluate(&[("Length".to_string(), 2.0)], Path::new("/tmp/iter_0000"))
            .unwrap();
        assert_eq!(oracle.calls, 1);
        assert_eq!(eval.signature.flattened(), vec![1.0]);
        assert_eq!(eval.render_time, Duration::from_millis(1));
    }

    #[test]
    fn cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
