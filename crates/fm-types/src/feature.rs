//! Feature signatures and the perceptual cost model.
//!
//! A signature is the ordered set of flattened, pre-weighted second-order
//! statistic matrices produced by the extractor collaborator, one per
//! observed layer. The search core treats it as an opaque vector; the only
//! operation it performs is the sum-of-squared-differences distance below.

use serde::{Deserialize, Serialize};

use crate::errors::FeatureError;

/// Perceptual fingerprint of one rendered image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSignature {
    layers: Vec<Vec<f64>>,
}

impl FeatureSignature {
    pub fn new(layers: Vec<Vec<f64>>) -> Result<Self, FeatureError> {
        if layers.is_empty() || layers.iter().all(Vec::is_empty) {
            return Err(FeatureError::Empty);
        }
        Ok(Self { layers })
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layers(&self) -> &[Vec<f64>] {
        &self.layers
    }

    /// Concatenation of all layers in fixed layer order.
    pub fn flattened(&self) -> Vec<f64> {
        self.layers.iter().flatten().copied().collect()
    }

    /// Total flattened length across layers.
    pub fn feature_len(&self) -> usize {
        self.layers.iter().map(Vec::len).sum()
    }

    fn check_shape(&self, other: &Self) -> Result<(), FeatureError> {
        if self.layers.len() != other.layers.len() {
            return Err(FeatureError::ShapeMismatch {
                message: format!(
                    "layer count {} vs {}",
                    self.layers.len(),
                    other.layers.len()
                ),
            });
        }
        for (l, (a, b)) in self.layers.iter().zip(&other.layers).enumerate() {
            if a.len() != b.len() {
                return Err(FeatureError::ShapeMismatch {
                    message: format!("layer {l} length {} vs {}", a.len(), b.len()),
                });
            }
        }
        Ok(())
    }
}

/// Scalar perceptual distance between two signatures:
/// `sum_l ||flatten(ref_l) - flatten(dst_l)||^2`.
///
/// Pure and deterministic; both signatures must share layer ordering and
/// per-layer weighting (applied upstream by the extractor).
pub fn perceptual_cost(
    reference: &FeatureSignature,
    candidate: &FeatureSignature,
) -> Result<f64, FeatureError> {
    reference.check_shape(candidate)?;
    let cost = reference
        .layers
        .iter()
        .zip(&candidate.layers)
        .flat_map(|(a, b)| a.iter().zip(b))
        .map(|(x, y)| (x - y) * (x - y))
        .sum();
    Ok(cost)
}
