//! Parameter domain definitions and unit-cube normalization.
//!
//! Every search phase works on vectors in `[0,1]^D`; the domain table maps
//! each named parameter affinely between its renderer range and the unit
//! interval. The table is closed: a key without an explicit range is a
//! configuration error, never a silent unit-range fallback.

use serde::{Deserialize, Serialize};

use crate::errors::SpaceError;

/// A single named parameter dimension with its renderer-side range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDef {
    /// Renderer attribute name (e.g. "BaseWidth").
    pub name: String,
    pub min: f64,
    pub max: f64,
}

/// The full parameter domain: an ordered list of parameter definitions.
///
/// Insertion order is the canonical key order used for vectors, presets
/// and finite-difference columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDomain {
    parameters: Vec<ParameterDef>,
}

impl ParameterDomain {
    pub fn new() -> Self {
        Self {
            parameters: Vec::new(),
        }
    }

    pub fn add(mut self, name: impl Into<String>, min: f64, max: f64) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            min,
            max,
        });
        self
    }

    /// Number of dimensions D.
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Canonical key order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|p| p.name.as_str())
    }

    pub fn parameters(&self) -> &[ParameterDef] {
        &self.parameters
    }

    fn lookup(&self, key: &str) -> Result<&ParameterDef, SpaceError> {
        self.parameters
            .iter()
            .find(|p| p.name == key)
            .ok_or_else(|| SpaceError::UnknownKey {
                key: key.to_string(),
            })
    }

    /// Maps a renderer-side value into `[0,1]`.
    pub fn normalize(&self, key: &str, value: f64) -> Result<f64, SpaceError> {
        let def = self.lookup(key)?;
        if def.max <= def.min {
            return Err(SpaceError::EmptyRange {
                key: key.to_string(),
                min: def.min,
                max: def.max,
            });
        }
        Ok((value - def.min) / (def.max - def.min))
    }

    /// Maps a normalized value in `[0,1]` back to the renderer range.
    pub fn denormalize(&self, key: &str, value01: f64) -> Result<f64, SpaceError> {
        let def = self.lookup(key)?;
        if def.max <= def.min {
            return Err(SpaceError::EmptyRange {
                key: key.to_string(),
                min: def.min,
                max: def.max,
            });
        }
        Ok(def.min + value01 * (def.max - def.min))
    }

    /// Normalizes an ordered slice of renderer-side values (canonical key
    /// order) into a unit-cube vector.
    pub fn normalize_vec(&self, values: &[f64]) -> Result<Vec<f64>, SpaceError> {
        self.check_dims(values)?;
        self.parameters
            .iter()
            .zip(values)
            .map(|(def, v)| self.normalize(&def.name, *v))
            .collect()
    }

    /// Denormalizes a unit-cube vector into `(key, renderer value)` pairs
    /// in canonical key order.
    pub fn denormalize_vec(&self, values01: &[f64]) -> Result<Vec<(String, f64)>, SpaceError> {
        self.check_dims(values01)?;
        self.parameters
            .iter()
            .zip(values01)
            .map(|(def, v01)| Ok((def.name.clone(), self.denormalize(&def.name, *v01)?)))
            .collect()
    }

    /// Normalizes a `(key, value)` table into a unit-cube vector in
    /// canonical key order. Keys absent from the table or unknown to the
    /// domain are errors.
    pub fn normalize_table(&self, table: &[(String, f64)]) -> Result<Vec<f64>, SpaceError> {
        self.parameters
            .iter()
            .map(|def| {
                let value = table
                    .iter()
                    .find(|(k, _)| k == &def.name)
                    .map(|(_, v)| *v)
                    .ok_or_else(|| SpaceError::UnknownKey {
                        key: def.name.clone(),
                    })?;
                self.normalize(&def.name, value)
            })
            .collect()
    }

    fn check_dims(&self, values: &[f64]) -> Result<(), SpaceError> {
        if values.len() != self.parameters.len() {
            return Err(SpaceError::DimensionMismatch {
                expected: self.parameters.len(),
                actual: values.len(),
            });
        }
        Ok(())
    }
}

impl Default for ParameterDomain {
    fn default() -> Self {
        Self::new()
    }
}

/// Clamps every component of a normalized vector to `[0,1]`.
///
/// Applied before every oracle call; the search phases never hand the
/// renderer an out-of-cube vector.
pub fn clip01(values: &[f64]) -> Vec<f64> {
    values.iter().map(|v| v.clamp(0.0, 1.0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_domain() -> ParameterDomain {
        ParameterDomain::new()
            .add("Length", 1.0, 5.0)
            .add("BaseWidth", 0.01, 0.10)
            .add("TipCurl", 0.0, 1.0)
    }

    #[test]
    fn normalize_and_denormalize_are_affine() {
        let domain = sample_domain();
        assert_eq!(domain.normalize("Length", 1.0).unwrap(), 0.0);
        assert_eq!(domain.normalize("Length", 5.0).unwrap(), 1.0);
        assert_eq!(domain.denormalize("Length", 0.5).unwrap(), 3.0);
    }

    #[test]
    fn round_trip_within_epsilon() {
        let domain = sample_domain();
        for key in ["Length", "BaseWidth", "TipCurl"] {
            for i in 0..=100 {
                let v01 = i as f64 / 100.0;
                let v = domain.denormalize(key, v01).unwrap();
                let back = domain.normalize(key, v).unwrap();
                assert!(
                    (back - v01).abs() < 1e-9,
                    "round trip failed for {key} at {v01}: {back}"
                );
            }
        }
    }

    #[test]
    fn unknown_key_is_an_error() {
        let domain = sample_domain();
        match domain.normalize("Lenght", 2.0) {
            Err(SpaceError::UnknownKey { key }) => assert_eq!(key, "Lenght"),
            other => panic!("expected UnknownKey, got {other:?}"),
        }
    }

    #[test]
    fn empty_range_is_an_error() {
        let domain = ParameterDomain::new().add("Flat", 2.0, 2.0);
        assert!(matches!(
            domain.normalize("Flat", 2.0),
            Err(SpaceError::EmptyRange { .. })
        ));
    }

    #[test]
    fn vector_forms_follow_canonical_order() {
        let domain = sample_domain();
        let pairs = domain.denormalize_vec(&[0.0, 1.0, 0.5]).unwrap();
        assert_eq!(pairs[0], ("Length".to_string(), 1.0));
        assert_eq!(pairs[1], ("BaseWidth".to_string(), 0.10));
        assert_eq!(pairs[2], ("TipCurl".to_string(), 0.5));

        let back = domain
            .normalize_vec(&pairs.iter().map(|(_, v)| *v).collect::<Vec<_>>())
            .unwrap();
        assert!((back[0] - 0.0).abs() < 1e-9);
        assert!((back[1] - 1.0).abs() < 1e-9);
        assert!((back[2] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn dimension_mismatch_is_an_error() {
        let domain = sample_domain();
        assert!(matches!(
            domain.denormalize_vec(&[0.1, 0.2]),
            Err(SpaceError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn normalize_table_rejects_missing_keys() {
        let domain = sample_domain();
        let table = vec![
            ("Length".to_string(), 3.0),
            ("BaseWidth".to_string(), 0.055),
        ];
        assert!(matches!(
            domain.normalize_table(&table),
            Err(SpaceError::UnknownKey { .. })
        ));
    }

    #[test]
    fn clip01_bounds_every_component() {
        let clipped = clip01(&[-0.2, 0.4, 1.7]);
        assert_eq!(clipped, vec![0.0, 0.4, 1.0]);
    }
}
