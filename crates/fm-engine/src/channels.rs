//! Optimization channels: named parameter tables searched independently.
//!
//! The fur material exposes two channels. Geometry covers strand shape,
//! root distribution, field noise and clumping; color covers the tip,
//! base and specular colors plus specular sharpness. Ranges follow the
//! renderer's usable intervals, which are narrower than the attribute
//! limits where extreme values break the groom (e.g. full Inclination
//! extrudes strands).

use fm_types::ParameterDomain;

/// One independently searched parameter channel.
#[derive(Debug, Clone)]
pub struct Channel {
    pub name: String,
    pub domain: ParameterDomain,
}

impl Channel {
    pub fn new(name: impl Into<String>, domain: ParameterDomain) -> Self {
        Self {
            name: name.into(),
            domain,
        }
    }

    /// The 15 geometry parameters.
    pub fn geometry() -> Self {
        let domain = ParameterDomain::new()
            .add("Density", 10000.0, 30000.0)
            // single strand
            .add("Length", 1.0, 5.0)
            .add("BaseWidth", 0.01, 0.10)
            .add("TipWidth", 0.0, 0.10)
            // strand root distribution
            .add("Inclination", 0.0, 0.9)
            .add("PolarNoise", 0.0, 0.5)
            .add("PolarNoiseFreq", 1.0, 20.0)
            .add("BaseCurl", 0.5, 1.0)
            .add("TipCurl", 0.0, 1.0)
            // field noise
            .add("Scraggle", 0.0, 0.5)
            .add("ScraggleFrequency", 1.0, 10.0)
            .add("ScraggleCorrelation", 0.0, 0.5)
            // clumping
            .add("Clumping", 0.0, 0.5)
            .add("ClumpingFrequency", 1.0, 50.0)
            .add("ClumpShape", 1.0, 5.0);
        Self::new("geometry", domain)
    }

    /// The 10 color parameters.
    pub fn color() -> Self {
        let domain = ParameterDomain::new()
            .add("TipColorR", 0.0, 1.0)
            .add("TipColorG", 0.0, 1.0)
            .add("TipColorB", 0.0, 1.0)
            .add("BaseColorR", 0.0, 1.0)
            .add("BaseColorG", 0.0, 1.0)
            .add("BaseColorB", 0.0, 1.0)
            .add("SpecularColorR", 0.0, 1.0)
            .add("SpecularColorG", 0.0, 1.0)
            .add("SpecularColorB", 0.0, 1.0)
            .add("SpecularSharpness", 0.0, 100.0);
        Self::new("color", domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_channel_has_fifteen_parameters() {
        let channel = Channel::geometry();
        assert_eq!(channel.name, "geometry");
        assert_eq!(channel.domain.len(), 15);
        assert_eq!(channel.domain.keys().next(), Some("Density"));
    }

    #[test]
    fn color_channel_has_ten_parameters() {
        let channel = Channel::color();
        assert_eq!(channel.name, "color");
        assert_eq!(channel.domain.len(), 10);
        // Sharpness is the only non-unit range.
        assert_eq!(
            channel.domain.denormalize("SpecularSharpness", 0.5).unwrap(),
            50.0
        );
        assert_eq!(channel.domain.denormalize("TipColorR", 0.5).unwrap(), 0.5);
    }

    #[test]
    fn geometry_ranges_round_trip() {
        let channel = Channel::geometry();
        for key in channel.domain.keys().map(str::to_owned).collect::<Vec<_>>() {
            let v = channel.domain.denormalize(&key, 0.37).unwrap();
            let back = channel.domain.normalize(&key, v).unwrap();
            assert!((back - 0.37).abs() < 1e-9, "{key}");
        }
    }
}
