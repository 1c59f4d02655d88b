use thiserror::Error;

/// Main error type for the furmatch system
#[derive(Error, Debug)]
pub enum FmError {
    #[error("Parameter space error: {0}")]
    Space(#[from] SpaceError),

    #[error("Feature error: {0}")]
    Feature(#[from] FeatureError),

    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Preset error: {0}")]
    Preset(#[from] PresetError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Parameter-space errors
#[derive(Error, Debug)]
pub enum SpaceError {
    #[error("Unknown parameter key: {key}")]
    UnknownKey { key: String },

    #[error("Empty range for parameter {key}: min {min} >= max {max}")]
    EmptyRange { key: String, min: f64, max: f64 },

    #[error("Dimension mismatch: domain has {expected} parameters, vector has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Feature-signature errors
#[derive(Error, Debug)]
pub enum FeatureError {
    #[error("Signature shape mismatch: {message}")]
    ShapeMismatch { message: String },

    #[error("Empty signature: a signature must carry at least one value")]
    Empty,
}

/// Errors raised by the render/extract collaborator
#[derive(Error, Debug)]
pub enum OracleError {
    #[error("Render failed for artifact {artifact}: {message}")]
    RenderFailed { artifact: String, message: String },

    #[error("Feature extraction failed for artifact {artifact}: {message}")]
    ExtractFailed { artifact: String, message: String },

    #[error("Artifact not found: {artifact}")]
    ArtifactNotFound { artifact: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Preset persistence errors
#[derive(Error, Debug)]
pub enum PresetError {
    #[error("Preset not found: {path}")]
    NotFound { path: String },

    #[error("Malformed preset row {row}: {message}")]
    Malformed { row: usize, message: String },

    #[error("CSV error: {0}")]
    Csv(String),
}

/// Result type alias for furmatch operations
pub type FmResult<T> = Result<T, FmError>;

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::FmError::Config(format!($($arg)*))
    };
}

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::FmError::Internal(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = SpaceError::UnknownKey {
            key: "Lenght".to_string(),
        };
        assert!(error.to_string().contains("Unknown parameter key"));
        assert!(error.to_string().contains("Lenght"));
    }

    #[test]
    fn test_error_conversion() {
        let space_error = SpaceError::DimensionMismatch {
            expected: 15,
            actual: 10,
        };
        let fm_error: FmError = space_error.into();

        match fm_error {
            FmError::Space(_) => (),
            _ => panic!("Expected Space error"),
        }
    }

    #[test]
    fn test_macros() {
        let _config_err = config_error!("Missing required field: {}", "budget");
        let _internal_err = internal_error!("Something went wrong");
    }
}
