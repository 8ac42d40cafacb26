use thiserror::Error;

/// Top-level error type for excitation-core.
#[derive(Debug, Error)]
pub enum ExcitationError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Simulation error: {0}")]
    Simulation(#[from] SimulationError),
}

/// Configuration and parameter errors.
///
/// Dimension mismatches in explicit trajectory parameters land here too: they
/// are fatal and surfaced immediately.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Dimension mismatch for {field}: expected {expected}, got {got}")]
    DimensionMismatch {
        field: String,
        expected: usize,
        got: usize,
    },

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Invalid bounds for {field}: low ({low}) > high ({high})")]
    InvalidBounds { field: String, low: f64, high: f64 },

    #[error("No joints configured")]
    MissingJoints,
}

impl ConfigError {
    /// Shorthand for [`ConfigError::DimensionMismatch`].
    pub fn dimension(field: impl Into<String>, expected: usize, got: usize) -> Self {
        Self::DimensionMismatch {
            field: field.into(),
            expected,
            got,
        }
    }

    /// Shorthand for [`ConfigError::InvalidValue`].
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors raised by the simulation collaborator.
///
/// Numerical trouble inside a simulation is expected to show up as NaNs in
/// the time series, not as one of these. These abort the optimization run.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Simulation failed: {0}")]
    Failed(String),

    #[error("Simulation output shape mismatch for {what}: expected {expected}, got {got}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excitation_error_from_config_error() {
        let err = ConfigError::MissingJoints;
        let top: ExcitationError = err.into();
        assert!(matches!(top, ExcitationError::Config(_)));
        assert!(top.to_string().contains("No joints"));
    }

    #[test]
    fn excitation_error_from_simulation_error() {
        let err = SimulationError::Failed("solver blew up".into());
        let top: ExcitationError = err.into();
        assert!(matches!(top, ExcitationError::Simulation(_)));
        assert!(top.to_string().contains("solver blew up"));
    }

    #[test]
    fn config_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let config_err: ConfigError = io_err.into();
        assert!(matches!(config_err, ConfigError::Io(_)));
    }

    #[test]
    fn config_error_display_messages() {
        assert_eq!(
            ConfigError::dimension("nf", 3, 2).to_string(),
            "Dimension mismatch for nf: expected 3, got 2"
        );
        assert_eq!(
            ConfigError::invalid("w_f", "must be > 0").to_string(),
            "Invalid value for w_f: must be > 0"
        );
        assert_eq!(
            ConfigError::InvalidBounds {
                field: "bounds.offset".into(),
                low: 1.0,
                high: -1.0
            }
            .to_string(),
            "Invalid bounds for bounds.offset: low (1) > high (-1)"
        );
        assert_eq!(ConfigError::MissingJoints.to_string(), "No joints configured");
    }

    #[test]
    fn simulation_error_display_messages() {
        assert_eq!(
            SimulationError::Failed("timeout".into()).to_string(),
            "Simulation failed: timeout"
        );
        assert_eq!(
            SimulationError::ShapeMismatch {
                what: "torques",
                expected: 6,
                got: 5
            }
            .to_string(),
            "Simulation output shape mismatch for torques: expected 6, got 5"
        );
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn errors_are_send_sync() {
        assert_send_sync::<ConfigError>();
        assert_send_sync::<SimulationError>();
    }
}
