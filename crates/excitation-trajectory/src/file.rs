//! Persisted trajectory parameters (JSON).
//!
//! A file holds the flat parameter vector plus the DOF and harmonic counts,
//! which is enough to rebuild the [`TrajectoryGenerator`] deterministically.

use std::path::Path;

use excitation_core::{AngleUnit, ConfigError};
use serde::{Deserialize, Serialize};

use crate::error::TrajectoryError;
use crate::generator::TrajectoryGenerator;
use crate::params::{FourierParams, ParameterLayout};

/// On-disk form of an optimized trajectory. Offsets are radians.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryFile {
    pub dofs: usize,
    pub harmonics: usize,
    /// `[w_f, q0.., a.., b..]`, see [`ParameterLayout`].
    pub parameters: Vec<f64>,
}

impl TrajectoryFile {
    /// Build from parameters with a uniform harmonic count.
    pub fn from_params(params: &FourierParams) -> Result<Self, ConfigError> {
        let harmonics = params.harmonics.first().copied().unwrap_or(0);
        let layout = ParameterLayout::new(params.dofs(), harmonics);
        Ok(Self {
            dofs: layout.dofs,
            harmonics: layout.harmonics,
            parameters: layout.encode(params)?,
        })
    }

    pub const fn layout(&self) -> ParameterLayout {
        ParameterLayout::new(self.dofs, self.harmonics)
    }

    pub fn to_params(&self) -> Result<FourierParams, ConfigError> {
        let params = self.layout().decode(&self.parameters)?;
        params.validate()?;
        Ok(params)
    }

    pub fn to_generator(&self, unit: AngleUnit) -> Result<TrajectoryGenerator, TrajectoryError> {
        TrajectoryGenerator::from_params(&self.to_params()?, unit)
    }

    /// Write as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Read and shape-check a trajectory file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let file: Self = serde_json::from_str(&content)?;
        file.to_params()?;
        Ok(file)
    }
}
