//! Configuration for laser-recon
//!
//! A single TOML file describes the calibration, the optional run-filter
//! passes and the record queue:
//!
//! ```toml
//! [calibration]
//! camera_matrix = [1200.0, 0.0, 640.0, 0.0, 1200.0, 512.0, 0.0, 0.0, 1.0]
//! distort_coeffs = [-0.08, 0.012, 0.0, 0.0, 0.0]
//! homography_matrix = [0.05, 0.0, -12.0, 0.0, 0.05, -30.0, 0.0, 0.0, 1.0]
//!
//! [calibration.undistort]
//! max_iters = 20
//! eps = 1e-12
//!
//! # Omit to disable the pre-pass
//! [prefilter]
//! length = 3
//!
//! [line_filter]
//! field = "z"
//! run = { length = 3, stride = 1, gap_tolerance = 0 }
//!
//! [queue]
//! capacity = 256
//! overflow = "drop_oldest"
//! ```
//!
//! Every section falls back to defaults when missing; the default
//! calibration is the identity.

use crate::calibration::{CalibrationParameters, CalibrationTransform, UndistortConfig};
use crate::error::{ReconError, Result};
use crate::filter::{LineFilter, RunFilter};
use crate::worker::QueueConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Calibration section, row-major flat arrays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Intrinsic matrix `K`, 9 values
    pub camera_matrix: Vec<f64>,
    /// `[k1, k2, p1, p2, k3]`
    pub distort_coeffs: Vec<f64>,
    /// Image-to-plane homography `H`, 9 values
    pub homography_matrix: Vec<f64>,
    pub undistort: UndistortConfig,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        let params = CalibrationParameters::identity();
        Self {
            camera_matrix: params.camera_matrix.to_vec(),
            distort_coeffs: params.distort_coeffs.to_vec(),
            homography_matrix: params.homography_matrix.to_vec(),
            undistort: UndistortConfig::default(),
        }
    }
}

impl CalibrationConfig {
    /// Check array lengths and finiteness
    pub fn parameters(&self) -> Result<CalibrationParameters> {
        CalibrationParameters::from_slices(
            &self.camera_matrix,
            &self.distort_coeffs,
            &self.homography_matrix,
        )
    }

    /// Build the transform described by this section
    pub fn transform(&self) -> Result<CalibrationTransform> {
        CalibrationTransform::new(&self.parameters()?, self.undistort)
    }
}

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconConfig {
    pub calibration: CalibrationConfig,
    /// Run filter applied to each record before transformation
    pub prefilter: Option<RunFilter>,
    /// Run filter applied to emitted clouds
    pub line_filter: Option<LineFilter>,
    pub queue: QueueConfig,
}

impl ReconConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ReconError::Configuration(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReconError::Configuration(format!("Failed to read config {:?}: {}", path, e))
        })?;
        Self::from_toml_str(&content).map_err(|e| e.with_context(format!("{}", path.display())))
    }

    /// Save as TOML, creating parent directories as needed
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                ReconError::Configuration(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = self.to_toml_string()?;
        std::fs::write(path, content).map_err(|e| {
            ReconError::Configuration(format!("Failed to write config {:?}: {}", path, e))
        })
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ReconError::Configuration(format!("Failed to serialize config: {}", e)))
    }

    /// Reject configurations a worker could not start with
    pub fn validate(&self) -> Result<()> {
        self.calibration.transform()?;
        if self.queue.capacity == 0 {
            return Err(ReconError::Configuration(
                "queue capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn prefilter_params(&self) -> Option<RunFilter> {
        self.prefilter
    }
}
