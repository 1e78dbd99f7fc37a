// SPDX-License-Identifier: GPL-3.0-only

use crate::calibration::{CalibrationMode, CalibrationParameters, CalibrationPoint};
use crate::constants::{CONFIG_DIR_NAME, CONFIG_FILE_NAME, CONFIG_VERSION};
use crate::errors::{AppError, AppResult};
use crate::spectrum::{LuminanceModel, PassepartoutRegion, ReductionStrategy, SpectrumOrientation};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Persisted analysis and calibration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Format version of the file
    pub version: u32,
    /// Downsampling strategy (Isotropic, Anisotropic)
    pub strategy: ReductionStrategy,
    /// Luminance model (Luma, Linear); Linear enables exposure scaling
    pub luminance: LuminanceModel,
    /// Spectrum orientation in the camera frame
    pub orientation: SpectrumOrientation,
    /// Crop rectangle in normalized capture coordinates
    pub passepartout: PassepartoutRegion,
    /// Calibration model of the experiment
    pub calibration_mode: CalibrationMode,
    /// Labeled reference points of the last calibration
    pub calibration_points: Vec<CalibrationPoint>,
    /// Last accepted calibration
    pub calibration: Option<CalibrationParameters>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            strategy: ReductionStrategy::default(),
            luminance: LuminanceModel::default(),
            orientation: SpectrumOrientation::default(),
            passepartout: PassepartoutRegion::FULL,
            calibration_mode: CalibrationMode::default(),
            calibration_points: Vec::new(),
            calibration: None,
        }
    }
}

impl Config {
    /// Default location: `<config dir>/spectroscope/config.json`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Load from the default location
    pub fn load() -> AppResult<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;

        if config.version > CONFIG_VERSION {
            return Err(AppError::Config(format!(
                "{}: unsupported version {}",
                path.display(),
                config.version
            )));
        }

        debug!(path = %path.display(), "Config loaded");
        Ok(config)
    }

    /// Save to the default location
    pub fn save(&self) -> AppResult<()> {
        self.save_to(&Self::default_path())
    }

    /// Save to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        info!(path = %path.display(), "Config saved");
        Ok(())
    }
}
