// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the spectroscopy pipeline

use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Top-level error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// GPU pipeline and spectrum extraction errors
    Spectrum(SpectrumError),
    /// Calibration state machine errors
    Calibration(CalibrationError),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// Spectrum extraction errors
///
/// Everything except `NotConfigured` is fatal to the analysis session:
/// the owner is expected to abort capture rather than continue with
/// partial GPU resources.
#[derive(Debug, Clone)]
pub enum SpectrumError {
    /// No suitable GPU adapter found
    NoAdapter(String),
    /// Device creation failed
    DeviceRequest(String),
    /// Surface or step dimensions outside what the device supports
    InvalidDimensions { width: u32, height: u32 },
    /// Render target format cannot hold the carry encoding
    UnsupportedFormat(String),
    /// A render target could not be allocated
    AllocationFailed { label: String, reason: String },
    /// Reading the reduced buffer back to the CPU failed
    Readback(String),
    /// Frame submitted before the reducer was configured
    NotConfigured,
}

/// Calibration errors
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// The two reference points are too close to produce a usable slope
    PointsTooClose { delta: f64 },
    /// Calibration needs exactly two labeled points
    NotReady,
    /// A wavelength was supplied with no outstanding request
    NoPendingRequest,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Spectrum(e) => write!(f, "Spectrum error: {}", e),
            AppError::Calibration(e) => write!(f, "Calibration error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for SpectrumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpectrumError::NoAdapter(msg) => write!(f, "No suitable GPU adapter: {}", msg),
            SpectrumError::DeviceRequest(msg) => write!(f, "Failed to create GPU device: {}", msg),
            SpectrumError::InvalidDimensions { width, height } => {
                write!(f, "Invalid surface dimensions {}x{}", width, height)
            }
            SpectrumError::UnsupportedFormat(msg) => write!(f, "Unsupported format: {}", msg),
            SpectrumError::AllocationFailed { label, reason } => {
                write!(f, "Failed to allocate {}: {}", label, reason)
            }
            SpectrumError::Readback(msg) => write!(f, "Readback failed: {}", msg),
            SpectrumError::NotConfigured => write!(f, "Reducer is not configured"),
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationError::PointsTooClose { .. } => {
                write!(f, "Calibration points are too close together")
            }
            CalibrationError::NotReady => write!(f, "Two labeled calibration points are required"),
            CalibrationError::NoPendingRequest => write!(f, "No wavelength request is pending"),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for SpectrumError {}
impl std::error::Error for CalibrationError {}

impl From<SpectrumError> for AppError {
    fn from(err: SpectrumError) -> Self {
        AppError::Spectrum(err)
    }
}

impl From<CalibrationError> for AppError {
    fn from(err: CalibrationError) -> Self {
        AppError::Calibration(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        AppError::Storage(err.to_string())
    }
}
