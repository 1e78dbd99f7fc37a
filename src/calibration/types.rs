// SPDX-License-Identifier: GPL-3.0-only

//! Calibration data types and the messages exchanged with the presenter

use serde::{Deserialize, Serialize};
use std::fmt;

/// Progress of a two-point calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CalibrationState {
    /// Passive mode, no calibration in use or in progress
    #[default]
    Uncalibrated,
    /// Collecting reference points
    Start,
    /// Waiting for the wavelength of the first point
    FirstPointSelected,
    /// Waiting for the wavelength of the second point
    SecondPointSelected,
    Calibrated,
}

impl fmt::Display for CalibrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uncalibrated => "uncalibrated",
            Self::Start => "start",
            Self::FirstPointSelected => "first point selected",
            Self::SecondPointSelected => "second point selected",
            Self::Calibrated => "calibrated",
        };
        f.write_str(name)
    }
}

/// Calibration model declared by the experiment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CalibrationMode {
    /// Wavelength is linear in pixel position
    #[default]
    XLinear,
    Unknown,
}

impl CalibrationMode {
    /// Parse the experiment attribute; anything unrecognized is `Unknown`
    pub fn from_attribute(value: Option<&str>) -> Self {
        match value {
            Some("xLinear") => Self::XLinear,
            _ => Self::Unknown,
        }
    }
}

/// A reference point on the spectrum
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    /// Position along the emitted spectrum, 0 at the blue end
    pub pixel_position: f64,
    /// Wavelength in nm once the operator has entered it
    pub wavelength: Option<f64>,
}

impl CalibrationPoint {
    pub fn new(pixel_position: f64) -> Self {
        Self {
            pixel_position,
            wavelength: None,
        }
    }

    pub fn labeled(pixel_position: f64, wavelength: f64) -> Self {
        Self {
            pixel_position,
            wavelength: Some(wavelength),
        }
    }
}

/// Linear mapping `wavelength = slope * pixel + intercept`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationParameters {
    pub slope: f64,
    pub intercept: f64,
}

impl CalibrationParameters {
    pub fn wavelength_at(&self, pixel: f64) -> f64 {
        self.slope * pixel + self.intercept
    }

    /// Inverse mapping; `None` for a flat calibration
    pub fn pixel_at(&self, wavelength: f64) -> Option<f64> {
        if self.slope == 0.0 {
            return None;
        }
        Some((wavelength - self.intercept) / self.slope)
    }
}

/// Ask the presenter for the wavelength of a staged point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavelengthRequest {
    /// 0 for the first point, 1 for the second
    pub point_index: usize,
    pub pixel_position: f64,
    /// Pre-filled value offered to the operator
    pub suggested_wavelength: f64,
}

/// Presenter's answer to a [`WavelengthRequest`]
#[derive(Debug, Clone, PartialEq)]
pub enum WavelengthResponse {
    /// Raw text as typed; parsed as a decimal number
    Entered(String),
    Cancelled,
}

/// Lifecycle notifications for the presenter
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationEvent {
    Uncalibrated,
    Started,
    WavelengthRequested(WavelengthRequest),
    PointsUpdated {
        points: Vec<CalibrationPoint>,
        state: CalibrationState,
    },
    Completed {
        slope: f64,
        intercept: f64,
    },
    Reset,
    Dismissed,
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_attribute() {
        assert_eq!(
            CalibrationMode::from_attribute(Some("xLinear")),
            CalibrationMode::XLinear
        );
        assert_eq!(
            CalibrationMode::from_attribute(Some("xlinear")),
            CalibrationMode::Unknown
        );
        assert_eq!(CalibrationMode::from_attribute(None), CalibrationMode::Unknown);
    }

    #[test]
    fn test_parameters_inverse() {
        let params = CalibrationParameters {
            slope: 0.65,
            intercept: 355.0,
        };
        assert!((params.wavelength_at(100.0) - 420.0).abs() < 1e-9);
        let pixel = params.pixel_at(680.0).unwrap();
        assert!((pixel - 500.0).abs() < 1e-9);

        let flat = CalibrationParameters {
            slope: 0.0,
            intercept: 500.0,
        };
        assert!(flat.pixel_at(500.0).is_none());
    }
}
