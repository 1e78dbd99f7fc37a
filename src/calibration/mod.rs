// SPDX-License-Identifier: GPL-3.0-only

//! Pixel-to-wavelength calibration

mod engine;
pub mod types;

pub use engine::CalibrationEngine;
pub use types::{
    CalibrationEvent, CalibrationMode, CalibrationParameters, CalibrationPoint, CalibrationState,
    WavelengthRequest, WavelengthResponse,
};
