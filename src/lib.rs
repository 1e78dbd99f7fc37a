// SPDX-License-Identifier: GPL-3.0-only

//! Spectroscope - spectral extraction and wavelength calibration
//!
//! This library turns camera frames of a dispersed light source into
//! one-dimensional intensity spectra and maps pixel positions to wavelengths.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`spectrum`]: GPU reduction pipeline, CPU reference reducer, decoding
//!   and exposure scaling
//! - [`calibration`]: Two-point pixel-to-wavelength calibration
//! - [`shaders`]: WGSL sources and readback helpers
//! - [`gpu`]: Device creation
//! - [`config`]: User configuration handling
//!
//! # Example
//!
//! ```no_run
//! use spectroscope::spectrum::{
//!     ExposureSettings, FrameInput, LuminanceModel, ReductionStrategy, SoftwareReducer,
//!     SpectrumExtractor,
//! };
//!
//! let mut reducer = SoftwareReducer::new(640, 480, LuminanceModel::Luma);
//! reducer.upload(&vec![0u8; 640 * 480 * 4]).unwrap();
//!
//! let mut extractor = SpectrumExtractor::new(reducer, ReductionStrategy::Anisotropic, false);
//! extractor.analyze(&FrameInput::default()).unwrap();
//!
//! let (mut intensity, mut positions) = (Vec::new(), Vec::new());
//! extractor.write_to_buffers(&ExposureSettings::default(), &mut intensity, &mut positions);
//! ```

pub mod calibration;
pub mod config;
pub mod constants;
pub mod errors;
pub mod gpu;
pub mod shaders;
pub mod spectrum;

// Re-export commonly used types
pub use calibration::{CalibrationEngine, CalibrationParameters, CalibrationState};
pub use config::Config;
pub use errors::{AppError, AppResult, CalibrationError, SpectrumError};
pub use spectrum::{SpectrumExtractor, SpectrumOrientation};
