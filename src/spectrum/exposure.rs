// SPDX-License-Identifier: GPL-3.0-only

//! Photometric exposure scaling
//!
//! Brings samples captured at different exposure settings onto a common
//! scale: f/1.41 (aperture value 1), ISO 100, 1/60 s.

use crate::constants::{REFERENCE_ISO, REFERENCE_SHUTTER_NS};
use tracing::warn;

/// Camera exposure snapshot for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposureSettings {
    /// Aperture value (APEX Av)
    pub aperture: f64,
    pub iso: f64,
    /// Shutter duration in nanoseconds
    pub shutter_ns: f64,
}

impl Default for ExposureSettings {
    fn default() -> Self {
        Self {
            aperture: 1.0,
            iso: REFERENCE_ISO,
            shutter_ns: REFERENCE_SHUTTER_NS,
        }
    }
}

/// Scales emitted intensities when linear output is requested
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExposureNormalizer {
    pub linear: bool,
}

impl ExposureNormalizer {
    pub fn new(linear: bool) -> Self {
        Self { linear }
    }

    /// Factor for one flush: `2^aperture / 2 * (100/iso) * (1e9/60) / shutter`
    ///
    /// Always 1 unless linear. Settings that would give a non-finite or
    /// non-positive factor fall back to 1.
    pub fn factor(&self, settings: &ExposureSettings) -> f64 {
        if !self.linear {
            return 1.0;
        }

        let factor = settings.aperture.exp2() / 2.0 * (REFERENCE_ISO / settings.iso)
            * REFERENCE_SHUTTER_NS
            / settings.shutter_ns;

        if factor.is_finite() && factor > 0.0 {
            factor
        } else {
            warn!(?settings, "Unusable exposure settings, leaving samples unscaled");
            1.0
        }
    }
}
