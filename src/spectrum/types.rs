// SPDX-License-Identifier: GPL-3.0-only

//! Spectrum pipeline types
//!
//! Orientation, crop region and the closed sets of strategy variants that
//! select how a frame is reduced.

use crate::constants::{ANISOTROPIC_STEPS, ISOTROPIC_STEPS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// Where the dispersion (wavelength) direction lies in the captured frame
/// and which end is red
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpectrumOrientation {
    /// Vertical spectrum, long wavelengths at the top
    #[default]
    VerticalRedUp,
    /// Vertical spectrum, short wavelengths at the top
    VerticalBlueUp,
    /// Horizontal spectrum, long wavelengths on the right
    HorizontalRedRight,
    /// Horizontal spectrum, short wavelengths on the right
    HorizontalBlueRight,
}

impl SpectrumOrientation {
    /// All orientations for UI iteration
    pub const ALL: [SpectrumOrientation; 4] = [
        SpectrumOrientation::VerticalRedUp,
        SpectrumOrientation::VerticalBlueUp,
        SpectrumOrientation::HorizontalRedRight,
        SpectrumOrientation::HorizontalBlueRight,
    ];

    /// Buffer axis the wavelength varies along
    ///
    /// The capture's vertical axis maps onto buffer columns and its
    /// horizontal axis onto buffer rows (see `geometry::scissor_rect`).
    pub fn dispersion_axis(self) -> DispersionAxis {
        match self {
            Self::VerticalRedUp | Self::VerticalBlueUp => DispersionAxis::Columns,
            Self::HorizontalRedRight | Self::HorizontalBlueRight => DispersionAxis::Rows,
        }
    }

    /// Whether the natural scan order starts at the red end
    ///
    /// Scan order runs from the bottom of the frame upwards for vertical
    /// spectra and from the right edge leftwards for horizontal ones.
    pub fn is_reversed(self) -> bool {
        matches!(self, Self::VerticalBlueUp | Self::HorizontalRedRight)
    }

    /// Identifier used in configuration files and on the command line
    pub fn as_str(self) -> &'static str {
        match self {
            Self::VerticalRedUp => "vertical-red-up",
            Self::VerticalBlueUp => "vertical-blue-up",
            Self::HorizontalRedRight => "horizontal-red-right",
            Self::HorizontalBlueRight => "horizontal-blue-right",
        }
    }
}

impl fmt::Display for SpectrumOrientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpectrumOrientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|o| o.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown orientation '{}'", s))
    }
}

/// Buffer axis along which the spectrum is accumulated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispersionAxis {
    /// Wavelength varies with x; rows are averaged away
    Columns,
    /// Wavelength varies with y; columns are averaged away
    Rows,
}

/// Downsampling strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReductionStrategy {
    /// Both axes shrink every pass; no orientation, columns by convention
    Isotropic,
    /// Only the cross-dispersion axis shrinks; full spectral resolution
    #[default]
    Anisotropic,
}

impl ReductionStrategy {
    /// Number of reduction passes
    pub fn step_count(self) -> usize {
        match self {
            Self::Isotropic => ISOTROPIC_STEPS,
            Self::Anisotropic => ANISOTROPIC_STEPS,
        }
    }
}

impl FromStr for ReductionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "isotropic" => Ok(Self::Isotropic),
            "anisotropic" => Ok(Self::Anisotropic),
            _ => Err(format!("Unknown reduction strategy '{}'", s)),
        }
    }
}

/// Per-texel brightness model of the luminance pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LuminanceModel {
    /// BT.601 weights on encoded values
    #[default]
    Luma,
    /// BT.709 weights on linearized values; enables exposure scaling
    Linear,
}

impl LuminanceModel {
    /// Fragment entry point implementing this model
    pub fn entry_point(self) -> &'static str {
        match self {
            Self::Luma => "fs_luma",
            Self::Linear => "fs_luminance",
        }
    }

    /// Luminance of one encoded RGB8 pixel, in [0,1]
    pub fn evaluate(self, rgb: [u8; 3]) -> f32 {
        let [r, g, b] = rgb.map(|c| c as f32 / 255.0);
        match self {
            Self::Luma => 0.299 * r + 0.587 * g + 0.114 * b,
            Self::Linear => {
                0.2126 * srgb_to_linear(r) + 0.7152 * srgb_to_linear(g) + 0.0722 * srgb_to_linear(b)
            }
        }
    }

    pub fn is_linear(self) -> bool {
        self == Self::Linear
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Crop rectangle in normalized capture coordinates
///
/// Edges may be given in either order; consumers must use min/max.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PassepartoutRegion {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Default for PassepartoutRegion {
    fn default() -> Self {
        Self::FULL
    }
}

impl PassepartoutRegion {
    /// The whole frame
    pub const FULL: Self = Self {
        left: 0.0,
        top: 0.0,
        right: 1.0,
        bottom: 1.0,
    };

    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Same rectangle with left <= right and top <= bottom
    pub fn normalized(&self) -> Self {
        Self {
            left: self.left.min(self.right),
            top: self.top.min(self.bottom),
            right: self.left.max(self.right),
            bottom: self.top.max(self.bottom),
        }
    }
}

impl FromStr for PassepartoutRegion {
    type Err = String;

    /// Parse `left,top,right,bottom`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values: Vec<f32> = s
            .split(',')
            .map(|v| v.trim().parse::<f32>())
            .collect::<Result<_, _>>()
            .map_err(|e| format!("Invalid region '{}': {}", s, e))?;

        match values.as_slice() {
            [left, top, right, bottom] => Ok(Self::new(*left, *top, *right, *bottom)),
            _ => Err(format!(
                "Invalid region '{}': expected left,top,right,bottom",
                s
            )),
        }
    }
}

/// Column-major 4x4 identity
pub const IDENTITY_MATRIX: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// Per-frame inputs to `SpectrumExtractor::analyze`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInput {
    /// Camera-to-device texture transform (column-major)
    pub cam_matrix: [f32; 16],
    /// Crop window
    pub passepartout: PassepartoutRegion,
    /// Declared spectrum orientation
    pub orientation: SpectrumOrientation,
}

impl Default for FrameInput {
    fn default() -> Self {
        Self {
            cam_matrix: IDENTITY_MATRIX,
            passepartout: PassepartoutRegion::FULL,
            orientation: SpectrumOrientation::default(),
        }
    }
}

/// One frame's spectrum after cropping and orientation
///
/// Index 0 is always the short-wavelength end.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSpectrum {
    /// Normalized brightness per dispersion pixel
    pub samples: Vec<f64>,
    /// Crop window in the uncropped dispersion axis
    pub roi: Range<usize>,
}

impl RawSpectrum {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
