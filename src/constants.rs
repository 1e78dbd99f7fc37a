// SPDX-License-Identifier: GPL-3.0-only

//! Pipeline-wide constants

/// Carry base of the fixed-point accumulator: one unit of red equals 255
/// units of green, and a fully lit texel enters green as 255
pub const CARRY_BASE: u32 = 255;

/// Bytes per texel of the `Rgba32Uint` accumulator targets
pub const TARGET_BYTES_PER_TEXEL: u32 = 16;

/// Source texels merged into one target texel along the averaged axis per pass
pub const REDUCTION_FACTOR: u32 = 4;

/// Reduction passes for the isotropic reducer
pub const ISOTROPIC_STEPS: usize = 3;

/// Reduction passes for the orientation-aware reducer
pub const ANISOTROPIC_STEPS: usize = 4;

/// Row pitch alignment required for texture-to-buffer copies
pub const COPY_ROW_ALIGNMENT: u32 = 256;

/// Pixel distance at or below which two calibration points are rejected
pub const CALIBRATION_MIN_PIXEL_DELTA: f64 = 0.001;

/// Wavelength offered for the first calibration point (violet/blue, nm)
pub const DEFAULT_FIRST_WAVELENGTH: f64 = 420.0;

/// Wavelength offered for the second calibration point (red, nm)
pub const DEFAULT_SECOND_WAVELENGTH: f64 = 680.0;

/// ISO value the linear exposure factor is referenced to
pub const REFERENCE_ISO: f64 = 100.0;

/// Reference shutter time (1/60 s) in nanoseconds
pub const REFERENCE_SHUTTER_NS: f64 = 1.0e9 / 60.0;

/// Configuration directory name under the platform config dir
pub const CONFIG_DIR_NAME: &str = "spectroscope";

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Current configuration format version
pub const CONFIG_VERSION: u32 = 1;
