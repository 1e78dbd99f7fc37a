// SPDX-License-Identifier: GPL-3.0-only
//! WGSL sources and shared GPU readback helpers
//!
//! Both render passes of the spectrum pipeline are defined here so the GPU
//! reducer and the shader validation tests use the same source.

mod gpu_processor;

pub use gpu_processor::{
    CachedDimensions, aligned_bytes_per_row, read_buffer_async, strip_row_padding,
};

/// Luminance pass: `vs_main`, `fs_luma`, `fs_luminance`
pub const LUMINANCE_SHADER: &str = include_str!("luminance.wgsl");

/// Reduction pass with overflow carry: `vs_main`, `fs_main`
pub const REDUCTION_SHADER: &str = include_str!("reduction.wgsl");
