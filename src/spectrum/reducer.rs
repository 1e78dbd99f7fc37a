// SPDX-License-Identifier: GPL-3.0-only

//! Frame reducer seam
//!
//! A reducer runs the luminance pass and the N reduction passes for one
//! frame and hands back the final small buffer. The GPU implementation
//! renders with wgpu; the software implementation is the CPU reference of
//! the same fixed-point scheme.

use super::carry::CarryTexel;
use super::plan::ReductionPlan;
use super::types::FrameInput;
use crate::constants::TARGET_BYTES_PER_TEXEL;
use crate::errors::SpectrumError;

/// Final buffer of the reduction, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct ReducedFrame {
    pub width: u32,
    pub height: u32,
    pub texels: Vec<CarryTexel>,
}

impl ReducedFrame {
    /// Decode tightly packed `Rgba32Uint` readback data
    pub fn from_rgba32(width: u32, height: u32, bytes: &[u8]) -> Self {
        let texels = bytes
            .chunks_exact(TARGET_BYTES_PER_TEXEL as usize)
            .map(|px| {
                let channel = |i: usize| {
                    u32::from_le_bytes([px[4 * i], px[4 * i + 1], px[4 * i + 2], px[4 * i + 3]])
                };
                CarryTexel::from_rgba32([channel(0), channel(1), channel(2), channel(3)])
            })
            .collect();
        Self {
            width,
            height,
            texels,
        }
    }
}

/// Runs the per-frame passes for one analysis session
///
/// Implementations own their render targets exclusively. `configure` is
/// always preceded by `release` when a plan changes, and `reduce` runs to
/// completion (including readback) before returning.
pub trait FrameReducer {
    /// Size of the full-resolution analysis surface
    fn surface_size(&self) -> (u32, u32);

    /// Allocate everything `plan` needs
    fn configure(&mut self, plan: &ReductionPlan) -> Result<(), SpectrumError>;

    /// Run all passes for one frame and read the final buffer back
    fn reduce(
        &mut self,
        frame: &FrameInput,
        plan: &ReductionPlan,
    ) -> Result<ReducedFrame, SpectrumError>;

    /// Free all per-plan resources; safe to call repeatedly
    fn release(&mut self);
}
