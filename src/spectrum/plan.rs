// SPDX-License-Identifier: GPL-3.0-only

//! Reduction plan: the step sizes and axes for one surface configuration

use super::types::{DispersionAxis, ReductionStrategy, SpectrumOrientation};
use crate::constants::REDUCTION_FACTOR;
use crate::errors::SpectrumError;

/// Size of one render target in the pyramid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepSize {
    pub width: u32,
    pub height: u32,
}

impl StepSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Extent along the averaged axis
    pub fn averaged(&self, dispersion: DispersionAxis) -> u32 {
        match dispersion {
            DispersionAxis::Columns => self.height,
            DispersionAxis::Rows => self.width,
        }
    }

    /// Extent along the dispersion axis
    pub fn dispersion(&self, dispersion: DispersionAxis) -> u32 {
        match dispersion {
            DispersionAxis::Columns => self.width,
            DispersionAxis::Rows => self.height,
        }
    }
}

/// Everything that determines the shape of the reduction pyramid
///
/// Two equal plans can share render targets; any difference requires the
/// pyramid to be released and rebuilt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReductionPlan {
    pub strategy: ReductionStrategy,
    /// Full-size luminance surface
    pub surface: StepSize,
    /// Reduction targets, largest first
    pub steps: Vec<StepSize>,
    pub dispersion: DispersionAxis,
    /// Emission must be reversed so index 0 is the short-wavelength end
    pub reversed: bool,
}

impl ReductionPlan {
    /// Compute the plan for a surface
    ///
    /// The isotropic strategy ignores orientation entirely.
    pub fn new(
        width: u32,
        height: u32,
        strategy: ReductionStrategy,
        orientation: SpectrumOrientation,
    ) -> Result<Self, SpectrumError> {
        if width == 0 || height == 0 {
            return Err(SpectrumError::InvalidDimensions { width, height });
        }

        let (dispersion, reversed) = match strategy {
            ReductionStrategy::Isotropic => (DispersionAxis::Columns, false),
            ReductionStrategy::Anisotropic => {
                (orientation.dispersion_axis(), orientation.is_reversed())
            }
        };

        let mut steps = Vec::with_capacity(strategy.step_count());
        let mut prev = StepSize::new(width, height);
        for _ in 0..strategy.step_count() {
            let shrink = |v: u32| v.div_ceil(REDUCTION_FACTOR);
            let next = match (strategy, dispersion) {
                (ReductionStrategy::Isotropic, _) => {
                    StepSize::new(shrink(prev.width), shrink(prev.height))
                }
                (ReductionStrategy::Anisotropic, DispersionAxis::Columns) => {
                    StepSize::new(prev.width, shrink(prev.height))
                }
                (ReductionStrategy::Anisotropic, DispersionAxis::Rows) => {
                    StepSize::new(shrink(prev.width), prev.height)
                }
            };
            steps.push(next);
            prev = next;
        }

        Ok(Self {
            strategy,
            surface: StepSize::new(width, height),
            steps,
            dispersion,
            reversed,
        })
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Render target read by reduction pass `index`
    pub fn source_of(&self, index: usize) -> StepSize {
        if index == 0 {
            self.surface
        } else {
            self.steps[index - 1]
        }
    }

    /// The buffer that is read back
    pub fn final_step(&self) -> StepSize {
        self.steps.last().copied().unwrap_or(self.surface)
    }

    /// Shader axis selector: 0 averages along y, 1 along x
    pub fn shader_axis(&self) -> u32 {
        match self.dispersion {
            DispersionAxis::Columns => 0,
            DispersionAxis::Rows => 1,
        }
    }

    /// Divisor turning decoded sums back into per-texel brightness
    ///
    /// Extent of the averaged axis in the final buffer (the texels summed on
    /// readback, independent of cropping) times `4^N`.
    pub fn normalization_factor(&self) -> f64 {
        let averaged = self.final_step().averaged(self.dispersion) as f64;
        averaged * (REDUCTION_FACTOR as f64).powi(self.step_count() as i32)
    }
}
