// SPDX-License-Identifier: GPL-3.0-only

//! CPU reference reducer
//!
//! Runs the luminance and reduction passes on the CPU with the same sampling
//! pattern and carry arithmetic as the shaders. Used when no GPU is available
//! and as the oracle for the GPU path in tests.
//!
//! The source frame is taken as already being in analysis orientation; the
//! camera matrix is not applied.

use super::carry::CarryTexel;
use super::geometry::scissor_rect;
use super::plan::{ReductionPlan, StepSize};
use super::reducer::{FrameReducer, ReducedFrame};
use super::types::{DispersionAxis, FrameInput, LuminanceModel};
use crate::constants::REDUCTION_FACTOR;
use crate::errors::SpectrumError;
use tracing::debug;

/// Software implementation of [`FrameReducer`]
pub struct SoftwareReducer {
    width: u32,
    height: u32,
    model: LuminanceModel,
    rgba: Vec<u8>,
    plan: Option<ReductionPlan>,
}

impl SoftwareReducer {
    pub fn new(width: u32, height: u32, model: LuminanceModel) -> Self {
        Self {
            width,
            height,
            model,
            rgba: vec![0; width as usize * height as usize * 4],
            plan: None,
        }
    }

    /// Replace the current camera frame with tightly packed RGBA8 data
    pub fn upload(&mut self, rgba: &[u8]) -> Result<(), SpectrumError> {
        if rgba.len() != self.rgba.len() {
            return Err(SpectrumError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        self.rgba.copy_from_slice(rgba);
        Ok(())
    }

    pub fn set_model(&mut self, model: LuminanceModel) {
        self.model = model;
    }

    fn luminance_pass(&self, frame: &FrameInput) -> Vec<CarryTexel> {
        let mut surface = vec![CarryTexel::default(); self.width as usize * self.height as usize];
        let rect = scissor_rect(&frame.passepartout, self.width, self.height);

        for y in rect.y..rect.y + rect.height {
            for x in rect.x..rect.x + rect.width {
                let index = (y * self.width + x) as usize;
                let px = &self.rgba[index * 4..index * 4 + 3];
                let lum = self.model.evaluate([px[0], px[1], px[2]]).clamp(0.0, 1.0);
                surface[index] = CarryTexel::from_luminance((lum * 255.0).round() as u8);
            }
        }
        surface
    }
}

/// One reduction pass from `src` into a buffer of size `dst`
fn reduce_step(
    source: &[CarryTexel],
    src: StepSize,
    dst: StepSize,
    dispersion: DispersionAxis,
) -> Vec<CarryTexel> {
    let mut out = Vec::with_capacity(dst.width as usize * dst.height as usize);
    let mut group = Vec::with_capacity(REDUCTION_FACTOR as usize);

    for y in 0..dst.height {
        for x in 0..dst.width {
            group.clear();
            match dispersion {
                DispersionAxis::Columns => {
                    let sx = nearest(x, src.width, dst.width);
                    for k in 0..REDUCTION_FACTOR {
                        let sy = REDUCTION_FACTOR * y + k;
                        if k == 0 || sy < src.height {
                            group.push(source[(sy * src.width + sx) as usize]);
                        }
                    }
                }
                DispersionAxis::Rows => {
                    let sy = nearest(y, src.height, dst.height);
                    for k in 0..REDUCTION_FACTOR {
                        let sx = REDUCTION_FACTOR * x + k;
                        if k == 0 || sx < src.width {
                            group.push(source[(sy * src.width + sx) as usize]);
                        }
                    }
                }
            }
            out.push(CarryTexel::reduce(&group));
        }
    }
    out
}

/// Nearest source index on the axis that is not averaged
fn nearest(dst_index: u32, src_extent: u32, dst_extent: u32) -> u32 {
    let scaled = (dst_index as f64 + 0.5) * src_extent as f64 / dst_extent as f64;
    (scaled.floor() as u32).min(src_extent - 1)
}

impl FrameReducer for SoftwareReducer {
    fn surface_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn configure(&mut self, plan: &ReductionPlan) -> Result<(), SpectrumError> {
        self.release();
        if plan.surface != StepSize::new(self.width, self.height) {
            return Err(SpectrumError::InvalidDimensions {
                width: plan.surface.width,
                height: plan.surface.height,
            });
        }
        self.plan = Some(plan.clone());
        Ok(())
    }

    fn reduce(
        &mut self,
        frame: &FrameInput,
        plan: &ReductionPlan,
    ) -> Result<ReducedFrame, SpectrumError> {
        if self.plan.as_ref() != Some(plan) {
            return Err(SpectrumError::NotConfigured);
        }

        let mut buffer = self.luminance_pass(frame);
        for (index, dst) in plan.steps.iter().enumerate() {
            buffer = reduce_step(&buffer, plan.source_of(index), *dst, plan.dispersion);
        }

        let size = plan.final_step();
        debug!(
            width = size.width,
            height = size.height,
            "Software reduction complete"
        );

        Ok(ReducedFrame {
            width: size.width,
            height: size.height,
            texels: buffer,
        })
    }

    fn release(&mut self) {
        self.plan = None;
    }
}
