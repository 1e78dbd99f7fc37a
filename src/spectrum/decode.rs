// SPDX-License-Identifier: GPL-3.0-only

//! Readback decoding: accumulate, normalize, crop and orient

use super::geometry::crop_range;
use super::plan::ReductionPlan;
use super::reducer::ReducedFrame;
use super::types::{DispersionAxis, PassepartoutRegion, RawSpectrum};

/// Sum every decoded texel into its dispersion index and normalize
///
/// The result spans the whole dispersion axis of the final buffer.
pub fn accumulate(frame: &ReducedFrame, plan: &ReductionPlan) -> Vec<f64> {
    let length = match plan.dispersion {
        DispersionAxis::Columns => frame.width,
        DispersionAxis::Rows => frame.height,
    } as usize;

    let mut sums = vec![0.0f64; length];
    for (index, texel) in frame.texels.iter().enumerate() {
        let bin = match plan.dispersion {
            DispersionAxis::Columns => index % frame.width as usize,
            DispersionAxis::Rows => index / frame.width as usize,
        };
        sums[bin] += texel.value() as f64;
    }

    let factor = plan.normalization_factor();
    for sum in &mut sums {
        *sum /= factor;
    }
    sums
}

/// Turn a reduced frame into the emitted spectrum
///
/// Crops to the passepartout along the dispersion axis and reverses the
/// window when the orientation puts the red end first.
pub fn extract_spectrum(
    frame: &ReducedFrame,
    plan: &ReductionPlan,
    passepartout: &PassepartoutRegion,
) -> RawSpectrum {
    let sums = accumulate(frame, plan);
    let roi = crop_range(passepartout, plan.dispersion, sums.len());

    let mut samples = sums[roi.clone()].to_vec();
    if plan.reversed {
        samples.reverse();
    }

    RawSpectrum { samples, roi }
}
