// SPDX-License-Identifier: GPL-3.0-only

//! Per-frame spectrum extraction
//!
//! Owns the reducer and the current plan. Each `analyze` call reduces one
//! frame and overwrites `latest_result`; `write_to_buffers` hands the result
//! to the output sinks with exposure scaling applied.

use super::decode::extract_spectrum;
use super::exposure::{ExposureNormalizer, ExposureSettings};
use super::plan::ReductionPlan;
use super::reducer::FrameReducer;
use super::sink::SampleSink;
use super::types::{FrameInput, RawSpectrum, ReductionStrategy};
use crate::errors::SpectrumError;
use tracing::{debug, info};

pub struct SpectrumExtractor<R: FrameReducer> {
    reducer: R,
    strategy: ReductionStrategy,
    normalizer: ExposureNormalizer,
    plan: Option<ReductionPlan>,
    latest_result: Option<RawSpectrum>,
}

impl<R: FrameReducer> SpectrumExtractor<R> {
    /// `linear` turns on exposure scaling of emitted samples
    pub fn new(reducer: R, strategy: ReductionStrategy, linear: bool) -> Self {
        Self {
            reducer,
            strategy,
            normalizer: ExposureNormalizer::new(linear),
            plan: None,
            latest_result: None,
        }
    }

    pub fn strategy(&self) -> ReductionStrategy {
        self.strategy
    }

    /// Change the reduction strategy; targets are rebuilt on the next frame
    pub fn set_strategy(&mut self, strategy: ReductionStrategy) {
        self.strategy = strategy;
    }

    pub fn set_linear(&mut self, linear: bool) {
        self.normalizer = ExposureNormalizer::new(linear);
    }

    pub fn plan(&self) -> Option<&ReductionPlan> {
        self.plan.as_ref()
    }

    pub fn reducer(&self) -> &R {
        &self.reducer
    }

    pub fn reducer_mut(&mut self) -> &mut R {
        &mut self.reducer
    }

    /// Result of the last frame not yet flushed
    pub fn latest_result(&self) -> Option<&RawSpectrum> {
        self.latest_result.as_ref()
    }

    /// Reduce one frame
    ///
    /// Reconfigures the render targets when the surface, strategy or
    /// orientation produce a different plan. Allocation errors are fatal to
    /// the session and leave the extractor unconfigured.
    pub fn analyze(&mut self, frame: &FrameInput) -> Result<(), SpectrumError> {
        let (width, height) = self.reducer.surface_size();
        let plan = ReductionPlan::new(width, height, self.strategy, frame.orientation)?;

        if self.plan.as_ref() != Some(&plan) {
            info!(
                width,
                height,
                strategy = ?self.strategy,
                orientation = %frame.orientation,
                "Reconfiguring spectrum extractor"
            );
            self.reducer.release();
            self.plan = None;
            self.reducer.configure(&plan)?;
            self.plan = Some(plan.clone());
        }

        let reduced = self.reducer.reduce(frame, &plan)?;
        let spectrum = extract_spectrum(&reduced, &plan, &frame.passepartout);

        debug!(
            samples = spectrum.len(),
            roi_start = spectrum.roi.start,
            roi_end = spectrum.roi.end,
            "Spectrum extracted"
        );

        self.latest_result = Some(spectrum);
        Ok(())
    }

    /// Flush the latest result into the sinks
    ///
    /// Both sinks are cleared first. Positions are 0-based indices into the
    /// cropped spectrum. The exposure factor is computed from `exposure`
    /// for this flush. Returns the number of samples written.
    pub fn write_to_buffers(
        &mut self,
        exposure: &ExposureSettings,
        intensity: &mut impl SampleSink,
        positions: &mut impl SampleSink,
    ) -> usize {
        intensity.clear();
        positions.clear();

        let Some(result) = self.latest_result.take() else {
            return 0;
        };

        let factor = self.normalizer.factor(exposure);
        for (index, value) in result.samples.iter().enumerate() {
            positions.append(index as f64);
            intensity.append(value * factor);
        }
        result.len()
    }

    /// Free all GPU resources
    pub fn release(&mut self) {
        self.reducer.release();
        self.plan = None;
        self.latest_result = None;
    }
}

impl<R: FrameReducer> Drop for SpectrumExtractor<R> {
    fn drop(&mut self) {
        self.reducer.release();
    }
}
