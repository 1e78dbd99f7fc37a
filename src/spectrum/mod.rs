// SPDX-License-Identifier: GPL-3.0-only

//! Spectral extraction pipeline
//!
//! A camera frame goes through a luminance pass and N box reductions that
//! collapse the axis orthogonal to the dispersion direction. The small final
//! buffer is read back, decoded from its carry encoding, normalized, cropped
//! to the passepartout and oriented so that index 0 is the blue end.

pub mod carry;
pub mod decode;
pub mod exposure;
pub mod extractor;
pub mod geometry;
pub mod gpu_reducer;
pub mod plan;
pub mod pyramid;
pub mod reducer;
pub mod sink;
pub mod software;
pub mod types;

pub use carry::CarryTexel;
pub use exposure::{ExposureNormalizer, ExposureSettings};
pub use extractor::SpectrumExtractor;
pub use gpu_reducer::{GpuReducer, RenderSurfaceConfig, TARGET_FORMAT, WgpuTargets, upload_rgba_texture};
pub use plan::{ReductionPlan, StepSize};
pub use pyramid::{ReductionPyramid, TargetAllocator};
pub use reducer::{FrameReducer, ReducedFrame};
pub use sink::SampleSink;
pub use software::SoftwareReducer;
pub use types::{
    DispersionAxis, FrameInput, IDENTITY_MATRIX, LuminanceModel, PassepartoutRegion, RawSpectrum,
    ReductionStrategy, SpectrumOrientation,
};
