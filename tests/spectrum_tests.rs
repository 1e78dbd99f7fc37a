// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the spectrum pipeline using the software reducer

use spectroscope::spectrum::{
    ExposureSettings, FrameInput, LuminanceModel, PassepartoutRegion, ReductionStrategy,
    SoftwareReducer, SpectrumExtractor, SpectrumOrientation,
};

/// Gray frame whose value is produced by `f(x, y)`
fn frame(width: u32, height: u32, f: impl Fn(u32, u32) -> u8) -> Vec<u8> {
    let mut rgba = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            let v = f(x, y);
            rgba.extend_from_slice(&[v, v, v, 255]);
        }
    }
    rgba
}

fn extract(
    rgba: &[u8],
    width: u32,
    height: u32,
    strategy: ReductionStrategy,
    input: &FrameInput,
) -> Vec<f64> {
    let mut reducer = SoftwareReducer::new(width, height, LuminanceModel::Luma);
    reducer.upload(rgba).unwrap();

    let mut extractor = SpectrumExtractor::new(reducer, strategy, false);
    extractor.analyze(input).unwrap();

    let mut intensity = Vec::new();
    let mut positions = Vec::new();
    extractor.write_to_buffers(&ExposureSettings::default(), &mut intensity, &mut positions);
    assert_eq!(intensity.len(), positions.len());
    intensity
}

#[test]
fn test_uniform_field_anisotropic() {
    let (width, height) = (32, 256);
    let rgba = frame(width, height, |_, _| 200);
    let samples = extract(
        &rgba,
        width,
        height,
        ReductionStrategy::Anisotropic,
        &FrameInput::default(),
    );

    assert_eq!(samples.len(), 32);
    for value in samples {
        assert!((value - 200.0).abs() <= 1.0, "got {}", value);
    }
}

#[test]
fn test_uniform_field_isotropic() {
    let (width, height) = (256, 64);
    let rgba = frame(width, height, |_, _| 90);
    let samples = extract(
        &rgba,
        width,
        height,
        ReductionStrategy::Isotropic,
        &FrameInput::default(),
    );

    assert_eq!(samples.len(), 4);
    for value in samples {
        assert!((value - 90.0).abs() <= 1.0, "got {}", value);
    }
}

#[test]
fn test_vertical_orientations_are_mirror_images() {
    let (width, height) = (48, 256);
    let rgba = frame(width, height, |x, _| (x * 5) as u8);
    let region = PassepartoutRegion::new(0.0, 0.2, 1.0, 0.9);

    let natural = extract(
        &rgba,
        width,
        height,
        ReductionStrategy::Anisotropic,
        &FrameInput {
            passepartout: region,
            orientation: SpectrumOrientation::VerticalRedUp,
            ..FrameInput::default()
        },
    );
    let reversed = extract(
        &rgba,
        width,
        height,
        ReductionStrategy::Anisotropic,
        &FrameInput {
            passepartout: region,
            orientation: SpectrumOrientation::VerticalBlueUp,
            ..FrameInput::default()
        },
    );

    assert!(!natural.is_empty());
    let mut flipped = reversed.clone();
    flipped.reverse();
    assert_eq!(flipped, natural);
}

#[test]
fn test_horizontal_orientations_are_mirror_images() {
    let (width, height) = (256, 40);
    let rgba = frame(width, height, |_, y| (y * 6) as u8);

    let natural = extract(
        &rgba,
        width,
        height,
        ReductionStrategy::Anisotropic,
        &FrameInput {
            orientation: SpectrumOrientation::HorizontalBlueRight,
            ..FrameInput::default()
        },
    );
    let reversed = extract(
        &rgba,
        width,
        height,
        ReductionStrategy::Anisotropic,
        &FrameInput {
            orientation: SpectrumOrientation::HorizontalRedRight,
            ..FrameInput::default()
        },
    );

    assert_eq!(natural.len(), 40);
    assert!((natural[0] - 0.0).abs() <= 1.0);
    assert!((natural[39] - 234.0).abs() <= 1.0);
    let mut flipped = reversed.clone();
    flipped.reverse();
    assert_eq!(flipped, natural);
}

#[test]
fn test_passepartout_crops_dispersion_axis() {
    let (width, height) = (100, 256);
    let rgba = frame(width, height, |_, _| 50);
    let samples = extract(
        &rgba,
        width,
        height,
        ReductionStrategy::Anisotropic,
        &FrameInput {
            passepartout: PassepartoutRegion::new(0.0, 0.5, 1.0, 0.75),
            ..FrameInput::default()
        },
    );
    assert_eq!(samples.len(), 25);
    assert!(samples.iter().all(|v| (v - 50.0).abs() <= 1.0));
}

#[test]
fn test_full_scale_sum_survives_four_passes() {
    // 4^4 texels at 255 per output column need the carry in every pass
    let (width, height) = (2, 256);
    let rgba = frame(width, height, |_, _| 255);
    let samples = extract(
        &rgba,
        width,
        height,
        ReductionStrategy::Anisotropic,
        &FrameInput::default(),
    );
    assert_eq!(samples, vec![255.0, 255.0]);
}

#[test]
fn test_iso_doubling_halves_linear_output() {
    let (width, height) = (16, 256);
    let rgba = frame(width, height, |x, _| (x * 10 + 20) as u8);

    let mut reducer = SoftwareReducer::new(width, height, LuminanceModel::Linear);
    reducer.upload(&rgba).unwrap();
    let mut extractor = SpectrumExtractor::new(reducer, ReductionStrategy::Anisotropic, true);

    let base = ExposureSettings {
        aperture: 2.0,
        iso: 100.0,
        shutter_ns: 1e7,
    };
    let doubled = ExposureSettings { iso: 200.0, ..base };

    let (mut at_base, mut at_doubled, mut positions) = (Vec::new(), Vec::new(), Vec::new());
    extractor.analyze(&FrameInput::default()).unwrap();
    extractor.write_to_buffers(&base, &mut at_base, &mut positions);
    extractor.analyze(&FrameInput::default()).unwrap();
    extractor.write_to_buffers(&doubled, &mut at_doubled, &mut positions);

    assert_eq!(at_base.len(), 16);
    for (a, b) in at_base.iter().zip(&at_doubled) {
        assert!((a - 2.0 * b).abs() <= 1e-9 * a.abs().max(1.0));
    }
}

#[test]
fn test_runtime_reconfiguration() {
    let (width, height) = (256, 64);
    let rgba = frame(width, height, |_, _| 255);

    let mut reducer = SoftwareReducer::new(width, height, LuminanceModel::Luma);
    reducer.upload(&rgba).unwrap();
    let mut extractor = SpectrumExtractor::new(reducer, ReductionStrategy::Anisotropic, false);
    let (mut intensity, mut positions) = (Vec::new(), Vec::new());

    extractor.analyze(&FrameInput::default()).unwrap();
    extractor.write_to_buffers(&ExposureSettings::default(), &mut intensity, &mut positions);
    assert_eq!(intensity.len(), 256);

    extractor.set_strategy(ReductionStrategy::Isotropic);
    extractor.reducer_mut().set_model(LuminanceModel::Linear);
    extractor.set_linear(true);
    extractor.analyze(&FrameInput::default()).unwrap();

    let dim = ExposureSettings {
        iso: 400.0,
        ..ExposureSettings::default()
    };
    extractor.write_to_buffers(&dim, &mut intensity, &mut positions);
    assert_eq!(extractor.strategy(), ReductionStrategy::Isotropic);
    assert_eq!(intensity.len(), 4);
    for value in intensity {
        assert!((value - 255.0 / 4.0).abs() <= 0.5, "got {}", value);
    }
}
