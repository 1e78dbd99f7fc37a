// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Extracting a spectrum from an image file
//! - Two-point wavelength calibration
//! - Reporting adapter and configuration state

use chrono::Local;
use spectroscope::calibration::{CalibrationEngine, CalibrationEvent, WavelengthResponse};
use spectroscope::config::Config;
use spectroscope::gpu::{create_analysis_device, wgpu};
use spectroscope::spectrum::{
    ExposureSettings, FrameInput, FrameReducer, GpuReducer, LuminanceModel, PassepartoutRegion,
    ReductionStrategy, RenderSurfaceConfig, SoftwareReducer, SpectrumExtractor,
    SpectrumOrientation, TARGET_FORMAT, upload_rgba_texture,
};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// Arguments of the `analyze` command
pub struct AnalyzeOptions {
    pub image: PathBuf,
    pub software: bool,
    pub strategy: Option<ReductionStrategy>,
    pub luminance: Option<LuminanceModel>,
    pub orientation: Option<SpectrumOrientation>,
    pub region: Option<PassepartoutRegion>,
    pub aperture: f64,
    pub iso: f64,
    pub shutter_ns: f64,
    pub output: Option<PathBuf>,
    pub save: bool,
}

/// Extract the spectrum of one image and print or write it as CSV
pub fn analyze(options: AnalyzeOptions) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    let rgba = image::open(&options.image)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    let pixels = rgba.into_raw();

    let strategy = options.strategy.unwrap_or(config.strategy);
    let luminance = options.luminance.unwrap_or(config.luminance);
    let frame = FrameInput {
        passepartout: options.region.unwrap_or(config.passepartout),
        orientation: options.orientation.unwrap_or(config.orientation),
        ..FrameInput::default()
    };
    let exposure = ExposureSettings {
        aperture: options.aperture,
        iso: options.iso,
        shutter_ns: options.shutter_ns,
    };

    eprintln!(
        "Analyzing {} ({}x{}, {:?}, {})",
        options.image.display(),
        width,
        height,
        strategy,
        frame.orientation
    );

    let gpu = if options.software {
        None
    } else {
        match pollster::block_on(create_analysis_device("spectroscope_cli")) {
            Ok(created) => Some(created),
            Err(e) => {
                warn!(error = %e, "GPU unavailable, falling back to software reducer");
                eprintln!("GPU unavailable ({}), using software reducer", e);
                None
            }
        }
    };

    let linear = luminance.is_linear();
    let (positions, intensity) = match gpu {
        Some((device, queue, info)) => {
            eprintln!("Using GPU: {}", info.adapter_name);
            let texture = upload_rgba_texture(&device, &queue, &pixels, width, height)?;
            let source = Arc::new(texture.create_view(&wgpu::TextureViewDescriptor::default()));
            let reducer = GpuReducer::new(
                RenderSurfaceConfig {
                    width,
                    height,
                    device,
                    queue,
                    format: TARGET_FORMAT,
                    source,
                },
                luminance,
            )?;
            run_extraction(reducer, strategy, linear, &frame, &exposure)?
        }
        None => {
            let mut reducer = SoftwareReducer::new(width, height, luminance);
            reducer.upload(&pixels)?;
            run_extraction(reducer, strategy, linear, &frame, &exposure)?
        }
    };

    let csv = format_csv(&positions, &intensity, &config);

    let output_path = if options.save {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        Some(PathBuf::from(format!("spectrum_{}.csv", timestamp)))
    } else {
        options.output
    };

    match output_path {
        Some(path) => {
            std::fs::write(&path, csv)?;
            eprintln!("Wrote {} samples to {}", positions.len(), path.display());
        }
        None => print!("{}", csv),
    }

    Ok(())
}

fn run_extraction<R: FrameReducer>(
    reducer: R,
    strategy: ReductionStrategy,
    linear: bool,
    frame: &FrameInput,
    exposure: &ExposureSettings,
) -> Result<(Vec<f64>, Vec<f64>), Box<dyn std::error::Error>> {
    let mut extractor = SpectrumExtractor::new(reducer, strategy, linear);
    extractor.analyze(frame)?;

    let mut intensity = Vec::new();
    let mut positions = Vec::new();
    extractor.write_to_buffers(exposure, &mut intensity, &mut positions);
    extractor.release();

    Ok((positions, intensity))
}

fn format_csv(positions: &[f64], intensity: &[f64], config: &Config) -> String {
    let mut csv = String::new();
    match config.calibration {
        Some(params) => {
            csv.push_str("pixel,intensity,wavelength\n");
            for (pixel, value) in positions.iter().zip(intensity) {
                csv.push_str(&format!(
                    "{},{:.6},{:.3}\n",
                    pixel,
                    value,
                    params.wavelength_at(*pixel)
                ));
            }
        }
        None => {
            csv.push_str("pixel,intensity\n");
            for (pixel, value) in positions.iter().zip(intensity) {
                csv.push_str(&format!("{},{:.6}\n", pixel, value));
            }
        }
    }
    csv
}

/// Run the two-point calibration and store the result
pub fn calibrate(
    first: f64,
    second: f64,
    first_wavelength: Option<String>,
    second_wavelength: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load()?;
    let mut engine = CalibrationEngine::new(config.calibration_mode);
    let mut events = engine.subscribe();

    engine.start_calibration();

    let mut outcome = Ok(());
    for (pixel, given) in [(first, first_wavelength), (second, second_wavelength)] {
        engine.add_reference_point(pixel);
        let Some(request) = engine.request_to_add_calibrated_point(pixel) else {
            return Err("No reference point staged".into());
        };

        let response = match given {
            Some(text) => WavelengthResponse::Entered(text),
            None => prompt_wavelength(request.point_index, pixel, request.suggested_wavelength)?,
        };
        outcome = engine.submit_wavelength(response);

        let labeled = engine
            .points()
            .get(request.point_index)
            .is_some_and(|point| point.wavelength.is_some());
        if outcome.is_err() || !labeled {
            break;
        }
    }

    while let Ok(event) = events.try_recv() {
        match event {
            CalibrationEvent::Dismissed => eprintln!("Wavelength entry dismissed"),
            CalibrationEvent::Failed(reason) => eprintln!("Calibration failed: {}", reason),
            _ => {}
        }
    }
    outcome?;

    let Some(parameters) = engine.parameters() else {
        return Err(format!("Calibration not completed (state: {})", engine.state()).into());
    };

    config.calibration = Some(parameters);
    config.calibration_points = engine.points().to_vec();
    config.save()?;

    if let Some(info) = engine.calibration_info() {
        println!("{}", info);
    }
    Ok(())
}

/// Ask for a wavelength on stdin; empty input accepts the suggestion
fn prompt_wavelength(
    index: usize,
    pixel: f64,
    suggested: f64,
) -> Result<WavelengthResponse, Box<dyn std::error::Error>> {
    eprint!(
        "Wavelength of point {} at pixel {} in nm [{}]: ",
        index + 1,
        pixel,
        suggested
    );
    std::io::stderr().flush()?;

    let mut line = String::new();
    if std::io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(WavelengthResponse::Cancelled);
    }

    let text = line.trim();
    if text.is_empty() {
        Ok(WavelengthResponse::Entered(suggested.to_string()))
    } else {
        Ok(WavelengthResponse::Entered(text.to_string()))
    }
}

/// Print adapter, configuration path and calibration
pub fn info() -> Result<(), Box<dyn std::error::Error>> {
    match pollster::block_on(create_analysis_device("spectroscope_info")) {
        Ok((_, _, info)) => {
            println!("GPU adapter: {} ({:?})", info.adapter_name, info.backend);
            println!("Max texture size: {}", info.max_texture_dimension);
        }
        Err(e) => println!("GPU adapter: none ({})", e),
    }

    let path = Config::default_path();
    let config = Config::load()?;
    println!("Config: {}", path.display());
    println!("Strategy: {:?}", config.strategy);
    println!("Luminance: {:?}", config.luminance);
    println!("Orientation: {}", config.orientation);

    let mut engine = CalibrationEngine::new(config.calibration_mode);
    if !config.calibration_points.is_empty() {
        if let Err(e) = engine.restore(config.calibration_points.clone()) {
            warn!("Saved calibration points are unusable: {}", e);
        }
    }
    match engine.calibration_info() {
        Some(info) => println!("{}", info),
        None => println!("Not calibrated"),
    }

    Ok(())
}
