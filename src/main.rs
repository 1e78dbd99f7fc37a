// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use spectroscope::spectrum::{
    LuminanceModel, PassepartoutRegion, ReductionStrategy, SpectrumOrientation,
};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "spectroscope")]
#[command(about = "Extract intensity spectra from camera images and calibrate wavelengths")]
#[command(version = env!("BUILD_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the spectrum of an image
    Analyze {
        /// Input image (any format the image crate decodes)
        image: PathBuf,

        /// Use the CPU reducer instead of the GPU
        #[arg(long)]
        software: bool,

        /// Reduction strategy: isotropic or anisotropic
        #[arg(long)]
        strategy: Option<ReductionStrategy>,

        /// Use linear luminance and scale by exposure
        #[arg(long)]
        linear: bool,

        /// Spectrum orientation (e.g. vertical-red-up, horizontal-blue-right)
        #[arg(long)]
        orientation: Option<SpectrumOrientation>,

        /// Crop region as left,top,right,bottom in [0,1]
        #[arg(long)]
        region: Option<PassepartoutRegion>,

        /// Aperture value (APEX)
        #[arg(long, default_value = "1.0")]
        aperture: f64,

        /// ISO sensitivity
        #[arg(long, default_value = "100")]
        iso: f64,

        /// Shutter duration in nanoseconds
        #[arg(long, default_value_t = spectroscope::constants::REFERENCE_SHUTTER_NS)]
        shutter_ns: f64,

        /// Write CSV to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write CSV to a timestamped file in the current directory
        #[arg(long, conflicts_with = "output")]
        save: bool,
    },

    /// Calibrate pixel positions against two known wavelengths
    Calibrate {
        /// Pixel position of the first reference line
        #[arg(long)]
        first: f64,

        /// Pixel position of the second reference line
        #[arg(long)]
        second: f64,

        /// Wavelength of the first line in nm (prompted if omitted)
        #[arg(long)]
        first_wavelength: Option<String>,

        /// Wavelength of the second line in nm (prompted if omitted)
        #[arg(long)]
        second_wavelength: Option<String>,
    },

    /// Show GPU adapter, configuration and calibration
    Info,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=spectroscope=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            image,
            software,
            strategy,
            linear,
            orientation,
            region,
            aperture,
            iso,
            shutter_ns,
            output,
            save,
        } => cli::analyze(cli::AnalyzeOptions {
            image,
            software,
            strategy,
            luminance: linear.then_some(LuminanceModel::Linear),
            orientation,
            region,
            aperture,
            iso,
            shutter_ns,
            output,
            save,
        }),
        Commands::Calibrate {
            first,
            second,
            first_wavelength,
            second_wavelength,
        } => cli::calibrate(first, second, first_wavelength, second_wavelength),
        Commands::Info => cli::info(),
    }
}
