// SPDX-License-Identifier: GPL-3.0-only

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "depth-capture")]
#[command(about = "Depth sensor capture and measurement")]
#[command(version = depth_capture::constants::app_version())]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by the capture commands
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Session configuration file (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Replay saved .di files from this directory instead of a live sensor
    #[arg(short, long)]
    pub replay: Option<PathBuf>,

    /// Replay pacing in frames per second
    #[arg(long)]
    pub fps: Option<f64>,

    /// Restart the replay at the end instead of stopping
    #[arg(long = "loop")]
    pub looping: bool,

    /// Session duration in seconds
    #[arg(short, long)]
    pub duration: Option<f64>,

    /// Root directory for session output (default: ~/Documents/DepthCapture)
    #[arg(long)]
    pub data: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture periodic distance snapshots
    Run {
        #[command(flatten)]
        source: SourceArgs,

        /// Seconds between snapshots
        #[arg(short, long)]
        interval: Option<f64>,

        /// Also save the full depth image with every snapshot
        #[arg(long)]
        save_depth_images: bool,
    },

    /// Average all frames into one measurement
    Measure {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Show the contents of a depth image file
    Info {
        /// Depth image (.di)
        file: PathBuf,
    },

    /// Measure the distance between two pixels of a depth image
    Distance {
        /// Depth image (.di)
        file: PathBuf,
        x1: u32,
        y1: u32,
        x2: u32,
        y2: u32,
    },

    /// Export a depth image as PNG, NPY and LAS files
    Export {
        /// Depth image (.di)
        file: PathBuf,

        /// Output directory (default: next to the input, named after it)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=depth_capture=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            source,
            interval,
            save_depth_images,
        } => cli::run_periodic(&source, interval, save_depth_images)?,
        Commands::Measure { source } => cli::run_averaging(&source)?,
        Commands::Info { file } => cli::show_info(&file)?,
        Commands::Distance {
            file,
            x1,
            y1,
            x2,
            y2,
        } => cli::measure_distance(&file, (x1, y1), (x2, y2))?,
        Commands::Export { file, output } => cli::export(&file, output)?,
    }
    Ok(())
}
