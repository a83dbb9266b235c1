// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for depth capture
//!
//! This module provides command-line functionality for:
//! - Periodic snapshot and averaging sessions
//! - Inspecting and measuring saved depth images
//! - Exporting depth images

use crate::SourceArgs;
use depth_capture::backends::{DepthSource, ReplaySource};
use depth_capture::config::{CaptureMode, SessionConfig};
use depth_capture::depth::{DepthImage, Pixel, Plane};
use depth_capture::errors::{AppError, AppResult, BackendError};
use depth_capture::pipelines::{CaptureSession, SessionSummary, export_depth_image};
use depth_capture::terminal::{ConsoleStatus, KeyboardQuit};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::info;

/// Capture periodic distance snapshots
pub fn run_periodic(
    args: &SourceArgs,
    interval: Option<f64>,
    save_depth_images: bool,
) -> AppResult<()> {
    let mut config = session_config(args)?;
    if let Some(secs) = interval {
        config.mode = CaptureMode::Periodic {
            interval: seconds(secs, "interval")?,
        };
    } else if config.mode == CaptureMode::Averaging {
        config.mode = CaptureMode::default();
    }
    config.save_depth_images |= save_depth_images;

    let summary = run_session(args, config, ConsoleStatus::periodic())?;
    println!(
        "{} snapshots saved in {}",
        summary.artifacts.len(),
        summary.session_dir.display()
    );
    Ok(())
}

/// Average every frame of a session into one measurement
pub fn run_averaging(args: &SourceArgs) -> AppResult<()> {
    let mut config = session_config(args)?;
    config.mode = CaptureMode::Averaging;

    let summary = run_session(args, config, ConsoleStatus::averaging())?;
    match summary.artifacts.last() {
        Some(path) => println!("Averaged measurement saved: {}", path.display()),
        None => println!("No frames received, nothing saved"),
    }
    Ok(())
}

/// Print dimensions, scale, intrinsics and planes of a depth image
pub fn show_info(file: &Path) -> AppResult<()> {
    let image = DepthImage::load(file)?;
    let intrinsics = image.intrinsics();

    println!("File: {}", file.display());
    println!("  Size: {}x{}", image.width(), image.height());
    println!("  Depth scale: {} m/unit", image.depth_scale());
    println!(
        "  Intrinsics: fx={} fy={} ppx={} ppy={} model={}",
        intrinsics.fx, intrinsics.fy, intrinsics.ppx, intrinsics.ppy, intrinsics.model
    );
    println!("  Coefficients: {:?}", intrinsics.coeffs);

    let planes: Vec<String> = Plane::ALL
        .iter()
        .filter(|plane| image.has_plane(**plane))
        .map(|plane| plane.to_string())
        .collect();
    println!("  Planes: {}", planes.join(", "));

    let valid: Vec<f32> = image
        .distances_mm()
        .into_iter()
        .filter(|&d| d > 0.0)
        .collect();
    if valid.is_empty() {
        println!("  Depth: no valid samples");
    } else {
        let min = valid.iter().copied().fold(f32::MAX, f32::min);
        let max = valid.iter().copied().fold(f32::MIN, f32::max);
        println!(
            "  Depth: {} valid samples, {:.1}-{:.1} mm",
            valid.len(),
            min,
            max
        );
    }
    Ok(())
}

/// Print the distance in millimetres between two pixels
pub fn measure_distance(file: &Path, p1: (u32, u32), p2: (u32, u32)) -> AppResult<()> {
    let image = DepthImage::load(file)?;
    let a = Pixel::new(p1.0, p1.1);
    let b = Pixel::new(p2.0, p2.1);

    let distance = image.measure(a, b).ok_or_else(|| {
        AppError::Other(format!(
            "pixel outside the {}x{} image",
            image.width(),
            image.height()
        ))
    })?;
    println!("{:.1} mm", distance);
    Ok(())
}

/// Export a depth image next to it or into `output`
pub fn export(file: &Path, output: Option<PathBuf>) -> AppResult<()> {
    let image = DepthImage::load(file)?;
    let out_dir = output.unwrap_or_else(|| file.with_extension(""));

    let files = export_depth_image(&image, &out_dir)?;
    for path in files {
        println!("Exported: {}", path.display());
    }
    Ok(())
}

fn session_config(args: &SourceArgs) -> AppResult<SessionConfig> {
    let mut config = match &args.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };
    if let Some(secs) = args.duration {
        config.duration = seconds(secs, "duration")?;
    }
    if let Some(root) = &args.data {
        config.output_root = root.clone();
    }
    Ok(config)
}

fn seconds(secs: f64, name: &str) -> AppResult<Duration> {
    Duration::try_from_secs_f64(secs)
        .map_err(|e| AppError::Config(format!("invalid {} {}: {}", name, secs, e)))
}

fn open_source(args: &SourceArgs) -> AppResult<Box<dyn DepthSource>> {
    let Some(dir) = &args.replay else {
        return Err(BackendError::DeviceUnavailable(
            "no depth sensor backend available, use --replay DIR".to_string(),
        )
        .into());
    };

    let mut source = ReplaySource::open(dir)?.looping(args.looping);
    if let Some(fps) = args.fps {
        source = source.with_frame_rate(fps);
    }
    Ok(Box::new(source))
}

fn run_session(
    args: &SourceArgs,
    config: SessionConfig,
    status: ConsoleStatus,
) -> AppResult<SessionSummary> {
    let mut source = open_source(args)?;

    // Set up Ctrl+C handler
    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_clone = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        cancel_clone.store(true, Ordering::SeqCst);
    })
    .map_err(|e| AppError::Other(format!("Failed to set Ctrl+C handler: {}", e)))?;

    info!(mode = %config.mode, root = %config.output_root.display(), "Starting session");
    let summary = CaptureSession::new(config)
        .with_cancel_flag(cancel)
        .with_quit_signal(KeyboardQuit::new())
        .with_observer(status)
        .run(source.as_mut())?;
    Ok(summary)
}
