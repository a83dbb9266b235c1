// SPDX-License-Identifier: GPL-3.0-only

//! Depth Capture - bounded depth sensor capture sessions
//!
//! This library records depth frames into numeric artifacts, either as
//! periodic distance snapshots or as one averaged measurement, and provides
//! the depth image format, deprojection and export tooling around it.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: Depth frame sources
//! - [`depth`]: Depth images, binary format and deprojection
//! - [`pipelines`]: Capture session, averaging and export
//! - [`config`]: Session configuration
//! - [`storage`]: Session directories and atomic artifact writes
//! - [`terminal`]: Keyboard quit and console status
//!
//! # Example
//!
//! ```ignore
//! use depth_capture::{CaptureSession, ReplaySource, SessionConfig};
//!
//! let mut source = ReplaySource::open("recording".as_ref())?;
//! let summary = CaptureSession::new(SessionConfig::default()).run(&mut source)?;
//! println!("{} files in {}", summary.artifacts.len(), summary.session_dir.display());
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod depth;
pub mod errors;
pub mod pipelines;
pub mod storage;
pub mod terminal;

// Re-export commonly used types
pub use backends::{DepthFrame, DepthSource, FramePoll, ReplaySource, StreamProfile};
pub use config::{CaptureMode, SessionConfig};
pub use depth::{DepthImage, Intrinsics, Pixel, Plane, Point3};
pub use errors::{AppError, BackendError, CaptureError, ExportError, ImageError};
pub use pipelines::{CaptureSession, FrameAverager, SessionSummary, StopReason};
