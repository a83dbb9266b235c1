// SPDX-License-Identifier: GPL-3.0-only

//! Processing pipelines for depth capture
//!
//! # Pipeline Architecture
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────────┐
//! │ DepthSource  │ ──▶ │  CaptureSession   │ ──▶ │ 000000.npy ...   │
//! │  (Z16)       │     │  - periodic       │     │ (f32 mm)         │
//! │              │     │  - averaging      │ ──▶ │ start-end-n.npy  │
//! │              │     │                   │     │ (f64 mm)         │
//! └──────────────┘     └───────────────────┘     └──────────────────┘
//!
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────────┐
//! │  .di file    │ ──▶ │  Export           │ ──▶ │ PNG, NPY, LAS    │
//! └──────────────┘     └───────────────────┘     └──────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`session`]: Bounded capture session driver
//! - [`averaging`]: Incremental per-pixel mean
//! - [`export`]: Image and point cloud export

pub mod averaging;
pub mod export;
pub mod session;

pub use averaging::{AveragedDepth, FrameAverager};
pub use export::export_depth_image;
pub use session::{
    CaptureSession, Clock, MonotonicClock, NeverQuit, NullObserver, QuitSignal, SessionObserver,
    SessionProgress, SessionSummary, StopReason,
};
