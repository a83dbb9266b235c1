// SPDX-License-Identifier: GPL-3.0-only

//! Depth frame sources
//!
//! ```text
//! ┌─────────────────────┐
//! │   CaptureSession    │
//! └──────────┬──────────┘
//!            │ next_frame(timeout)
//!            ▼
//! ┌─────────────────────┐
//! │  DepthSource trait  │  ← Common interface
//! └──────────┬──────────┘
//!            │
//!       ┌────┴─────┐
//!       ▼          ▼
//!   ┌────────┐ ┌─────────┐
//!   │ Replay │ │ Device  │  (hardware SDK, external)
//!   └────────┘ └─────────┘
//! ```
//!
//! A source delivers raw Z16 depth frames for one stream whose dimensions,
//! depth scale and intrinsics are fixed for the lifetime of the source.

pub mod replay;

pub use replay::ReplaySource;

use crate::depth::Intrinsics;
use crate::errors::BackendResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Depth stream parameters, valid for the lifetime of a source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreamProfile {
    pub width: u32,
    pub height: u32,
    /// Metres per raw depth unit
    pub depth_scale: f32,
    pub intrinsics: Intrinsics,
}

impl StreamProfile {
    /// Size of one depth frame in bytes
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 2
    }
}

/// One raw depth frame
#[derive(Clone)]
pub struct DepthFrame {
    /// Sequence number assigned by the source
    pub frame_number: u64,
    pub width: u32,
    pub height: u32,
    /// Native-endian 16-bit depth units, row-major
    pub data: Arc<[u8]>,
}

impl std::fmt::Debug for DepthFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DepthFrame")
            .field("frame_number", &self.frame_number)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("data", &format_args!("{} bytes", self.data.len()))
            .finish()
    }
}

/// Result of waiting for the next frame
#[derive(Debug)]
pub enum FramePoll {
    /// A new frame is available
    Frame(DepthFrame),
    /// No frame arrived within the timeout
    Timeout,
    /// The source will not produce any more frames
    Closed,
}

/// A producer of depth frames
pub trait DepthSource {
    /// Stream parameters for every frame this source produces
    fn profile(&self) -> &StreamProfile;

    /// Block until the next frame is available or `timeout` expires
    fn next_frame(&mut self, timeout: Duration) -> BackendResult<FramePoll>;

    /// Human-readable description for status output
    fn describe(&self) -> String {
        let profile = self.profile();
        format!(
            "{}x{} depth, scale {}",
            profile.width, profile.height, profile.depth_scale
        )
    }
}
