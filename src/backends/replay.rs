// SPDX-License-Identifier: GPL-3.0-only

//! Replay of recorded depth images
//!
//! Streams the depth plane of every `.di` file in a directory, in file name
//! order, as if it came from a live sensor. The stream profile is taken from
//! the first file. Optional frame-rate pacing makes `next_frame` block the
//! way a device wait does.

use super::{DepthFrame, DepthSource, FramePoll, StreamProfile};
use crate::constants::depth_file;
use crate::depth::DepthImage;
use crate::errors::{BackendError, BackendResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Frame source backed by a directory of saved depth images
pub struct ReplaySource {
    files: Vec<PathBuf>,
    profile: StreamProfile,
    next_index: usize,
    frame_number: u64,
    frame_interval: Option<Duration>,
    next_due: Option<Instant>,
    looping: bool,
}

impl ReplaySource {
    /// Open a recording directory
    ///
    /// Fails with `DeviceUnavailable` when the directory holds no depth images.
    pub fn open(dir: &Path) -> BackendResult<Self> {
        let files = list_depth_images(dir)?;
        let first = files.first().ok_or_else(|| {
            BackendError::DeviceUnavailable(format!(
                "no .{} files in {}",
                depth_file::EXTENSION,
                dir.display()
            ))
        })?;

        let image = DepthImage::load(first)?;
        let profile = StreamProfile {
            width: image.width(),
            height: image.height(),
            depth_scale: image.depth_scale(),
            intrinsics: *image.intrinsics(),
        };

        info!(
            path = %dir.display(),
            frames = files.len(),
            width = profile.width,
            height = profile.height,
            "Opened replay source"
        );

        Ok(Self {
            files,
            profile,
            next_index: 0,
            frame_number: 0,
            frame_interval: None,
            next_due: None,
            looping: false,
        })
    }

    /// Pace delivery at `fps` frames per second (unpaced when not positive)
    pub fn with_frame_rate(mut self, fps: f64) -> Self {
        self.frame_interval = (fps > 0.0).then(|| Duration::from_secs_f64(1.0 / fps));
        self
    }

    /// Restart from the first file instead of closing at the end
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Number of recorded frames
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Sleep until the next frame is due; `false` if that exceeds `timeout`
    fn wait_until_due(&mut self, timeout: Duration) -> bool {
        let Some(due) = self.next_due else {
            return true;
        };
        let now = Instant::now();
        if due <= now {
            return true;
        }
        let wait = due - now;
        if wait > timeout {
            std::thread::sleep(timeout);
            return false;
        }
        std::thread::sleep(wait);
        true
    }
}

impl DepthSource for ReplaySource {
    fn profile(&self) -> &StreamProfile {
        &self.profile
    }

    fn next_frame(&mut self, timeout: Duration) -> BackendResult<FramePoll> {
        if self.next_index >= self.files.len() {
            if !self.looping {
                debug!("Replay finished");
                return Ok(FramePoll::Closed);
            }
            self.next_index = 0;
        }

        if !self.wait_until_due(timeout) {
            return Ok(FramePoll::Timeout);
        }

        let path = &self.files[self.next_index];
        let image = DepthImage::load(path)?;
        if image.width() != self.profile.width || image.height() != self.profile.height {
            return Err(BackendError::FormatMismatch(format!(
                "{} is {}x{}, stream is {}x{}",
                path.display(),
                image.width(),
                image.height(),
                self.profile.width,
                self.profile.height
            )));
        }
        if image.depth_scale() != self.profile.depth_scale {
            warn!(
                path = %path.display(),
                scale = image.depth_scale(),
                stream_scale = self.profile.depth_scale,
                "Recorded depth scale differs from stream; using stream scale"
            );
        }

        self.next_index += 1;
        self.frame_number += 1;
        self.next_due = self.frame_interval.map(|interval| Instant::now() + interval);

        Ok(FramePoll::Frame(DepthFrame {
            frame_number: self.frame_number,
            width: image.width(),
            height: image.height(),
            data: Arc::from(bytemuck::cast_slice::<u16, u8>(image.depth())),
        }))
    }

    fn describe(&self) -> String {
        format!(
            "replay of {} frames ({}x{}, scale {})",
            self.files.len(),
            self.profile.width,
            self.profile.height,
            self.profile.depth_scale
        )
    }
}

/// Depth image files in a directory, sorted by name
fn list_depth_images(dir: &Path) -> BackendResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        BackendError::DeviceUnavailable(format!("{}: {}", dir.display(), e))
    })?;

    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(depth_file::EXTENSION))
        })
        .collect();
    files.sort();
    Ok(files)
}
