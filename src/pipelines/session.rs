// SPDX-License-Identifier: GPL-3.0-only

//! Capture session driver
//!
//! Runs one bounded capture over a [`DepthSource`]: every received frame is
//! copied into a [`DepthImage`] and then either persisted as a periodic
//! snapshot or folded into a [`FrameAverager`]. Everything happens on the
//! calling thread; the source's `next_frame` is the only blocking call.
//!
//! The session stops at the first of:
//! - the configured duration has elapsed
//! - the cancellation flag is set (Ctrl+C)
//! - the quit signal fires (`q` in the terminal)
//! - the source closes
//!
//! All conditions are checked after every poll of the source, so a frame is
//! always fully processed before the loop exits.

use super::averaging::FrameAverager;
use crate::backends::{DepthSource, FramePoll, StreamProfile};
use crate::config::{CaptureMode, SessionConfig};
use crate::constants::{app_version, depth_file, session::METADATA_FILE};
use crate::depth::DepthImage;
use crate::errors::{CaptureError, CaptureResult};
use crate::storage;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Elapsed session time
pub trait Clock {
    /// Time since the session started
    fn elapsed(&self) -> Duration;
}

/// Wall clock based on `Instant`
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Interactive quit request, polled once per loop iteration
pub trait QuitSignal {
    fn quit_requested(&mut self) -> bool;
}

/// Quit signal that never fires (non-interactive runs)
pub struct NeverQuit;

impl QuitSignal for NeverQuit {
    fn quit_requested(&mut self) -> bool {
        false
    }
}

/// Push-style progress reporting
///
/// All methods default to doing nothing.
pub trait SessionObserver {
    fn session_started(&mut self, _session_dir: &Path, _source: &str) {}
    fn frame_processed(&mut self, _progress: &SessionProgress) {}
    fn artifact_written(&mut self, _path: &Path) {}
    fn write_failed(&mut self, _path: &Path, _error: &str) {}
    fn session_finished(&mut self, _summary: &SessionSummary) {}
}

/// Observer that ignores every event
pub struct NullObserver;

impl SessionObserver for NullObserver {}

/// Snapshot of session progress after a frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionProgress {
    pub frames_received: u64,
    /// Snapshots written so far (periodic mode)
    pub snapshots_written: u64,
    /// Frames folded into the mean (averaging mode)
    pub samples_averaged: u64,
    pub elapsed: Duration,
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    DurationElapsed,
    Cancelled,
    QuitRequested,
    SourceClosed,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::DurationElapsed => write!(f, "duration elapsed"),
            StopReason::Cancelled => write!(f, "cancelled"),
            StopReason::QuitRequested => write!(f, "quit requested"),
            StopReason::SourceClosed => write!(f, "source closed"),
        }
    }
}

/// Outcome of a completed session
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub session_dir: PathBuf,
    pub stop_reason: StopReason,
    pub frames_received: u64,
    /// Artifacts written, in order
    pub artifacts: Vec<PathBuf>,
    /// Artifact writes that failed and were skipped
    pub failed_writes: u64,
}

#[derive(Serialize)]
struct SessionMetadata<'a> {
    version: &'static str,
    started_at: String,
    source: &'a str,
    profile: &'a StreamProfile,
    config: &'a SessionConfig,
}

enum ModeState {
    Periodic {
        interval: Duration,
        last_capture: Duration,
        next_index: u64,
    },
    Averaging(FrameAverager),
}

#[derive(Default)]
struct ArtifactLog {
    written: Vec<PathBuf>,
    failed: u64,
}

impl ArtifactLog {
    /// Record a write attempt; failures are logged and skipped
    fn record<E: std::fmt::Display>(
        &mut self,
        path: PathBuf,
        result: Result<(), E>,
        observer: &mut dyn SessionObserver,
    ) -> bool {
        match result {
            Ok(()) => {
                observer.artifact_written(&path);
                self.written.push(path);
                true
            }
            Err(e) => {
                let message = e.to_string();
                warn!(
                    path = %path.display(),
                    error = %message,
                    "Failed to write artifact, continuing"
                );
                observer.write_failed(&path, &message);
                self.failed += 1;
                false
            }
        }
    }
}

/// One capture session
pub struct CaptureSession {
    config: SessionConfig,
    clock: Option<Box<dyn Clock>>,
    cancel: Arc<AtomicBool>,
    quit: Box<dyn QuitSignal>,
    observer: Box<dyn SessionObserver>,
}

impl CaptureSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            clock: None,
            cancel: Arc::new(AtomicBool::new(false)),
            quit: Box::new(NeverQuit),
            observer: Box::new(NullObserver),
        }
    }

    /// Replace the wall clock (started when `run` begins by default)
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    /// Use an externally owned cancellation flag
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_quit_signal(mut self, quit: impl QuitSignal + 'static) -> Self {
        self.quit = Box::new(quit);
        self
    }

    pub fn with_observer(mut self, observer: impl SessionObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// Flag that cancels the session when set
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run the session to completion
    ///
    /// Fails only when the stream dimensions are unusable, the output
    /// directory cannot be created, the source fails, a frame does not match the stream shape, or the final averaged
    /// result cannot be written. Individual snapshot write failures are
    /// logged and counted in the summary.
    pub fn run(mut self, source: &mut dyn DepthSource) -> CaptureResult<SessionSummary> {
        let clock = self
            .clock
            .take()
            .unwrap_or_else(|| Box::new(MonotonicClock::start()));
        let profile = *source.profile();
        let description = source.describe();
        let mut image = DepthImage::new(
            profile.width,
            profile.height,
            profile.depth_scale,
            profile.intrinsics,
        )?;
        let started_at = Local::now();

        let session_dir = storage::create_session_dir(&self.config.output_root, &started_at)
            .map_err(|e| {
                CaptureError::OutputDirectory(format!(
                    "{}: {}",
                    self.config.output_root.display(),
                    e
                ))
            })?;

        info!(
            path = %session_dir.display(),
            mode = %self.config.mode,
            duration_secs = self.config.duration.as_secs_f64(),
            source = %description,
            "Capture session started"
        );
        self.write_metadata(&session_dir, &profile, &started_at, &description);
        self.observer.session_started(&session_dir, &description);

        let mut state = match self.config.mode {
            CaptureMode::Periodic { interval } => ModeState::Periodic {
                interval,
                last_capture: Duration::ZERO,
                next_index: 0,
            },
            CaptureMode::Averaging => {
                ModeState::Averaging(FrameAverager::new(profile.width, profile.height))
            }
        };
        let mut artifacts = ArtifactLog::default();
        let mut frames_received = 0u64;

        let stop_reason = loop {
            match source.next_frame(self.config.frame_timeout)? {
                FramePoll::Frame(frame) => {
                    frames_received += 1;
                    image.fill_depth(&frame.data)?;

                    let elapsed = clock.elapsed();
                    let mut snapshots_written = 0;
                    let mut samples_averaged = 0;
                    match &mut state {
                        ModeState::Periodic {
                            interval,
                            last_capture,
                            next_index,
                        } => {
                            if elapsed.saturating_sub(*last_capture) >= *interval {
                                *last_capture = elapsed;
                                if self.persist_snapshot(
                                    &image,
                                    &session_dir,
                                    *next_index,
                                    &mut artifacts,
                                ) {
                                    *next_index += 1;
                                }
                            }
                            snapshots_written = *next_index;
                        }
                        ModeState::Averaging(averager) => {
                            averager.accumulate(image.depth(), profile.depth_scale)?;
                            samples_averaged = averager.sample_count();
                        }
                    }

                    debug!(frame = frame.frame_number, frames_received, "Frame processed");
                    self.observer.frame_processed(&SessionProgress {
                        frames_received,
                        snapshots_written,
                        samples_averaged,
                        elapsed,
                    });
                }
                FramePoll::Timeout => debug!("No frame within timeout"),
                FramePoll::Closed => break StopReason::SourceClosed,
            }

            if let Some(reason) = self.check_stop(clock.as_ref()) {
                break reason;
            }
        };

        let ended_at = Local::now();
        if let ModeState::Averaging(averager) = state {
            let result = averager.finish();
            if result.sample_count == 0 {
                warn!("No frames received, averaged measurement not written");
            } else {
                let path = session_dir.join(storage::averaged_file_name(
                    &started_at,
                    &ended_at,
                    result.sample_count,
                ));
                if let Err(e) = storage::write_npy(&path, result.mean) {
                    error!(
                        path = %path.display(),
                        error = %e,
                        "Failed to write averaged measurement"
                    );
                    self.observer.write_failed(&path, &e.to_string());
                    return Err(CaptureError::Storage(format!("{}: {}", path.display(), e)));
                }
                self.observer.artifact_written(&path);
                artifacts.written.push(path);
            }
        }

        let summary = SessionSummary {
            session_dir,
            stop_reason,
            frames_received,
            artifacts: artifacts.written,
            failed_writes: artifacts.failed,
        };
        info!(
            reason = %summary.stop_reason,
            frames = summary.frames_received,
            artifacts = summary.artifacts.len(),
            failed_writes = summary.failed_writes,
            "Capture session finished"
        );
        self.observer.session_finished(&summary);
        Ok(summary)
    }

    fn check_stop(&mut self, clock: &dyn Clock) -> Option<StopReason> {
        if clock.elapsed() > self.config.duration {
            return Some(StopReason::DurationElapsed);
        }
        if self.cancel.load(Ordering::SeqCst) {
            return Some(StopReason::Cancelled);
        }
        if self.quit.quit_requested() {
            return Some(StopReason::QuitRequested);
        }
        None
    }

    /// Write the distance snapshot (and optionally the full image)
    ///
    /// Returns whether the snapshot itself was written.
    fn persist_snapshot(
        &mut self,
        image: &DepthImage,
        session_dir: &Path,
        index: u64,
        artifacts: &mut ArtifactLog,
    ) -> bool {
        if self.config.save_depth_images {
            let path = session_dir.join(storage::snapshot_file_name(index, depth_file::EXTENSION));
            let result = image.save(&path);
            artifacts.record(path, result, self.observer.as_mut());
        }

        let path = session_dir.join(storage::snapshot_file_name(index, "npy"));
        let result = storage::write_npy(&path, image.distances_mm());
        artifacts.record(path, result, self.observer.as_mut())
    }

    fn write_metadata(
        &self,
        session_dir: &Path,
        profile: &StreamProfile,
        started_at: &DateTime<Local>,
        source: &str,
    ) {
        let metadata = SessionMetadata {
            version: app_version(),
            started_at: started_at.to_rfc3339(),
            source,
            profile,
            config: &self.config,
        };
        let path = session_dir.join(METADATA_FILE);
        let result = serde_json::to_string_pretty(&metadata)
            .map_err(|e| e.to_string())
            .and_then(|json| std::fs::write(&path, json).map_err(|e| e.to_string()));
        if let Err(e) = result {
            warn!(path = %path.display(), error = %e, "Failed to write session metadata");
        }
    }
}
