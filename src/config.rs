// SPDX-License-Identifier: GPL-3.0-only

//! Capture session configuration

use crate::constants::session::{
    DEFAULT_CAPTURE_INTERVAL, DEFAULT_DURATION, DEFAULT_FRAME_TIMEOUT,
};
use crate::errors::AppError;
use crate::storage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What a capture session produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CaptureMode {
    /// Persist one distance snapshot every `interval`
    Periodic { interval: Duration },
    /// Fold every frame into a running mean, persisted once at session end
    Averaging,
}

impl Default for CaptureMode {
    fn default() -> Self {
        CaptureMode::Periodic {
            interval: DEFAULT_CAPTURE_INTERVAL,
        }
    }
}

impl std::fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureMode::Periodic { interval } => {
                write!(f, "periodic every {:.1}s", interval.as_secs_f64())
            }
            CaptureMode::Averaging => write!(f, "averaging"),
        }
    }
}

/// Settings for one capture session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Periodic snapshots or a single averaged measurement
    pub mode: CaptureMode,
    /// Wall-clock length of the session
    pub duration: Duration,
    /// Directory under which the per-session directory is created
    pub output_root: PathBuf,
    /// Longest wait for a frame before termination conditions are re-checked
    pub frame_timeout: Duration,
    /// Also write the full DepthImage next to each periodic snapshot
    pub save_depth_images: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: CaptureMode::default(),
            duration: DEFAULT_DURATION,
            output_root: storage::default_data_root(),
            frame_timeout: DEFAULT_FRAME_TIMEOUT,
            save_depth_images: false,
        }
    }
}

impl SessionConfig {
    /// Load a configuration from a JSON file; missing fields take defaults
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&text)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save the configuration as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, text)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))
    }
}
