// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// DepthImage binary container identification
pub mod depth_file {
    /// Magic string written first in every file
    pub const MAGIC: &str = "SOVA";
    /// Container type for depth images
    pub const TYPE: &str = "DI";
    /// The only supported format version
    pub const VERSION: &str = "1.0";
    /// Placeholder written for the reserved measurements field
    pub const EMPTY_MEASUREMENTS: &str = "[]";
    /// File extension for saved depth images
    pub const EXTENSION: &str = "di";
}

/// Depth unit conversion
pub mod depth_units {
    /// Metres to millimetres
    pub const MM_PER_METRE: f64 = 1000.0;
}

/// Depth visualization range used for exported previews
pub mod depth_preview {
    /// Nearest depth mapped to the start of the colormap
    pub const MIN_MM: f32 = 400.0;
    /// Farthest depth mapped to the end of the colormap
    pub const MAX_MM: f32 = 4000.0;
    /// Depths above this are treated as invalid
    pub const MAX_VALID_MM: f32 = 10000.0;
}

/// Session defaults
pub mod session {
    use super::Duration;

    /// Default interval between periodic snapshots
    pub const DEFAULT_CAPTURE_INTERVAL: Duration = Duration::from_secs(60);
    /// Default session length
    pub const DEFAULT_DURATION: Duration = Duration::from_secs(3600);
    /// How long to wait for a frame before re-checking termination conditions
    pub const DEFAULT_FRAME_TIMEOUT: Duration = Duration::from_secs(5);
    /// Session directory name format (local time)
    pub const DIR_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";
    /// Suffixed names tried when a session directory already exists
    pub const MAX_SESSION_DIR_ATTEMPTS: u32 = 1000;
    /// Timestamp format used in averaged artifact names
    pub const ARTIFACT_TIMESTAMP_FORMAT: &str = "%y%m%d%H%M%S";
    /// Metadata file written into every session directory
    pub const METADATA_FILE: &str = "session.json";
    /// Default folder name for capture data
    pub const DEFAULT_DATA_FOLDER: &str = "DepthCapture";
}

/// Get the application version string
pub fn app_version() -> &'static str {
    env!("GIT_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_range_is_ordered() {
        assert!(depth_preview::MIN_MM < depth_preview::MAX_MM);
        assert!(depth_preview::MAX_MM < depth_preview::MAX_VALID_MM);
    }

    #[test]
    fn test_app_version_not_empty() {
        assert!(!app_version().is_empty());
    }
}
