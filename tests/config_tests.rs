// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for session configuration

use depth_capture::{AppError, CaptureMode, SessionConfig};
use std::time::Duration;

#[test]
fn test_config_default() {
    let config = SessionConfig::default();

    assert_eq!(
        config.mode,
        CaptureMode::Periodic {
            interval: Duration::from_secs(60)
        }
    );
    assert_eq!(config.duration, Duration::from_secs(3600));
    assert!(!config.save_depth_images);
    assert!(
        config.output_root.ends_with("DepthCapture"),
        "Default output root should be the DepthCapture data folder"
    );
}

#[test]
fn test_config_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let config = SessionConfig {
        mode: CaptureMode::Averaging,
        duration: Duration::from_millis(90_500),
        output_root: dir.path().join("out"),
        frame_timeout: Duration::from_secs(2),
        save_depth_images: true,
    };

    config.save(&path).unwrap();
    assert_eq!(SessionConfig::load(&path).unwrap(), config);
}

#[test]
fn test_config_missing_fields_take_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.json");
    std::fs::write(
        &path,
        r#"{ "mode": { "kind": "periodic", "interval": { "secs": 5, "nanos": 0 } } }"#,
    )
    .unwrap();

    let config = SessionConfig::load(&path).unwrap();
    assert_eq!(
        config.mode,
        CaptureMode::Periodic {
            interval: Duration::from_secs(5)
        }
    );
    assert_eq!(config.duration, SessionConfig::default().duration);
}

#[test]
fn test_config_invalid_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(matches!(SessionConfig::load(&path), Err(AppError::Config(_))));
}
