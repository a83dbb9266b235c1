// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the replay source

use depth_capture::backends::{DepthSource, FramePoll, ReplaySource};
use depth_capture::{BackendError, DepthImage, Intrinsics};
use std::path::Path;
use std::time::Duration;

fn save_frame(dir: &Path, name: &str, width: u32, units: &[u16]) {
    let height = units.len() as u32 / width;
    let intrinsics = Intrinsics::pinhole(width as i32, height as i32, 500.0, 500.0, 0.5, 0.5);
    let mut image = DepthImage::new(width, height, 0.001, intrinsics).unwrap();
    image.fill_depth(bytemuck::cast_slice(units)).unwrap();
    image.save(&dir.join(name)).unwrap();
}

fn next_units(source: &mut ReplaySource) -> Option<Vec<u16>> {
    match source.next_frame(Duration::from_millis(100)).unwrap() {
        FramePoll::Frame(frame) => Some(
            frame
                .data
                .chunks_exact(2)
                .map(|b| u16::from_ne_bytes([b[0], b[1]]))
                .collect(),
        ),
        FramePoll::Timeout => panic!("unexpected timeout"),
        FramePoll::Closed => None,
    }
}

#[test]
fn test_replays_in_name_order_then_closes() {
    let dir = tempfile::tempdir().unwrap();
    save_frame(dir.path(), "002.di", 2, &[3, 4]);
    save_frame(dir.path(), "001.di", 2, &[1, 2]);
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let mut source = ReplaySource::open(dir.path()).unwrap();
    assert_eq!(source.len(), 2);
    assert_eq!(source.profile().width, 2);
    assert_eq!(source.profile().height, 1);
    assert_eq!(source.profile().depth_scale, 0.001);

    assert_eq!(next_units(&mut source), Some(vec![1, 2]));
    assert_eq!(next_units(&mut source), Some(vec![3, 4]));
    assert_eq!(next_units(&mut source), None);
}

#[test]
fn test_looping_restarts() {
    let dir = tempfile::tempdir().unwrap();
    save_frame(dir.path(), "a.di", 1, &[9]);

    let mut source = ReplaySource::open(dir.path()).unwrap().looping(true);
    for _ in 0..3 {
        assert_eq!(next_units(&mut source), Some(vec![9]));
    }
}

#[test]
fn test_empty_directory_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let err = ReplaySource::open(dir.path()).err().unwrap();
    assert!(matches!(err, BackendError::DeviceUnavailable(_)), "got {:?}", err);
}

#[test]
fn test_dimension_change_is_format_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    save_frame(dir.path(), "1.di", 2, &[1, 2]);
    save_frame(dir.path(), "2.di", 1, &[1, 2]);

    let mut source = ReplaySource::open(dir.path()).unwrap();
    assert!(next_units(&mut source).is_some());
    let err = source.next_frame(Duration::from_millis(100)).unwrap_err();
    assert!(matches!(err, BackendError::FormatMismatch(_)), "got {:?}", err);
}

#[test]
fn test_frame_rate_paces_delivery() {
    let dir = tempfile::tempdir().unwrap();
    save_frame(dir.path(), "1.di", 1, &[1]);
    save_frame(dir.path(), "2.di", 1, &[2]);

    let mut source = ReplaySource::open(dir.path()).unwrap().with_frame_rate(2.0);
    assert_eq!(next_units(&mut source), Some(vec![1]));

    // Second frame is due 500 ms later, beyond a 1 ms timeout
    let poll = source.next_frame(Duration::from_millis(1)).unwrap();
    assert!(matches!(poll, FramePoll::Timeout), "got {:?}", poll);

    let poll = source.next_frame(Duration::from_secs(2)).unwrap();
    assert!(matches!(poll, FramePoll::Frame(_)), "got {:?}", poll);
}
