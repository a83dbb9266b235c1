// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for depth images and the binary file format

use depth_capture::depth::format::{read_image, write_image, write_string};
use depth_capture::{DepthImage, ImageError, Intrinsics, Pixel};

fn sample_image() -> DepthImage {
    let intrinsics = Intrinsics::pinhole(2, 2, 600.0, 610.0, 1.0, 1.0);
    let mut image = DepthImage::new(2, 2, 0.001, intrinsics).unwrap();
    image
        .fill_depth(bytemuck::cast_slice(&[1000u16, 1500, 0, 65535]))
        .unwrap();
    image
}

fn encode(image: &DepthImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    write_image(image, &mut bytes).unwrap();
    bytes
}

#[test]
fn test_round_trip_every_plane_combination() {
    for mask in 0..8u8 {
        let mut image = sample_image();
        if mask & 1 != 0 {
            image.fill_color(&[10; 12]).unwrap();
        }
        if mask & 2 != 0 {
            image.fill_colorized(&[20; 12]).unwrap();
        }
        if mask & 4 != 0 {
            image.fill_confidence(&[1, 2, 3, 4]).unwrap();
        }

        let decoded = read_image(&mut encode(&image).as_slice()).unwrap();
        assert_eq!(decoded, image, "plane mask {:03b}", mask);
        assert_eq!(decoded.has_color(), mask & 1 != 0);
        assert_eq!(decoded.has_colorized(), mask & 2 != 0);
        assert_eq!(decoded.has_confidence(), mask & 4 != 0);
    }
}

#[test]
fn test_save_and_load_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.di");
    let mut image = sample_image();
    image.fill_color(&[7; 12]).unwrap();

    image.save(&path).unwrap();
    let loaded = DepthImage::load(&path).unwrap();
    assert_eq!(loaded, image);

    // No temporary file left behind
    let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().flatten().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn test_bad_magic_is_format_error() {
    let mut bytes = Vec::new();
    write_string(&mut bytes, "NOPE").unwrap();
    bytes.extend_from_slice(&encode(&sample_image())[5..]);

    let err = read_image(&mut bytes.as_slice()).unwrap_err();
    assert!(matches!(err, ImageError::Format(_)), "got {:?}", err);
}

#[test]
fn test_bad_version_is_format_error() {
    let encoded = encode(&sample_image());
    let mut bytes = Vec::new();
    write_string(&mut bytes, "SOVA").unwrap();
    write_string(&mut bytes, "DI").unwrap();
    write_string(&mut bytes, "2.0").unwrap();
    // Skip the valid header: "SOVA" (5) + "DI" (3) + "1.0" (4)
    bytes.extend_from_slice(&encoded[12..]);

    let err = read_image(&mut bytes.as_slice()).unwrap_err();
    assert!(matches!(err, ImageError::Format(_)), "got {:?}", err);
}

/// Header with the given dimensions followed by four absent planes
fn header_only(width: i32, height: i32) -> Vec<u8> {
    let mut bytes = Vec::new();
    write_string(&mut bytes, "SOVA").unwrap();
    write_string(&mut bytes, "DI").unwrap();
    write_string(&mut bytes, "1.0").unwrap();
    bytes.extend_from_slice(&width.to_le_bytes());
    bytes.extend_from_slice(&height.to_le_bytes());
    bytes.extend_from_slice(&0.001f32.to_le_bytes());
    write_string(&mut bytes, &Intrinsics::default().to_json().unwrap()).unwrap();
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    write_string(&mut bytes, "[]").unwrap();
    bytes
}

#[test]
fn test_oversized_dimensions_are_format_error() {
    for (width, height) in [(i32::MAX, i32::MAX), (65_536, 65_536), (i32::MAX, 1)] {
        let bytes = header_only(width, height);
        let err = read_image(&mut bytes.as_slice()).unwrap_err();
        assert!(matches!(err, ImageError::Format(_)), "{}x{}: {:?}", width, height, err);
    }
}

#[test]
fn test_header_without_planes_loads_zero_depth() {
    let bytes = header_only(3, 2);
    let image = read_image(&mut bytes.as_slice()).unwrap();
    assert_eq!(image.depth(), &[0; 6]);
    assert!(!image.has_color());
}

#[test]
fn test_truncated_file_is_io_error() {
    let encoded = encode(&sample_image());
    // Cut into the depth samples
    let truncated = &encoded[..encoded.len() - 8];

    let err = read_image(&mut &truncated[..]).unwrap_err();
    assert!(matches!(err, ImageError::Io(_)), "got {:?}", err);
}

#[test]
fn test_file_without_measurements_loads() {
    let image = sample_image();
    let encoded = encode(&image);
    // Drop the trailing "[]" string (length byte + 2 bytes)
    let legacy = &encoded[..encoded.len() - 3];

    let decoded = read_image(&mut &legacy[..]).unwrap();
    assert_eq!(decoded, image);
}

#[test]
fn test_plane_length_mismatch_is_format_error() {
    let image = sample_image();
    let mut encoded = encode(&image);
    // Depth plane length field follows the has_depth flag; find it by value
    let len_bytes = 8i32.to_le_bytes();
    let pos = encoded
        .windows(5)
        .position(|w| w[0] == 1 && w[1..] == len_bytes)
        .unwrap();
    encoded[pos + 1..pos + 5].copy_from_slice(&6i32.to_le_bytes());

    let err = read_image(&mut encoded.as_slice()).unwrap_err();
    assert!(matches!(err, ImageError::Format(_)), "got {:?}", err);
}

#[test]
fn test_measure_is_zero_for_same_pixel_and_symmetric() {
    let image = sample_image();
    let a = Pixel::new(0, 0);
    let b = Pixel::new(1, 0);

    assert_eq!(image.measure(a, a), Some(0.0));
    assert_eq!(image.measure(a, b), image.measure(b, a));
    assert!(image.measure(a, b).unwrap() > 0.0);
}

#[test]
fn test_measure_matches_pinhole_geometry() {
    // Principal point at (1, 1), fx = 600: pixel (0, 1) at 1000 mm sits
    // 1000 / 600 mm left of the axis
    let intrinsics = Intrinsics::pinhole(2, 2, 600.0, 600.0, 1.0, 1.0);
    let mut image = DepthImage::new(2, 2, 0.001, intrinsics).unwrap();
    image
        .fill_depth(bytemuck::cast_slice(&[0u16, 0, 1000, 1000]))
        .unwrap();

    let distance = image.measure(Pixel::new(0, 1), Pixel::new(1, 1)).unwrap();
    assert!((distance - 1000.0 / 600.0).abs() < 1e-3, "got {}", distance);
}
