// SPDX-License-Identifier: GPL-3.0-only

//! Export of saved depth images
//!
//! Turns a [`DepthImage`] into files other tools can open:
//! - `depth_mm.npy`: distances in millimetres (f32)
//! - `depth.png`: turbo colormap preview
//! - `color.png`, `colorized.png`, `confidence.png`: optional planes
//! - `points.las`: coloured point cloud in metres

use crate::depth::visualization::depth_mm_to_rgba;
use crate::depth::{DepthImage, Pixel, Plane};
use crate::errors::ExportError;
use crate::storage;
use image::{GrayImage, ImageFormat, RgbImage, RgbaImage};
use las::{Builder, Color, Point, Writer};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// LAS coordinate precision in metres
const LAS_SCALE: f64 = 0.001;

/// Colour used for points when the image has no colour plane
const FALLBACK_GRAY: u8 = 128;

/// Export every representation of `image` into `out_dir`
///
/// Returns the written files in order. The directory is created if missing.
/// An image without any valid depth fails before anything is written.
pub fn export_depth_image(
    image: &DepthImage,
    out_dir: &Path,
) -> Result<Vec<PathBuf>, ExportError> {
    if image.depth().iter().all(|&unit| unit == 0) {
        return Err(ExportError::NoValidDepth);
    }
    std::fs::create_dir_all(out_dir)?;
    let mut written = Vec::new();

    let distances = image.distances_mm();

    let path = out_dir.join("depth_mm.npy");
    storage::write_npy(&path, distances.clone())?;
    written.push(path);

    let path = out_dir.join("depth.png");
    let rgba = depth_mm_to_rgba(&distances);
    let preview = RgbaImage::from_raw(image.width(), image.height(), rgba)
        .ok_or_else(|| ExportError::Encoding("depth preview buffer size".to_string()))?;
    write_png(&path, |w| preview.write_to(w, ImageFormat::Png))?;
    written.push(path);

    for (plane, data) in [
        (Plane::Color, image.color()),
        (Plane::Colorized, image.colorized()),
    ] {
        let Some(data) = data else { continue };
        let path = out_dir.join(format!("{}.png", plane));
        let rgb = RgbImage::from_raw(image.width(), image.height(), data.to_vec())
            .ok_or_else(|| ExportError::Encoding(format!("{} plane buffer size", plane)))?;
        write_png(&path, |w| rgb.write_to(w, ImageFormat::Png))?;
        written.push(path);
    }

    if let Some(data) = image.confidence() {
        let path = out_dir.join(format!("{}.png", Plane::Confidence));
        let gray = GrayImage::from_raw(image.width(), image.height(), data.to_vec())
            .ok_or_else(|| ExportError::Encoding("confidence plane buffer size".to_string()))?;
        write_png(&path, |w| gray.write_to(w, ImageFormat::Png))?;
        written.push(path);
    }

    let path = out_dir.join("points.las");
    export_point_cloud_las(image, &path)?;
    written.push(path);

    info!(path = %out_dir.display(), files = written.len(), "Export complete");
    Ok(written)
}

fn write_png<F>(path: &Path, encode: F) -> Result<(), ExportError>
where
    F: FnOnce(&mut std::io::Cursor<&mut Vec<u8>>) -> image::ImageResult<()>,
{
    let mut buffer = Vec::new();
    encode(&mut std::io::Cursor::new(&mut buffer))
        .map_err(|e| ExportError::Encoding(format!("{}: {}", path.display(), e)))?;
    storage::write_atomic(path, |w| w.write_all(&buffer).map_err(ExportError::from))?;
    debug!(path = %path.display(), bytes = buffer.len(), "Wrote PNG");
    Ok(())
}

/// Write every pixel with non-zero depth as a LAS 1.4 point in metres
///
/// Point colour comes from the colour plane, else the colorized plane, else
/// mid-gray.
pub fn export_point_cloud_las(
    image: &DepthImage,
    output_path: &Path,
) -> Result<(), ExportError> {
    let rgb = image.color().or(image.colorized());
    let mut points = Vec::new();

    for y in 0..image.height() {
        for x in 0..image.width() {
            let pixel = Pixel::new(x, y);
            if image.depth_at(pixel).unwrap_or(0) == 0 {
                continue;
            }
            let Some(p) = image.deproject(pixel) else {
                continue;
            };

            let idx = (y as usize * image.width() as usize + x as usize) * 3;
            let channel = |offset: usize| {
                rgb.and_then(|data| data.get(idx + offset).copied())
                    .unwrap_or(FALLBACK_GRAY) as u16
                    * 256
            };

            points.push((
                p.x / 1000.0,
                p.y / 1000.0,
                p.z / 1000.0,
                channel(0),
                channel(1),
                channel(2),
            ));
        }
    }

    if points.is_empty() {
        return Err(ExportError::NoValidDepth);
    }

    info!(
        point_count = points.len(),
        path = %output_path.display(),
        "Exporting point cloud"
    );

    let bounds = |axis: fn(&(f64, f64, f64, u16, u16, u16)) -> f64| {
        points
            .iter()
            .map(axis)
            .fold((f64::MAX, f64::MIN), |(min, max), v| (min.min(v), max.max(v)))
    };
    let (min_x, max_x) = bounds(|p| p.0);
    let (min_y, max_y) = bounds(|p| p.1);
    let (min_z, max_z) = bounds(|p| p.2);

    let mut builder = Builder::from((1, 4));
    builder.point_format.has_color = true;
    builder.transforms = las::Vector {
        x: las::Transform {
            scale: LAS_SCALE,
            offset: (min_x + max_x) / 2.0,
        },
        y: las::Transform {
            scale: LAS_SCALE,
            offset: (min_y + max_y) / 2.0,
        },
        z: las::Transform {
            scale: LAS_SCALE,
            offset: (min_z + max_z) / 2.0,
        },
    };

    let header = builder
        .into_header()
        .map_err(|e| ExportError::PointCloud(format!("Failed to build LAS header: {}", e)))?;
    let mut writer = Writer::from_path(output_path, header)
        .map_err(|e| ExportError::PointCloud(format!("Failed to create LAS writer: {}", e)))?;

    for (px, py, pz, r, g, b) in points {
        let mut point = Point::default();
        point.x = px;
        point.y = py;
        point.z = pz;
        point.color = Some(Color::new(r, g, b));

        writer
            .write_point(point)
            .map_err(|e| ExportError::PointCloud(format!("Failed to write point: {}", e)))?;
    }

    writer
        .close()
        .map_err(|e| ExportError::PointCloud(format!("Failed to close LAS file: {}", e)))?;

    debug!(path = %output_path.display(), "LAS export complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depth::Intrinsics;

    fn image_with_depth(depth: &[u16]) -> DepthImage {
        let intrinsics = Intrinsics::pinhole(2, 2, 1.0, 1.0, 1.0, 1.0);
        let mut image = DepthImage::new(2, 2, 0.001, intrinsics).unwrap();
        image.fill_depth(bytemuck::cast_slice(depth)).unwrap();
        image
    }

    #[test]
    fn test_export_without_depth_fails() {
        let dir = tempfile::tempdir().unwrap();
        let image = image_with_depth(&[0, 0, 0, 0]);
        let err = export_point_cloud_las(&image, &dir.path().join("points.las")).unwrap_err();
        assert!(matches!(err, ExportError::NoValidDepth));
    }

    #[test]
    fn test_failed_export_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("frame");
        let image = image_with_depth(&[0, 0, 0, 0]);

        let err = export_depth_image(&image, &out).unwrap_err();
        assert!(matches!(err, ExportError::NoValidDepth), "got {:?}", err);
        assert!(!out.exists());
    }

    #[test]
    fn test_export_writes_expected_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut image = image_with_depth(&[1000, 0, 1500, 2000]);
        image.fill_confidence(&[1, 2, 3, 4]).unwrap();

        let files = export_depth_image(&image, dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["depth_mm.npy", "depth.png", "confidence.png", "points.las"]);
        for file in &files {
            assert!(file.is_file());
        }
    }
}
