// SPDX-License-Identifier: GPL-3.0-only

//! Depth images
//!
//! A [`DepthImage`] owns one logical capture: the pixel grid dimensions, the
//! sensor depth scale, the depth stream intrinsics and up to four parallel
//! pixel planes:
//!
//! - depth: raw 16-bit depth units, always present
//! - color: interleaved RGB, optional
//! - colorized: RGB visualization overlay, optional
//! - confidence: one confidence class byte per pixel, optional
//!
//! Planes are replaced wholesale through the `fill_*` family; a plane is either
//! fully present or absent. Images persist to the self-describing binary
//! format implemented in [`format`].

pub mod format;
mod intrinsics;
pub mod projection;
pub mod visualization;

pub use intrinsics::{DistortionModel, Intrinsics};
pub use projection::{Pixel, Point3, deproject, depth_to_mm};

use crate::errors::{ImageError, ImageResult};
use crate::storage;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;
use tracing::debug;

/// One of the parallel pixel planes of a depth image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Plane {
    Depth,
    Color,
    Colorized,
    Confidence,
}

impl Plane {
    /// All planes in file order
    pub const ALL: [Plane; 4] = [
        Plane::Depth,
        Plane::Color,
        Plane::Colorized,
        Plane::Confidence,
    ];

    /// Bytes per pixel for this plane
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Plane::Depth => 2,
            Plane::Color | Plane::Colorized => 3,
            Plane::Confidence => 1,
        }
    }

    /// Expected buffer size in bytes for a grid of `pixel_count` pixels
    pub fn byte_len(&self, pixel_count: usize) -> usize {
        pixel_count * self.bytes_per_pixel()
    }
}

/// Pixel count of a `width` x `height` grid the binary format can hold
///
/// Both dimensions must be non-zero and every plane must fit the format's
/// signed 32-bit length field.
pub fn grid_pixel_count(width: u32, height: u32) -> ImageResult<usize> {
    if width == 0 || height == 0 {
        return Err(ImageError::Format(format!(
            "invalid dimensions {}x{}",
            width, height
        )));
    }
    // Color is the widest plane
    (width as usize)
        .checked_mul(height as usize)
        .filter(|&pixels| {
            Plane::Color
                .bytes_per_pixel()
                .checked_mul(pixels)
                .is_some_and(|len| len <= i32::MAX as usize)
        })
        .ok_or_else(|| {
            ImageError::Format(format!("dimensions {}x{} are too large", width, height))
        })
}

impl std::fmt::Display for Plane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Plane::Depth => write!(f, "depth"),
            Plane::Color => write!(f, "color"),
            Plane::Colorized => write!(f, "colorized"),
            Plane::Confidence => write!(f, "confidence"),
        }
    }
}

/// A depth capture with everything needed to measure distances on it
#[derive(Debug, Clone, PartialEq)]
pub struct DepthImage {
    width: u32,
    height: u32,
    depth_scale: f32,
    intrinsics: Intrinsics,
    depth: Vec<u16>,
    color: Option<Vec<u8>>,
    colorized: Option<Vec<u8>>,
    confidence: Option<Vec<u8>>,
}

impl DepthImage {
    /// Create an empty image: zeroed depth plane, all other planes absent
    ///
    /// # Arguments
    /// * `width`, `height` - Pixel grid dimensions, see [`grid_pixel_count`]
    /// * `depth_scale` - Metres per raw depth unit, as reported by the sensor
    /// * `intrinsics` - Depth stream intrinsics
    ///
    /// # Errors
    /// [`ImageError::Format`] for dimensions the binary format cannot store.
    pub fn new(
        width: u32,
        height: u32,
        depth_scale: f32,
        intrinsics: Intrinsics,
    ) -> ImageResult<Self> {
        let pixels = grid_pixel_count(width, height)?;
        Ok(Self {
            width,
            height,
            depth_scale,
            intrinsics,
            depth: vec![0; pixels],
            color: None,
            colorized: None,
            confidence: None,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn depth_scale(&self) -> f32 {
        self.depth_scale
    }

    pub fn intrinsics(&self) -> &Intrinsics {
        &self.intrinsics
    }

    /// Number of pixels in the grid
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Raw depth units, row-major
    pub fn depth(&self) -> &[u16] {
        &self.depth
    }

    pub fn color(&self) -> Option<&[u8]> {
        self.color.as_deref()
    }

    pub fn colorized(&self) -> Option<&[u8]> {
        self.colorized.as_deref()
    }

    pub fn confidence(&self) -> Option<&[u8]> {
        self.confidence.as_deref()
    }

    pub fn has_color(&self) -> bool {
        self.color.is_some()
    }

    pub fn has_colorized(&self) -> bool {
        self.colorized.is_some()
    }

    pub fn has_confidence(&self) -> bool {
        self.confidence.is_some()
    }

    /// Whether a plane currently holds data
    pub fn has_plane(&self, plane: Plane) -> bool {
        match plane {
            Plane::Depth => true,
            Plane::Color => self.has_color(),
            Plane::Colorized => self.has_colorized(),
            Plane::Confidence => self.has_confidence(),
        }
    }

    /// Replace the depth plane with native-endian 16-bit samples
    ///
    /// `bytes` must hold exactly `2 * width * height` bytes. On mismatch the
    /// current plane is left untouched.
    pub fn fill_depth(&mut self, bytes: &[u8]) -> ImageResult<()> {
        check_len(Plane::Depth, self.pixel_count(), bytes)?;
        bytemuck::cast_slice_mut::<u16, u8>(&mut self.depth).copy_from_slice(bytes);
        Ok(())
    }

    /// Replace the color plane with interleaved RGB bytes
    pub fn fill_color(&mut self, bytes: &[u8]) -> ImageResult<()> {
        let pixels = self.pixel_count();
        fill_plane(&mut self.color, Plane::Color, pixels, bytes)
    }

    /// Replace the colorized plane with interleaved RGB bytes
    pub fn fill_colorized(&mut self, bytes: &[u8]) -> ImageResult<()> {
        let pixels = self.pixel_count();
        fill_plane(&mut self.colorized, Plane::Colorized, pixels, bytes)
    }

    /// Replace the confidence plane with one byte per pixel
    pub fn fill_confidence(&mut self, bytes: &[u8]) -> ImageResult<()> {
        let pixels = self.pixel_count();
        fill_plane(&mut self.confidence, Plane::Confidence, pixels, bytes)
    }

    /// Fill depth, color and (optionally) confidence from one frameset
    ///
    /// All inputs are validated before any plane is modified.
    pub fn fill(
        &mut self,
        depth: &[u8],
        color: &[u8],
        confidence: Option<&[u8]>,
    ) -> ImageResult<()> {
        let pixels = self.pixel_count();
        check_len(Plane::Depth, pixels, depth)?;
        check_len(Plane::Color, pixels, color)?;
        if let Some(confidence) = confidence {
            check_len(Plane::Confidence, pixels, confidence)?;
        }

        self.fill_depth(depth)?;
        self.fill_color(color)?;
        if let Some(confidence) = confidence {
            self.fill_confidence(confidence)?;
        }
        Ok(())
    }

    /// Raw depth unit at a pixel, `None` outside the grid
    pub fn depth_at(&self, pixel: Pixel) -> Option<u16> {
        if pixel.x >= self.width || pixel.y >= self.height {
            return None;
        }
        self.depth
            .get(pixel.y as usize * self.width as usize + pixel.x as usize)
            .copied()
    }

    /// Deproject a pixel into camera space (millimetres)
    pub fn deproject(&self, pixel: Pixel) -> Option<Point3> {
        let unit = self.depth_at(pixel)?;
        Some(deproject(pixel, unit, self.depth_scale, &self.intrinsics))
    }

    /// Euclidean distance in millimetres between two deprojected pixels
    pub fn measure(&self, p1: Pixel, p2: Pixel) -> Option<f64> {
        let a = self.deproject(p1)?;
        let b = self.deproject(p2)?;
        Some(a.distance(&b))
    }

    /// Depth plane converted to millimetres
    pub fn distances_mm(&self) -> Vec<f32> {
        self.depth
            .iter()
            .map(|&unit| depth_to_mm(unit, self.depth_scale) as f32)
            .collect()
    }

    /// Save in the binary DepthImage format
    ///
    /// The file is written under a temporary name and renamed into place, so
    /// a failed save never leaves a complete-looking file at `path`.
    pub fn save(&self, path: &Path) -> ImageResult<()> {
        storage::write_atomic(path, |writer| self.write_to(writer))?;
        debug!(
            path = %path.display(),
            width = self.width,
            height = self.height,
            "Saved depth image"
        );
        Ok(())
    }

    /// Load from the binary DepthImage format
    pub fn load(path: &Path) -> ImageResult<Self> {
        let file = File::open(path)
            .map_err(|e| ImageError::Io(format!("{}: {}", path.display(), e)))?;
        let image = Self::read_from(&mut BufReader::new(file))?;
        debug!(
            path = %path.display(),
            width = image.width,
            height = image.height,
            "Loaded depth image"
        );
        Ok(image)
    }

    /// Read an image in the binary format from any reader
    pub fn read_from<R: Read>(reader: &mut R) -> ImageResult<Self> {
        format::read_image(reader)
    }

    /// Write the image in the binary format to any writer
    pub fn write_to<W: Write>(&self, writer: &mut W) -> ImageResult<()> {
        format::write_image(self, writer)
    }

    /// Assemble an image from fully validated parts (used by the loader)
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        width: u32,
        height: u32,
        depth_scale: f32,
        intrinsics: Intrinsics,
        depth: Vec<u16>,
        color: Option<Vec<u8>>,
        colorized: Option<Vec<u8>>,
        confidence: Option<Vec<u8>>,
    ) -> Self {
        Self {
            width,
            height,
            depth_scale,
            intrinsics,
            depth,
            color,
            colorized,
            confidence,
        }
    }
}

fn check_len(plane: Plane, pixel_count: usize, bytes: &[u8]) -> ImageResult<()> {
    let expected = plane.byte_len(pixel_count);
    if bytes.len() != expected {
        return Err(ImageError::ShapeMismatch {
            plane,
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

fn fill_plane(
    buffer: &mut Option<Vec<u8>>,
    plane: Plane,
    pixel_count: usize,
    bytes: &[u8],
) -> ImageResult<()> {
    check_len(plane, pixel_count, bytes)?;
    buffer
        .get_or_insert_with(|| vec![0; plane.byte_len(pixel_count)])
        .copy_from_slice(bytes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(width: u32, height: u32) -> DepthImage {
        DepthImage::new(
            width,
            height,
            0.001,
            Intrinsics::pinhole(width as i32, height as i32, 2.0, 2.0, 0.0, 0.0),
        )
        .unwrap()
    }

    fn depth_bytes(units: &[u16]) -> Vec<u8> {
        bytemuck::cast_slice(units).to_vec()
    }

    #[test]
    fn test_new_has_only_depth() {
        let img = image(3, 2);
        assert_eq!(img.depth(), &[0; 6]);
        assert!(!img.has_color());
        assert!(!img.has_colorized());
        assert!(!img.has_confidence());
    }

    #[test]
    fn test_new_rejects_unstorable_dimensions() {
        for (width, height) in [(0, 4), (4, 0), (u32::MAX, 1), (65_536, 65_536)] {
            let err = DepthImage::new(width, height, 0.001, Intrinsics::default()).unwrap_err();
            assert!(matches!(err, ImageError::Format(_)), "{}x{}: {:?}", width, height, err);
        }
    }

    #[test]
    fn test_grid_pixel_count_limit() {
        // Largest square whose color plane fits an i32 length
        assert_eq!(grid_pixel_count(26_754, 26_754).unwrap(), 26_754 * 26_754);
        assert!(grid_pixel_count(26_755, 26_755).is_err());
    }

    #[test]
    fn test_fill_depth() {
        let mut img = image(2, 1);
        img.fill_depth(&depth_bytes(&[1000, 2000])).unwrap();
        assert_eq!(img.depth(), &[1000, 2000]);
    }

    #[test]
    fn test_fill_depth_rejects_short_and_long_buffers() {
        let mut img = image(2, 1);
        img.fill_depth(&depth_bytes(&[7, 8])).unwrap();

        let err = img.fill_depth(&[0u8; 3]).unwrap_err();
        assert_eq!(
            err,
            ImageError::ShapeMismatch {
                plane: Plane::Depth,
                expected: 4,
                actual: 3
            }
        );
        assert!(img.fill_depth(&[0u8; 6]).is_err());
        // Untouched on failure
        assert_eq!(img.depth(), &[7, 8]);
    }

    #[test]
    fn test_fill_color_allocates_lazily() {
        let mut img = image(2, 1);
        assert!(img.color().is_none());
        img.fill_color(&[1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(img.color(), Some(&[1, 2, 3, 4, 5, 6][..]));
        assert!(img.fill_color(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_fill_validates_before_mutating() {
        let mut img = image(2, 1);
        let result = img.fill(&depth_bytes(&[5, 6]), &[0u8; 6], Some(&[1u8]));
        assert!(matches!(
            result,
            Err(ImageError::ShapeMismatch {
                plane: Plane::Confidence,
                ..
            })
        ));
        assert_eq!(img.depth(), &[0, 0]);
        assert!(!img.has_color());
    }

    #[test]
    fn test_clone_is_independent() {
        let mut img = image(2, 1);
        img.fill_color(&[9; 6]).unwrap();
        let copy = img.clone();
        img.fill_depth(&depth_bytes(&[1, 1])).unwrap();
        img.fill_color(&[0; 6]).unwrap();
        assert_eq!(copy.depth(), &[0, 0]);
        assert_eq!(copy.color(), Some(&[9; 6][..]));
    }

    #[test]
    fn test_deproject_outside_grid() {
        let img = image(2, 2);
        assert!(img.deproject(Pixel::new(2, 0)).is_none());
        assert!(img.measure(Pixel::new(0, 0), Pixel::new(0, 5)).is_none());
    }

    #[test]
    fn test_distances_mm() {
        let mut img = image(2, 1);
        img.fill_depth(&depth_bytes(&[1000, 2000])).unwrap();
        let d = img.distances_mm();
        assert!((d[0] - 1000.0).abs() < 1e-3);
        assert!((d[1] - 2000.0).abs() < 1e-3);
    }
}
