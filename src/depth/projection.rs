// SPDX-License-Identifier: GPL-3.0-only

//! Pixel + depth to 3D deprojection
//!
//! All distances are in millimetres. Distortion coefficients are not applied;
//! deprojection uses the plain pinhole model.

use super::Intrinsics;
use crate::constants::depth_units::MM_PER_METRE;

/// Pixel coordinates on the depth grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pixel {
    pub x: u32,
    pub y: u32,
}

impl Pixel {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// A point in camera space (millimetres)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Convert a raw depth unit to millimetres
#[inline]
pub fn depth_to_mm(depth_unit: u16, depth_scale: f32) -> f64 {
    depth_unit as f64 * MM_PER_METRE * depth_scale as f64
}

/// Deproject a pixel with its raw depth unit into camera space
pub fn deproject(
    pixel: Pixel,
    depth_unit: u16,
    depth_scale: f32,
    intrinsics: &Intrinsics,
) -> Point3 {
    let z = depth_to_mm(depth_unit, depth_scale);
    Point3 {
        x: z * (pixel.x as f64 - intrinsics.ppx as f64) / intrinsics.fx as f64,
        y: z * (pixel.y as f64 - intrinsics.ppy as f64) / intrinsics.fy as f64,
        z,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intrinsics() -> Intrinsics {
        Intrinsics::pinhole(4, 4, 2.0, 4.0, 1.0, 1.0)
    }

    #[test]
    fn test_depth_to_mm() {
        assert_eq!(depth_to_mm(0, 0.001), 0.0);
        assert!((depth_to_mm(1000, 0.001) - 1000.0).abs() < 1e-3);
    }

    #[test]
    fn test_principal_point_lies_on_axis() {
        let p = deproject(Pixel::new(1, 1), 500, 0.001, &intrinsics());
        assert_eq!(p.x, 0.0);
        assert_eq!(p.y, 0.0);
        assert!((p.z - 500.0).abs() < 1e-3);
    }

    #[test]
    fn test_offset_pixel() {
        // z = 1000mm, x = 1000 * (3 - 1) / 2, y = 1000 * (3 - 1) / 4
        let p = deproject(Pixel::new(3, 3), 1000, 0.001, &intrinsics());
        assert!((p.x - 1000.0).abs() < 1e-2);
        assert!((p.y - 500.0).abs() < 1e-2);
    }

    #[test]
    fn test_distance() {
        let a = Point3 {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        };
        let b = Point3 {
            x: 3.0,
            y: 4.0,
            z: 12.0,
        };
        assert_eq!(a.distance(&b), 13.0);
        assert_eq!(b.distance(&a), 13.0);
    }
}
