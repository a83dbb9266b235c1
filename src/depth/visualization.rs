// SPDX-License-Identifier: GPL-3.0-only

//! Depth visualization helpers
//!
//! Converts millimetre depth into turbo-colored pixels (blue=near, red=far)
//! for exported previews.

use crate::constants::depth_preview::{MAX_MM, MAX_VALID_MM, MIN_MM};

/// Turbo colormap: perceptually uniform rainbow (blue=near, red=far)
///
/// Based on: https://ai.googleblog.com/2019/08/turbo-improved-rainbow-colormap-for.html
/// Simplified version with polynomial approximation.
#[inline]
fn turbo(t: f32) -> [u8; 4] {
    let r = (0.13572138
        + t * (4.6153926 + t * (-42.66032 + t * (132.13108 + t * (-152.54825 + t * 59.28144)))))
        .clamp(0.0, 1.0);
    let g = (0.09140261
        + t * (2.19418 + t * (4.84296 + t * (-14.18503 + t * (4.27805 + t * 2.53377)))))
        .clamp(0.0, 1.0);
    let b = (0.1066733
        + t * (12.64194 + t * (-60.58204 + t * (109.99648 + t * (-82.52904 + t * 20.43388)))))
        .clamp(0.0, 1.0);
    [(r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8, 255]
}

/// Convert millimetre depth to turbo RGBA (4 bytes per pixel)
///
/// Zero and out-of-range depths are rendered black.
pub fn depth_mm_to_rgba(depth_mm: &[f32]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(depth_mm.len() * 4);

    for &depth in depth_mm {
        if depth <= 0.0 || depth > MAX_VALID_MM {
            rgba.extend_from_slice(&[0, 0, 0, 255]);
            continue;
        }

        let t = ((depth - MIN_MM) / (MAX_MM - MIN_MM)).clamp(0.0, 1.0);
        rgba.extend_from_slice(&turbo(t));
    }
    rgba
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_invalid() {
        let rgba = depth_mm_to_rgba(&[0.0, 20000.0]);
        for chunk in rgba.chunks(4) {
            assert_eq!(chunk, &[0, 0, 0, 255]);
        }
    }

    #[test]
    fn test_turbo_far_is_red() {
        let rgba = depth_mm_to_rgba(&[MAX_MM]);
        assert!(rgba[0] > rgba[2]);
    }

    #[test]
    fn test_turbo_near_is_blue() {
        let rgba = depth_mm_to_rgba(&[MIN_MM + 200.0]);
        assert!(rgba[2] > rgba[0]);
    }
}
