// SPDX-License-Identifier: GPL-3.0-only

//! Incremental frame averaging
//!
//! Fuses many noisy depth frames into one per-pixel mean distance. The mean is
//! updated in place with the first-moment Welford step
//! `mean += (d - mean) / (n + 1)`, so no running sum can overflow or lose
//! precision over multi-hour sessions and the current mean is readable at any
//! time without an extra pass. The accumulator is `f64` throughout.

use crate::depth::{Plane, depth_to_mm};
use crate::errors::{ImageError, ImageResult};

/// Running per-pixel mean of depth distances (millimetres)
#[derive(Debug, Clone)]
pub struct FrameAverager {
    width: u32,
    height: u32,
    sample_count: u64,
    mean: Vec<f64>,
}

/// Final result of an averaging run
#[derive(Debug, Clone, PartialEq)]
pub struct AveragedDepth {
    pub width: u32,
    pub height: u32,
    /// Number of frames folded into the mean
    pub sample_count: u64,
    /// Mean distance per pixel in millimetres, row-major
    pub mean: Vec<f64>,
}

impl FrameAverager {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            sample_count: 0,
            mean: vec![0.0; width as usize * height as usize],
        }
    }

    /// Fold one frame of raw depth units into the mean
    ///
    /// The frame must have exactly `width * height` samples; otherwise nothing
    /// is updated.
    pub fn accumulate(&mut self, depth_units: &[u16], depth_scale: f32) -> ImageResult<()> {
        if depth_units.len() != self.mean.len() {
            return Err(ImageError::ShapeMismatch {
                plane: Plane::Depth,
                expected: Plane::Depth.byte_len(self.mean.len()),
                actual: Plane::Depth.byte_len(depth_units.len()),
            });
        }

        let n = (self.sample_count + 1) as f64;
        for (mean, &unit) in self.mean.iter_mut().zip(depth_units) {
            let distance = depth_to_mm(unit, depth_scale);
            *mean += (distance - *mean) / n;
        }
        self.sample_count += 1;
        Ok(())
    }

    /// Mean as of the last `accumulate` (zeros before the first one)
    pub fn current_mean(&self) -> &[f64] {
        &self.mean
    }

    /// Frames folded in so far
    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Return to the initial state
    pub fn reset(&mut self) {
        self.sample_count = 0;
        self.mean.fill(0.0);
    }

    /// Finish accumulating and hand out the result
    pub fn finish(self) -> AveragedDepth {
        AveragedDepth {
            width: self.width,
            height: self.height,
            sample_count: self.sample_count,
            mean: self.mean,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_frame_becomes_mean() {
        let mut avg = FrameAverager::new(2, 1);
        avg.accumulate(&[100, 200], 0.001).unwrap();
        assert_eq!(avg.sample_count(), 1);
        assert!((avg.current_mean()[0] - 100.0).abs() < 1e-3);
        assert!((avg.current_mean()[1] - 200.0).abs() < 1e-3);
    }

    #[test]
    fn test_shape_mismatch_leaves_state() {
        let mut avg = FrameAverager::new(2, 2);
        avg.accumulate(&[1, 2, 3, 4], 1.0).unwrap();
        let err = avg.accumulate(&[1, 2, 3], 1.0).unwrap_err();
        assert!(matches!(
            err,
            ImageError::ShapeMismatch {
                expected: 8,
                actual: 6,
                ..
            }
        ));
        assert_eq!(avg.sample_count(), 1);
        assert_eq!(avg.current_mean(), &[1000.0, 2000.0, 3000.0, 4000.0]);
    }

    #[test]
    fn test_finish_reports_count() {
        let mut avg = FrameAverager::new(1, 1);
        for _ in 0..5 {
            avg.accumulate(&[10], 1.0).unwrap();
        }
        let result = avg.finish();
        assert_eq!(result.sample_count, 5);
        assert_eq!(result.mean, vec![10_000.0]);
    }
}
