// SPDX-License-Identifier: GPL-3.0-only

//! Pinhole camera intrinsics for the depth stream

use serde::{Deserialize, Serialize};

/// Lens distortion model reported with the stream calibration
///
/// Serialized as its integer code so intrinsics JSON stays compatible with
/// files written by earlier capture tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum DistortionModel {
    #[default]
    None,
    ModifiedBrownConrady,
    InverseBrownConrady,
    FTheta,
    BrownConrady,
    KannalaBrandt4,
}

impl TryFrom<i32> for DistortionModel {
    type Error = String;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(DistortionModel::None),
            1 => Ok(DistortionModel::ModifiedBrownConrady),
            2 => Ok(DistortionModel::InverseBrownConrady),
            3 => Ok(DistortionModel::FTheta),
            4 => Ok(DistortionModel::BrownConrady),
            5 => Ok(DistortionModel::KannalaBrandt4),
            other => Err(format!("unknown distortion model code {}", other)),
        }
    }
}

impl From<DistortionModel> for i32 {
    fn from(model: DistortionModel) -> Self {
        match model {
            DistortionModel::None => 0,
            DistortionModel::ModifiedBrownConrady => 1,
            DistortionModel::InverseBrownConrady => 2,
            DistortionModel::FTheta => 3,
            DistortionModel::BrownConrady => 4,
            DistortionModel::KannalaBrandt4 => 5,
        }
    }
}

impl std::fmt::Display for DistortionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DistortionModel::None => "none",
            DistortionModel::ModifiedBrownConrady => "modified Brown-Conrady",
            DistortionModel::InverseBrownConrady => "inverse Brown-Conrady",
            DistortionModel::FTheta => "F-theta",
            DistortionModel::BrownConrady => "Brown-Conrady",
            DistortionModel::KannalaBrandt4 => "Kannala-Brandt 4",
        };
        write!(f, "{}", name)
    }
}

/// Camera intrinsics for depth-to-3D deprojection
///
/// Field names match the calibration JSON stored inside DepthImage files.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Intrinsics {
    /// Calibrated image width
    pub width: i32,
    /// Calibrated image height
    pub height: i32,
    /// Principal point X (pixels)
    pub ppx: f32,
    /// Principal point Y (pixels)
    pub ppy: f32,
    /// Focal length X (pixels)
    pub fx: f32,
    /// Focal length Y (pixels)
    pub fy: f32,
    pub model: DistortionModel,
    pub coeffs: [f32; 5],
}

impl Intrinsics {
    /// Distortion-free pinhole intrinsics
    pub fn pinhole(width: i32, height: i32, fx: f32, fy: f32, ppx: f32, ppy: f32) -> Self {
        Self {
            width,
            height,
            ppx,
            ppy,
            fx,
            fy,
            model: DistortionModel::None,
            coeffs: [0.0; 5],
        }
    }

    /// Encode as the JSON stored in DepthImage files
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode from the JSON stored in DepthImage files
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
