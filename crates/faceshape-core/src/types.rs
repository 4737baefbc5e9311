use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::descriptors::{
    CheekboneProminence, ForeheadWidth, JawShape, JawWidth, LowerFaceLength,
};

/// Coarse facial outline category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaceShape {
    Round,
    Oval,
    Square,
    Oblong,
    Heart,
}

impl FaceShape {
    pub const ALL: [FaceShape; 5] = [
        FaceShape::Round,
        FaceShape::Oval,
        FaceShape::Square,
        FaceShape::Oblong,
        FaceShape::Heart,
    ];

    /// Wire name, e.g. `"oblong"`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Round => "round",
            Self::Oval => "oval",
            Self::Square => "square",
            Self::Oblong => "oblong",
            Self::Heart => "heart",
        }
    }

    /// Korean display name used in the app and calibration reports.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Round => "둥근형",
            Self::Oval => "계란형",
            Self::Square => "각진형",
            Self::Oblong => "긴형",
            Self::Heart => "역삼각형",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Round => "Face length and width are similar, with a soft, rounded jawline.",
            Self::Oval => {
                "Forehead and jaw are balanced and the face is slightly longer than it is wide."
            }
            Self::Square => {
                "Forehead, cheekbones and jaw are of similar width, with an angular jawline."
            }
            Self::Oblong => "The face is long, with forehead, cheekbones and jaw of similar width.",
            Self::Heart => "A wide forehead tapering down to a narrow chin.",
        }
    }
}

impl fmt::Display for FaceShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown face shape: {0}")]
pub struct UnknownFaceShape(pub String);

impl FromStr for FaceShape {
    type Err = UnknownFaceShape;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FaceShape::ALL
            .iter()
            .copied()
            .find(|shape| shape.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownFaceShape(s.to_string()))
    }
}

/// Display-rounded ratios of a measured face.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ratios {
    pub width_to_height_ratio: f64,
    pub jaw_to_face_ratio: f64,
    pub forehead_to_face_ratio: f64,
    pub forehead_to_jaw_ratio: f64,
    pub cheek_to_jaw_ratio: f64,
    /// Whole degrees.
    pub avg_jaw_angle: f64,
    pub mouth_to_face_ratio: f64,
    pub chin_to_face_ratio: f64,
    pub eye_to_face_ratio: f64,
    pub face_taper: f64,
    /// `"upper:middle:lower"` percentages.
    pub face_thirds: String,
}

/// Qualitative description of the face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Details {
    pub forehead_width: ForeheadWidth,
    pub cheekbone_prominence: CheekboneProminence,
    pub jaw_width: JawWidth,
    pub jaw_shape: JawShape,
    pub lower_face_length: LowerFaceLength,
    pub overall_impression: String,
}

/// Full classification output for one face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceAnalysis {
    pub face_shape: FaceShape,
    /// Fixed per rule, in [0, 1].
    pub confidence: f64,
    /// `None` when the face could not be measured.
    pub ratios: Option<Ratios>,
    pub details: Details,
    pub recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_rule: Option<u8>,
    /// Set only on the insufficient-landmark fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FaceAnalysis {
    /// True for the degraded result produced when required landmarks are missing.
    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}
