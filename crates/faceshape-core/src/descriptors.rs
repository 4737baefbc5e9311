//! Qualitative face descriptors, impression text and style tips.

use serde::{Deserialize, Serialize};

use crate::metrics::Metrics;
use crate::types::FaceShape;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForeheadWidth {
    Narrow,
    #[default]
    Medium,
    Wide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheekboneProminence {
    Flat,
    #[default]
    Moderate,
    Prominent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JawWidth {
    Narrow,
    #[default]
    Medium,
    Wide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JawShape {
    #[default]
    Round,
    Angular,
    Pointed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LowerFaceLength {
    Short,
    #[default]
    Medium,
    Long,
}

const BALANCED_IMPRESSION: &str = "balanced facial proportions";

/// Bucketed view of a face's metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Descriptors {
    pub forehead_width: ForeheadWidth,
    pub cheekbone_prominence: CheekboneProminence,
    pub jaw_width: JawWidth,
    pub jaw_shape: JawShape,
    pub lower_face_length: LowerFaceLength,
}

impl Descriptors {
    pub fn from_metrics(m: &Metrics) -> Self {
        let forehead_width = if m.forehead_to_face < 0.70 {
            ForeheadWidth::Narrow
        } else if m.forehead_to_face > 0.85 {
            ForeheadWidth::Wide
        } else {
            ForeheadWidth::Medium
        };

        let cheekbone_prominence = if m.cheek_to_jaw < 1.15 {
            CheekboneProminence::Flat
        } else if m.cheek_to_jaw > 1.35 {
            CheekboneProminence::Prominent
        } else {
            CheekboneProminence::Moderate
        };

        let jaw_width = if m.jaw_to_face < 0.74 {
            JawWidth::Narrow
        } else if m.jaw_to_face > 0.79 {
            JawWidth::Wide
        } else {
            JawWidth::Medium
        };

        let jaw_shape = if m.avg_jaw_angle <= 30.0 && m.jaw_to_face >= 0.79 {
            JawShape::Angular
        } else if m.avg_jaw_angle >= 36.0 && m.jaw_to_face <= 0.77 {
            JawShape::Pointed
        } else {
            JawShape::Round
        };

        let lower_face_length = if m.lower_third_pct < 28 {
            LowerFaceLength::Short
        } else if m.lower_third_pct > 38 {
            LowerFaceLength::Long
        } else {
            LowerFaceLength::Medium
        };

        Self {
            forehead_width,
            cheekbone_prominence,
            jaw_width,
            jaw_shape,
            lower_face_length,
        }
    }

    /// Comma-separated summary of the notable features.
    pub fn overall_impression(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();

        match self.forehead_width {
            ForeheadWidth::Narrow => parts.push("narrow forehead"),
            ForeheadWidth::Wide => parts.push("wide forehead"),
            ForeheadWidth::Medium => {}
        }
        match self.lower_face_length {
            LowerFaceLength::Long => parts.push("long lower face"),
            LowerFaceLength::Short => parts.push("short lower face"),
            LowerFaceLength::Medium => {}
        }
        if self.cheekbone_prominence == CheekboneProminence::Prominent {
            parts.push("prominent cheekbones");
        }
        match self.jaw_shape {
            JawShape::Angular => parts.push("angular jawline"),
            JawShape::Pointed => parts.push("pointed chin"),
            JawShape::Round => {}
        }
        if self.jaw_width == JawWidth::Wide {
            parts.push("wide jaw");
        }

        if parts.is_empty() {
            BALANCED_IMPRESSION.to_string()
        } else {
            parts.join(", ")
        }
    }

    /// Feature tips in bucket order, then the tips for `shape`.
    pub fn recommendations(&self, shape: FaceShape) -> Vec<String> {
        let mut tips: Vec<&str> = Vec::new();

        match self.forehead_width {
            ForeheadWidth::Narrow => tips.push(
                "Lifting the fringe or adding volume at the roots makes the forehead look wider.",
            ),
            ForeheadWidth::Wide => {
                tips.push("See-through bangs or a soft fringe cover the forehead naturally.")
            }
            ForeheadWidth::Medium => {}
        }

        if self.cheekbone_prominence == CheekboneProminence::Prominent {
            tips.push("Hair falling alongside the cheekbones softens them naturally.");
        }

        if self.jaw_width == JawWidth::Wide {
            tips.push("Layers that end below the jaw draw the eye past its widest point.");
        }

        match self.jaw_shape {
            JawShape::Angular => {
                tips.push("Waves or a perm add soft curves that gentle an angular jaw.")
            }
            JawShape::Pointed => {
                tips.push("A bob with volume at the jawline balances a pointed chin.")
            }
            JawShape::Round => {}
        }

        match self.lower_face_length {
            LowerFaceLength::Long => {
                tips.push("C-curls or layers that wrap the jawline cover a long lower face.");
                tips.push("Volume beside the cheeks makes the face look shorter.");
            }
            LowerFaceLength::Short => {
                tips.push("Long layers that emphasise vertical lines suit a short lower face.")
            }
            LowerFaceLength::Medium => {}
        }

        tips.extend_from_slice(shape_tips(shape));
        tips.into_iter().map(String::from).collect()
    }
}

/// Fixed style tips per face shape.
pub fn shape_tips(shape: FaceShape) -> &'static [&'static str] {
    match shape {
        FaceShape::Round => &[
            "Height at the crown adds length to a round face.",
            "Side-swept or asymmetric parts break up the roundness.",
        ],
        FaceShape::Oval => &[
            "Balanced proportions suit most lengths and partings.",
            "Keep the face open to show off its proportions.",
        ],
        FaceShape::Square => &[
            "Soft waves and textured ends soften a strong jawline.",
            "Avoid blunt cuts that end exactly at the jaw.",
        ],
        FaceShape::Oblong => &[
            "Volume at the sides balances a long face.",
            "Bangs shorten the visible face length.",
        ],
        FaceShape::Heart => &[
            "Volume around the chin balances a wider forehead.",
            "Chin-length cuts and side bangs suit a heart shape.",
        ],
    }
}
