//! Face geometry derived from named landmarks.
//!
//! Euclidean distance is the only geometric primitive. Widths come from
//! paired landmarks, heights from vertical offsets, and the forehead band is
//! estimated because the upstream glabella sits between the brows rather
//! than at the hairline.

use crate::landmarks::{InsufficientLandmarks, LandmarkName, NamedLandmarks, Point};

/// Forehead width as a share of face width when eyebrow corners are absent.
const FOREHEAD_FALLBACK_SCALE: f64 = 0.8;

/// Estimated upper-third height relative to the measured middle third.
const UPPER_THIRD_SCALE: f64 = 0.85;

/// Percentage reported for every third when no vertical extent is measurable.
const EVEN_THIRD_PCT: u32 = 33;

/// Jaw angle reported when chin and gonion are vertically aligned.
const VERTICAL_JAW_ANGLE: f64 = 90.0;

/// Scalar measurements for one face. Built once per call, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Metrics {
    /// Ear tragion to ear tragion.
    pub face_width: f64,
    /// Chin to the estimated top of the forehead.
    pub face_height: f64,
    /// Gonion to gonion.
    pub jaw_width: f64,
    /// Outer eyebrow corner to outer eyebrow corner (or estimated).
    pub forehead_width: f64,
    /// No dedicated landmark exists; equal to `face_width`.
    pub cheekbone_width: f64,

    pub upper_third: f64,
    pub middle_third: f64,
    pub lower_third: f64,

    pub width_to_height: f64,
    pub jaw_to_face: f64,
    pub forehead_to_face: f64,
    pub forehead_to_jaw: f64,
    pub cheek_to_jaw: f64,
    /// Mouth width over face width, 0 when the mouth corners are absent.
    pub mouth_to_face: f64,
    /// Lower lip to chin over face height, 0 when the lower lip is absent.
    pub chin_to_face: f64,
    /// Eye centre distance over face width, 0 when either eye is absent.
    pub eye_to_face: f64,
    /// (cheekbone width - jaw width) / face height.
    pub face_taper: f64,

    pub upper_third_pct: u32,
    pub middle_third_pct: u32,
    pub lower_third_pct: u32,

    pub jaw_angle_left: f64,
    pub jaw_angle_right: f64,
    /// Mean of both jaw angles in degrees. Low = flat, wide jaw corner.
    pub avg_jaw_angle: f64,
}

impl Metrics {
    /// Measure a face. Fails only when a required landmark is missing.
    pub fn from_landmarks(lm: &NamedLandmarks) -> Result<Self, InsufficientLandmarks> {
        let req = lm.required()?;

        let face_width = req.left_ear.distance(&req.right_ear);
        let cheekbone_width = face_width;
        let jaw_width = req.left_jaw.distance(&req.right_jaw);
        let forehead_width = match (
            lm.get(LandmarkName::LeftOfLeftEyebrow),
            lm.get(LandmarkName::RightOfRightEyebrow),
        ) {
            (Some(left), Some(right)) => left.distance(&right),
            _ => face_width * FOREHEAD_FALLBACK_SCALE,
        };

        let brow_mid_y = match (
            lm.get(LandmarkName::LeftEyebrowUpperMidpoint),
            lm.get(LandmarkName::RightEyebrowUpperMidpoint),
        ) {
            (Some(left), Some(right)) => (left.y + right.y) / 2.0,
            _ => req.forehead.y,
        };

        let nose_bottom = lm.get(LandmarkName::NoseBottomCenter);
        let middle_third = nose_bottom.map_or(0.0, |nose| (nose.y - brow_mid_y).abs());
        let lower_third = nose_bottom.map_or(0.0, |nose| (req.chin.y - nose.y).abs());
        let upper_third = if middle_third > 0.0 {
            middle_third * UPPER_THIRD_SCALE
        } else {
            (brow_mid_y - req.forehead.y).abs()
        };

        let face_height = (req.chin.y - (brow_mid_y - upper_third)).abs();

        let mouth_width = pair_distance(lm, LandmarkName::MouthLeft, LandmarkName::MouthRight);
        let eye_distance = pair_distance(lm, LandmarkName::LeftEye, LandmarkName::RightEye);
        let chin_length = lm
            .get(LandmarkName::LowerLip)
            .map_or(0.0, |lip| (req.chin.y - lip.y).abs());

        let (upper_third_pct, middle_third_pct, lower_third_pct) =
            third_percentages(upper_third, middle_third, lower_third);

        let jaw_angle_left = jaw_angle(&req.chin, &req.left_jaw);
        let jaw_angle_right = jaw_angle(&req.chin, &req.right_jaw);

        let metrics = Self {
            face_width,
            face_height,
            jaw_width,
            forehead_width,
            cheekbone_width,
            upper_third,
            middle_third,
            lower_third,
            width_to_height: face_width / face_height,
            jaw_to_face: jaw_width / face_width,
            forehead_to_face: forehead_width / face_width,
            forehead_to_jaw: forehead_width / jaw_width,
            cheek_to_jaw: cheekbone_width / jaw_width,
            mouth_to_face: ratio_if_measured(mouth_width, face_width),
            chin_to_face: ratio_if_measured(chin_length, face_height),
            eye_to_face: ratio_if_measured(eye_distance, face_width),
            face_taper: (cheekbone_width - jaw_width) / face_height,
            upper_third_pct,
            middle_third_pct,
            lower_third_pct,
            jaw_angle_left,
            jaw_angle_right,
            avg_jaw_angle: (jaw_angle_left + jaw_angle_right) / 2.0,
        };

        tracing::trace!(?metrics, "face metrics computed");
        Ok(metrics)
    }

    /// `"upper:middle:lower"` percentage string.
    pub fn face_thirds(&self) -> String {
        format!(
            "{}:{}:{}",
            self.upper_third_pct, self.middle_third_pct, self.lower_third_pct
        )
    }

    /// False when degenerate geometry (coincident ears or gonions, zero
    /// face height) left an infinite or NaN ratio behind.
    pub fn is_finite(&self) -> bool {
        [
            self.width_to_height,
            self.jaw_to_face,
            self.forehead_to_face,
            self.forehead_to_jaw,
            self.cheek_to_jaw,
            self.mouth_to_face,
            self.chin_to_face,
            self.eye_to_face,
            self.face_taper,
            self.avg_jaw_angle,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

fn pair_distance(lm: &NamedLandmarks, a: LandmarkName, b: LandmarkName) -> f64 {
    match (lm.get(a), lm.get(b)) {
        (Some(a), Some(b)) => a.distance(&b),
        _ => 0.0,
    }
}

/// Zero-length measurements count as absent.
fn ratio_if_measured(length: f64, reference: f64) -> f64 {
    if length > 0.0 {
        length / reference
    } else {
        0.0
    }
}

/// Percentages are rounded independently; the sum may drift from 100.
fn third_percentages(upper: f64, middle: f64, lower: f64) -> (u32, u32, u32) {
    let total = upper + middle + lower;
    if total > 0.0 {
        let pct = |part: f64| (part / total * 100.0).round() as u32;
        (pct(upper), pct(middle), pct(lower))
    } else {
        (EVEN_THIRD_PCT, EVEN_THIRD_PCT, EVEN_THIRD_PCT)
    }
}

/// Angle of the chin-to-gonion segment above the horizontal, in degrees.
pub fn jaw_angle(chin: &Point, gonion: &Point) -> f64 {
    if chin.x != gonion.x {
        (chin.y - gonion.y).abs().atan2((chin.x - gonion.x).abs()).to_degrees()
    } else {
        VERTICAL_JAW_ANGLE
    }
}
