//! Landmarks → metrics → shape → descriptors, assembled into a [`FaceAnalysis`].

use crate::classifier::{PriorityRules, ShapeClassifier, FALLBACK_CONFIDENCE};
use crate::descriptors::Descriptors;
use crate::landmarks::{InsufficientLandmarks, NamedLandmarks, Point};
use crate::metrics::Metrics;
use crate::types::{Details, FaceAnalysis, FaceShape, Ratios};

const INSUFFICIENT_IMPRESSION: &str = "insufficient landmark data";

/// Classify an upstream landmark sequence with the calibrated rules.
pub fn analyze(points: &[Point]) -> FaceAnalysis {
    analyze_landmarks(&NamedLandmarks::from_points(points))
}

/// Classify an already-mapped landmark set with the calibrated rules.
pub fn analyze_landmarks(landmarks: &NamedLandmarks) -> FaceAnalysis {
    analyze_with(landmarks, &PriorityRules::calibrated())
}

/// Classify with a caller-supplied classifier.
///
/// Never fails: missing required landmarks yield [`fallback`].
pub fn analyze_with<C: ShapeClassifier>(
    landmarks: &NamedLandmarks,
    classifier: &C,
) -> FaceAnalysis {
    let metrics = match Metrics::from_landmarks(landmarks) {
        Ok(metrics) => metrics,
        Err(err) => {
            tracing::debug!(error = %err, present = landmarks.len(), "falling back");
            return fallback(&err);
        }
    };

    let classification = classifier.classify(&metrics);
    let descriptors = Descriptors::from_metrics(&metrics);

    FaceAnalysis {
        face_shape: classification.shape,
        confidence: round2(classification.confidence),
        ratios: Some(display_ratios(&metrics)),
        details: details(&descriptors),
        recommendations: descriptors.recommendations(classification.shape),
        matched_rule: Some(classification.rule),
        error: None,
    }
}

/// Fixed degraded result for a face that could not be measured.
pub fn fallback(err: &InsufficientLandmarks) -> FaceAnalysis {
    FaceAnalysis {
        face_shape: FaceShape::Oval,
        confidence: FALLBACK_CONFIDENCE,
        ratios: None,
        details: Details {
            overall_impression: INSUFFICIENT_IMPRESSION.to_string(),
            ..details(&Descriptors::default())
        },
        recommendations: Vec::new(),
        matched_rule: None,
        error: Some(err.to_string()),
    }
}

fn details(d: &Descriptors) -> Details {
    Details {
        forehead_width: d.forehead_width,
        cheekbone_prominence: d.cheekbone_prominence,
        jaw_width: d.jaw_width,
        jaw_shape: d.jaw_shape,
        lower_face_length: d.lower_face_length,
        overall_impression: d.overall_impression(),
    }
}

pub fn display_ratios(m: &Metrics) -> Ratios {
    Ratios {
        width_to_height_ratio: round2(m.width_to_height),
        jaw_to_face_ratio: round2(m.jaw_to_face),
        forehead_to_face_ratio: round2(m.forehead_to_face),
        forehead_to_jaw_ratio: round2(m.forehead_to_jaw),
        cheek_to_jaw_ratio: round2(m.cheek_to_jaw),
        avg_jaw_angle: finite_or_zero(m.avg_jaw_angle).round(),
        mouth_to_face_ratio: round2(m.mouth_to_face),
        chin_to_face_ratio: round2(m.chin_to_face),
        eye_to_face_ratio: round2(m.eye_to_face),
        face_taper: round2(m.face_taper),
        face_thirds: m.face_thirds(),
    }
}

/// Non-finite values from degenerate geometry are reported as 0.
fn round2(value: f64) -> f64 {
    (finite_or_zero(value) * 100.0).round() / 100.0
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::LandmarkName;

    #[test]
    fn test_round2() {
        assert_eq!(round2(0.8), 0.8);
        assert_eq!(round2(1.047_120_418), 1.05);
        assert_eq!(round2(0.625), 0.63);
        assert_eq!(round2(f64::INFINITY), 0.0);
        assert_eq!(round2(f64::NAN), 0.0);
    }

    #[test]
    fn test_fallback_shape() {
        let err = InsufficientLandmarks {
            missing: vec![LandmarkName::ChinGnathion],
        };
        let result = fallback(&err);
        assert_eq!(result.face_shape, FaceShape::Oval);
        assert_eq!(result.confidence, 0.5);
        assert!(result.ratios.is_none());
        assert!(result.recommendations.is_empty());
        assert!(result.matched_rule.is_none());
        assert!(result.is_fallback());
        assert_eq!(result.details.overall_impression, INSUFFICIENT_IMPRESSION);
        assert_eq!(
            result.error.as_deref(),
            Some("insufficient landmarks: missing CHIN_GNATHION")
        );
    }

    #[test]
    fn test_empty_input_falls_back() {
        let result = analyze(&[]);
        assert!(result.is_fallback());
        assert_eq!(result.face_shape, FaceShape::Oval);
    }

    #[test]
    fn test_fallback_serializes_null_ratios() {
        let value = serde_json::to_value(analyze(&[])).unwrap();
        assert_eq!(value["faceShape"], "oval");
        assert!(value["ratios"].is_null());
        assert_eq!(value["details"]["jawShape"], "round");
        assert!(value.get("matchedRule").is_none());
        assert!(value["error"].is_string());
    }
}
