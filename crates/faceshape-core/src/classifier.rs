//! Face-shape classification via ordered priority rules.
//!
//! Each rule is a `(predicate, shape, confidence)` row; the first row whose
//! predicate holds decides the result. The thresholds were fitted against
//! a labelled reference set and must be re-validated with the calibration
//! harness whenever they change.

use crate::metrics::Metrics;
use crate::types::FaceShape;

/// Confidence reported when the face could not be measured.
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

/// One row of the priority table.
#[derive(Clone, Copy)]
pub struct Rule {
    /// 1-based position in the priority order.
    pub id: u8,
    /// Human-readable form of `predicate`.
    pub condition: &'static str,
    pub predicate: fn(&Metrics) -> bool,
    pub shape: FaceShape,
    pub confidence: f64,
}

impl Rule {
    pub fn matches(&self, metrics: &Metrics) -> bool {
        (self.predicate)(metrics)
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("condition", &self.condition)
            .field("shape", &self.shape)
            .field("confidence", &self.confidence)
            .finish()
    }
}

/// Mouth narrower than a third of the face, and actually measured.
fn narrow_mouth(m: &Metrics) -> bool {
    m.mouth_to_face > 0.0 && m.mouth_to_face < 0.32
}

/// Calibrated rules 1–9, in priority order.
pub const CALIBRATED_RULES: [Rule; 9] = [
    Rule {
        id: 1,
        condition: "jawToFace >= 0.82 && avgJawAngle >= 30",
        predicate: |m| m.jaw_to_face >= 0.82 && m.avg_jaw_angle >= 30.0,
        shape: FaceShape::Square,
        confidence: 0.70,
    },
    Rule {
        id: 2,
        condition: "jawToFace >= 0.82 && avgJawAngle < 30",
        predicate: |m| m.jaw_to_face >= 0.82 && m.avg_jaw_angle < 30.0,
        shape: FaceShape::Oblong,
        confidence: 0.70,
    },
    Rule {
        id: 3,
        condition: "jawToFace >= 0.81 && foreheadToJaw < 0.90 && avgJawAngle <= 31",
        predicate: |m| {
            m.jaw_to_face >= 0.81 && m.forehead_to_jaw < 0.90 && m.avg_jaw_angle <= 31.0
        },
        shape: FaceShape::Square,
        confidence: 0.65,
    },
    Rule {
        id: 4,
        condition: "avgJawAngle < 24 && jawToFace >= 0.77",
        predicate: |m| m.avg_jaw_angle < 24.0 && m.jaw_to_face >= 0.77,
        shape: FaceShape::Oblong,
        confidence: 0.65,
    },
    Rule {
        id: 5,
        condition: "jawToFace >= 0.79 && avgJawAngle < 30 && foreheadToJaw < 0.92",
        predicate: |m| {
            m.jaw_to_face >= 0.79 && m.avg_jaw_angle < 30.0 && m.forehead_to_jaw < 0.92
        },
        shape: FaceShape::Oblong,
        confidence: 0.60,
    },
    Rule {
        id: 6,
        condition: "foreheadToJaw > 1.05",
        predicate: |m| m.forehead_to_jaw > 1.05,
        shape: FaceShape::Round,
        confidence: 0.65,
    },
    Rule {
        id: 7,
        condition: "foreheadToJaw > 1.02 && jawToFace < 0.76 && 0 < mouthToFace < 0.32",
        predicate: |m| m.forehead_to_jaw > 1.02 && m.jaw_to_face < 0.76 && narrow_mouth(m),
        shape: FaceShape::Heart,
        confidence: 0.65,
    },
    Rule {
        id: 8,
        condition: "foreheadToJaw < 0.93 && 0 < mouthToFace < 0.32",
        predicate: |m| m.forehead_to_jaw < 0.93 && narrow_mouth(m),
        shape: FaceShape::Heart,
        confidence: 0.60,
    },
    Rule {
        id: 9,
        condition: "foreheadToJaw >= 0.98 && 0.76 <= jawToFace <= 0.78 && 30 <= avgJawAngle < 35.5",
        predicate: |m| {
            m.forehead_to_jaw >= 0.98
                && (0.76..=0.78).contains(&m.jaw_to_face)
                && (30.0..35.5).contains(&m.avg_jaw_angle)
        },
        shape: FaceShape::Round,
        confidence: 0.60,
    },
];

/// Rule 10: applies when nothing above matched.
pub const DEFAULT_RULE: Rule = Rule {
    id: 10,
    condition: "otherwise",
    predicate: |_| true,
    shape: FaceShape::Oval,
    confidence: 0.65,
};

/// Outcome of classifying one set of metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub shape: FaceShape,
    pub confidence: f64,
    /// Id of the rule that decided the shape.
    pub rule: u8,
}

impl From<&Rule> for Classification {
    fn from(rule: &Rule) -> Self {
        Self {
            shape: rule.shape,
            confidence: rule.confidence,
            rule: rule.id,
        }
    }
}

/// Strategy for turning face metrics into a face shape.
pub trait ShapeClassifier {
    fn classify(&self, metrics: &Metrics) -> Classification;
}

/// First-match-wins evaluation over an ordered rule table.
#[derive(Debug, Clone, Copy)]
pub struct PriorityRules {
    rules: &'static [Rule],
    default: Rule,
}

impl PriorityRules {
    /// The calibrated rule set.
    pub const fn calibrated() -> Self {
        Self {
            rules: &CALIBRATED_RULES,
            default: DEFAULT_RULE,
        }
    }

    /// A custom ordered table with its catch-all.
    pub const fn new(rules: &'static [Rule], default: Rule) -> Self {
        Self { rules, default }
    }

    /// Every rule in evaluation order, catch-all last.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().chain(std::iter::once(&self.default))
    }

    /// The rule that decides `metrics`.
    ///
    /// Metrics with a non-finite ratio never match a table rule; an
    /// infinite ratio would otherwise clear every lower bound.
    pub fn matching_rule(&self, metrics: &Metrics) -> &Rule {
        if !metrics.is_finite() {
            return &self.default;
        }
        self.rules
            .iter()
            .find(|rule| rule.matches(metrics))
            .unwrap_or(&self.default)
    }
}

impl Default for PriorityRules {
    fn default() -> Self {
        Self::calibrated()
    }
}

impl ShapeClassifier for PriorityRules {
    fn classify(&self, metrics: &Metrics) -> Classification {
        let rule = self.matching_rule(metrics);
        tracing::debug!(
            rule = rule.id,
            shape = %rule.shape,
            jaw_to_face = metrics.jaw_to_face,
            forehead_to_jaw = metrics.forehead_to_jaw,
            avg_jaw_angle = metrics.avg_jaw_angle,
            "face shape rule matched"
        );
        Classification::from(rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(
        jaw_to_face: f64,
        forehead_to_jaw: f64,
        avg_jaw_angle: f64,
        mouth_to_face: f64,
    ) -> Metrics {
        Metrics {
            jaw_to_face,
            forehead_to_jaw,
            avg_jaw_angle,
            mouth_to_face,
            ..Metrics::default()
        }
    }

    fn classify(m: &Metrics) -> Classification {
        PriorityRules::calibrated().classify(m)
    }

    #[test]
    fn test_rule_ids_are_sequential() {
        let ids: Vec<u8> = PriorityRules::calibrated().rules().map(|r| r.id).collect();
        assert_eq!(ids, (1..=10).collect::<Vec<u8>>());
    }

    #[test]
    fn test_each_rule_reachable() {
        let cases = [
            (metrics(0.85, 1.0, 35.0, 0.2), 1, FaceShape::Square, 0.70),
            (metrics(0.85, 1.0, 20.0, 0.2), 2, FaceShape::Oblong, 0.70),
            (metrics(0.815, 0.85, 31.0, 0.2), 3, FaceShape::Square, 0.65),
            (metrics(0.78, 1.0, 21.0, 0.2), 4, FaceShape::Oblong, 0.65),
            (metrics(0.80, 0.91, 27.0, 0.2), 5, FaceShape::Oblong, 0.60),
            (metrics(0.70, 1.07, 30.0, 0.2), 6, FaceShape::Round, 0.65),
            (metrics(0.70, 1.04, 30.0, 0.2), 7, FaceShape::Heart, 0.65),
            (metrics(0.70, 0.70, 30.0, 0.2), 8, FaceShape::Heart, 0.60),
            (metrics(0.77, 1.00, 33.0, 0.2), 9, FaceShape::Round, 0.60),
            (metrics(0.75, 1.00, 33.0, 0.2), 10, FaceShape::Oval, 0.65),
        ];
        for (m, rule, shape, confidence) in cases {
            let c = classify(&m);
            assert_eq!(c.rule, rule, "metrics {m:?}");
            assert_eq!(c.shape, shape, "rule {rule}");
            assert_eq!(c.confidence, confidence, "rule {rule}");
        }
    }

    #[test]
    fn test_first_match_wins_over_later_rules() {
        // Satisfies rule 1 and rule 6 at the same time.
        let m = metrics(0.9, 1.2, 40.0, 0.2);
        assert!(CALIBRATED_RULES[0].matches(&m));
        assert!(CALIBRATED_RULES[5].matches(&m));
        let c = classify(&m);
        assert_eq!(c.shape, FaceShape::Square);
        assert_eq!(c.rule, 1);
    }

    #[test]
    fn test_jaw_threshold_boundaries() {
        assert_eq!(classify(&metrics(0.82, 1.0, 30.0, 0.2)).rule, 1);
        assert_eq!(classify(&metrics(0.82, 1.0, 29.999, 0.2)).rule, 2);
        // Just below 0.82 with a forehead that blocks rule 3 falls through to rule 4.
        assert_eq!(classify(&metrics(0.8199, 1.0, 20.0, 0.2)).rule, 4);
    }

    #[test]
    fn test_heart_rules_require_measured_mouth() {
        assert_eq!(classify(&metrics(0.70, 0.70, 30.0, 0.2)).shape, FaceShape::Heart);
        let unmeasured = classify(&metrics(0.70, 0.70, 30.0, 0.0));
        assert_eq!(unmeasured.shape, FaceShape::Oval);
        assert_eq!(unmeasured.rule, 10);
        let wide_mouth = classify(&metrics(0.70, 0.70, 30.0, 0.32));
        assert_eq!(wide_mouth.rule, 10);
    }

    #[test]
    fn test_rule_nine_range_is_half_open_on_angle() {
        assert_eq!(classify(&metrics(0.76, 0.98, 30.0, 0.0)).rule, 9);
        assert_eq!(classify(&metrics(0.78, 0.98, 35.49, 0.0)).rule, 9);
        assert_eq!(classify(&metrics(0.78, 0.98, 35.5, 0.0)).rule, 10);
    }

    #[test]
    fn test_nan_metrics_fall_through_to_default() {
        let c = classify(&metrics(f64::NAN, f64::NAN, f64::NAN, f64::NAN));
        assert_eq!(c.rule, 10);
        assert_eq!(c.shape, FaceShape::Oval);
    }

    #[test]
    fn test_infinite_ratio_does_not_clear_lower_bounds() {
        let m = metrics(f64::INFINITY, 0.5, 20.0, 0.2);
        assert!(CALIBRATED_RULES[1].matches(&m));
        let c = classify(&m);
        assert_eq!(c.rule, 10);
        assert_eq!(c.shape, FaceShape::Oval);

        let m = Metrics {
            width_to_height: f64::INFINITY,
            ..metrics(0.85, 1.0, 35.0, 0.2)
        };
        assert_eq!(classify(&m).rule, 10);
    }

    #[test]
    fn test_confidences_within_unit_interval() {
        for rule in PriorityRules::calibrated().rules() {
            assert!((0.0..=1.0).contains(&rule.confidence), "rule {}", rule.id);
        }
    }

    #[test]
    fn test_custom_table() {
        const ONLY_SQUARE: [Rule; 1] = [Rule {
            id: 1,
            condition: "jawToFace > 0.5",
            predicate: |m| m.jaw_to_face > 0.5,
            shape: FaceShape::Square,
            confidence: 0.9,
        }];
        let rules = PriorityRules::new(&ONLY_SQUARE, DEFAULT_RULE);
        assert_eq!(rules.classify(&metrics(0.6, 1.0, 30.0, 0.0)).shape, FaceShape::Square);
        assert_eq!(rules.classify(&metrics(0.4, 1.0, 30.0, 0.0)).shape, FaceShape::Oval);
    }
}
