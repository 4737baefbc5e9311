//! Calibration bookkeeping: reference labels, accuracy reports, baselines.
//!
//! The default label table is embedded at compile time from
//! `contrib/calibration/labels.toml`. Driving photos through a landmark
//! source is left to the caller; this module only scores the outcome.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

use crate::types::{FaceShape, Ratios};

const DEFAULT_LABELS: &str = include_str!("../../../contrib/calibration/labels.toml");

static DEFAULT_TABLE: OnceLock<LabelTable> = OnceLock::new();

#[derive(Debug, Error)]
pub enum LabelError {
    #[error("invalid label table: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("label table is empty")]
    Empty,
    #[error("alias {alias} points at unknown subject {target}")]
    UnknownAlias { alias: String, target: String },
}

#[derive(Debug, Deserialize)]
struct LabelFile {
    labels: BTreeMap<String, FaceShape>,
    /// Alternative file stem → subject key in `labels`.
    #[serde(default)]
    aliases: BTreeMap<String, String>,
}

/// Subject name → expected face shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelTable {
    labels: BTreeMap<String, FaceShape>,
    aliases: BTreeMap<String, String>,
}

impl LabelTable {
    /// Parse a `[labels]` TOML table.
    pub fn from_toml_str(src: &str) -> Result<Self, LabelError> {
        let file: LabelFile = toml::from_str(src)?;
        if file.labels.is_empty() {
            return Err(LabelError::Empty);
        }
        let labels: BTreeMap<String, FaceShape> = file
            .labels
            .into_iter()
            .map(|(name, shape)| (normalize_name(&name), shape))
            .collect();

        let mut aliases = BTreeMap::new();
        for (alias, target) in file.aliases {
            let key = normalize_name(&target);
            if !labels.contains_key(&key) {
                return Err(LabelError::UnknownAlias { alias, target });
            }
            aliases.insert(normalize_name(&alias), key);
        }
        Ok(Self { labels, aliases })
    }

    /// The embedded reference table.
    pub fn reference() -> &'static LabelTable {
        DEFAULT_TABLE.get_or_init(|| match Self::from_toml_str(DEFAULT_LABELS) {
            Ok(table) => table,
            Err(e) => {
                tracing::error!(error = %e, "embedded calibration labels are invalid");
                LabelTable::default()
            }
        })
    }

    /// Look up a subject by name, alias or file stem.
    pub fn get(&self, name: &str) -> Option<FaceShape> {
        let key = normalize_name(name);
        let key = self.aliases.get(&key).unwrap_or(&key);
        self.labels.get(key).copied()
    }

    /// Number of subjects; aliases are not counted.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, FaceShape)> {
        self.labels.iter().map(|(name, shape)| (name.as_str(), *shape))
    }

    /// Number of subjects expected to have `shape`.
    pub fn count(&self, shape: FaceShape) -> usize {
        self.labels.values().filter(|s| **s == shape).count()
    }
}

/// `"Park Bo_Gum "` → `"park-bo-gum"`. Composes to NFC so decomposed
/// Hangul file names (as macOS stores them) match precomposed keys.
fn normalize_name(name: &str) -> String {
    name.trim()
        .nfc()
        .map(|c| if c == ' ' || c == '_' { '-' } else { c })
        .collect::<String>()
        .to_lowercase()
}

/// One labelled subject run through the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub name: String,
    pub expected: FaceShape,
    pub predicted: FaceShape,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_rule: Option<u8>,
    pub is_correct: bool,
    #[serde(flatten)]
    pub ratios: Ratios,
}

impl Sample {
    pub fn new(
        name: impl Into<String>,
        expected: FaceShape,
        predicted: FaceShape,
        matched_rule: Option<u8>,
        ratios: Ratios,
    ) -> Self {
        Self {
            name: name.into(),
            expected,
            predicted,
            matched_rule,
            is_correct: expected == predicted,
            ratios,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShapeStats {
    pub correct: usize,
    pub total: usize,
}

impl ShapeStats {
    pub fn accuracy(&self) -> f64 {
        fraction(self.correct, self.total)
    }
}

/// Mean ratios over the subjects expected to have one shape.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ShapeAverages {
    pub count: usize,
    pub width_to_height: f64,
    pub jaw_to_face: f64,
    pub forehead_to_jaw: f64,
    pub avg_jaw_angle: f64,
}

/// Accuracy summary of one calibration run.
#[derive(Debug, Clone, Default)]
pub struct CalibrationReport {
    samples: Vec<Sample>,
    per_shape: BTreeMap<FaceShape, ShapeStats>,
    correct: usize,
}

impl CalibrationReport {
    pub fn from_samples(samples: Vec<Sample>) -> Self {
        let mut per_shape: BTreeMap<FaceShape, ShapeStats> = BTreeMap::new();
        let mut correct = 0;
        for sample in &samples {
            let stats = per_shape.entry(sample.expected).or_default();
            stats.total += 1;
            if sample.is_correct {
                stats.correct += 1;
                correct += 1;
            }
        }
        Self {
            samples,
            per_shape,
            correct,
        }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn correct(&self) -> usize {
        self.correct
    }

    pub fn total(&self) -> usize {
        self.samples.len()
    }

    /// Overall accuracy in [0, 1]; 0 for an empty run.
    pub fn accuracy(&self) -> f64 {
        fraction(self.correct, self.total())
    }

    /// Per expected shape, only shapes that had at least one subject.
    pub fn per_shape(&self) -> &BTreeMap<FaceShape, ShapeStats> {
        &self.per_shape
    }

    pub fn misclassified(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter().filter(|s| !s.is_correct)
    }

    /// Mean ratios grouped by expected shape.
    pub fn averages_by_expected(&self) -> BTreeMap<FaceShape, ShapeAverages> {
        let mut sums: BTreeMap<FaceShape, ShapeAverages> = BTreeMap::new();
        for sample in &self.samples {
            let avg = sums.entry(sample.expected).or_default();
            avg.count += 1;
            avg.width_to_height += sample.ratios.width_to_height_ratio;
            avg.jaw_to_face += sample.ratios.jaw_to_face_ratio;
            avg.forehead_to_jaw += sample.ratios.forehead_to_jaw_ratio;
            avg.avg_jaw_angle += sample.ratios.avg_jaw_angle;
        }
        for avg in sums.values_mut() {
            let n = avg.count as f64;
            avg.width_to_height /= n;
            avg.jaw_to_face /= n;
            avg.forehead_to_jaw /= n;
            avg.avg_jaw_angle /= n;
        }
        sums
    }

    pub fn to_baseline(&self, recorded_at: DateTime<Utc>) -> Baseline {
        Baseline {
            recorded_at,
            correct: self.correct,
            total: self.total(),
            accuracy: self.accuracy(),
        }
    }

    /// Fail when this run is less accurate than `baseline`.
    pub fn check_regression(&self, baseline: &Baseline) -> Result<(), Regression> {
        const EPSILON: f64 = 1e-9;
        if self.accuracy() + EPSILON < baseline.accuracy {
            return Err(Regression {
                correct: self.correct,
                total: self.total(),
                accuracy: self.accuracy(),
                baseline_correct: baseline.correct,
                baseline_total: baseline.total,
                baseline_accuracy: baseline.accuracy,
                recorded_at: baseline.recorded_at,
            });
        }
        Ok(())
    }
}

/// Persisted summary of the last accepted calibration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Baseline {
    pub recorded_at: DateTime<Utc>,
    pub correct: usize,
    pub total: usize,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Error, PartialEq)]
#[error(
    "calibration accuracy regressed: {correct}/{total} ({accuracy:.3}) < {baseline_correct}/{baseline_total} ({baseline_accuracy:.3}) recorded {recorded_at}"
)]
pub struct Regression {
    pub correct: usize,
    pub total: usize,
    pub accuracy: f64,
    pub baseline_correct: usize,
    pub baseline_total: usize,
    pub baseline_accuracy: f64,
    pub recorded_at: DateTime<Utc>,
}

fn fraction(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn ratios(width_to_height: f64, jaw_to_face: f64, forehead_to_jaw: f64, angle: f64) -> Ratios {
        Ratios {
            width_to_height_ratio: width_to_height,
            jaw_to_face_ratio: jaw_to_face,
            forehead_to_face_ratio: 0.7,
            forehead_to_jaw_ratio: forehead_to_jaw,
            cheek_to_jaw_ratio: 1.2,
            avg_jaw_angle: angle,
            mouth_to_face_ratio: 0.25,
            chin_to_face_ratio: 0.2,
            eye_to_face_ratio: 0.3,
            face_taper: 0.1,
            face_thirds: "30:33:37".into(),
        }
    }

    fn sample(name: &str, expected: FaceShape, predicted: FaceShape) -> Sample {
        Sample::new(name, expected, predicted, Some(10), ratios(0.8, 0.78, 0.95, 30.0))
    }

    #[test]
    fn test_reference_table() {
        let table = LabelTable::reference();
        assert_eq!(table.len(), 30);
        assert_eq!(table.count(FaceShape::Oval), 11);
        assert_eq!(table.count(FaceShape::Oblong), 6);
        assert_eq!(table.count(FaceShape::Round), 5);
        assert_eq!(table.count(FaceShape::Heart), 5);
        assert_eq!(table.count(FaceShape::Square), 3);
        assert_eq!(table.get("아이유"), Some(FaceShape::Heart));
        assert_eq!(table.get("수지"), Some(FaceShape::Oval));
        assert_eq!(table.get("IU"), Some(FaceShape::Heart));
        assert_eq!(table.get("Park Bo_Gum"), Some(FaceShape::Oval));
        assert_eq!(table.get("nobody"), None);
        assert_eq!(table.iter().count(), 30);
    }

    #[test]
    fn test_decomposed_hangul_stem() {
        let nfd: String = "아이유".nfd().collect();
        assert_ne!(nfd, "아이유");
        assert_eq!(LabelTable::reference().get(&nfd), Some(FaceShape::Heart));

        let table = LabelTable::from_toml_str("[labels]\n\"아이유\" = \"heart\"\n").unwrap();
        assert_eq!(table.get(&nfd), Some(FaceShape::Heart));
        let decomposed = "\u{110B}\u{1161}\u{110B}\u{1175}\u{110B}\u{1172}";
        assert_eq!(table.get(decomposed), Some(FaceShape::Heart));

        let nfd_key = format!("[labels]\n\"{nfd}\" = \"round\"\n");
        let table = LabelTable::from_toml_str(&nfd_key).unwrap();
        assert_eq!(table.get("아이유"), Some(FaceShape::Round));
    }

    #[test]
    fn test_aliases() {
        let src = "[labels]\n\"공유\" = \"oblong\"\n[aliases]\ngong-yoo = \"공유\"\n";
        let table = LabelTable::from_toml_str(src).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("Gong Yoo"), Some(FaceShape::Oblong));
        assert_eq!(table.get("공유"), Some(FaceShape::Oblong));

        let dangling = "[labels]\na = \"oval\"\n[aliases]\nb = \"c\"\n";
        assert_matches!(
            LabelTable::from_toml_str(dangling),
            Err(LabelError::UnknownAlias { .. })
        );
    }

    #[test]
    fn test_custom_table() {
        let table = LabelTable::from_toml_str("[labels]\nAlice = \"square\"\n").unwrap();
        assert_eq!(table.get("alice"), Some(FaceShape::Square));
        assert_matches!(LabelTable::from_toml_str("[labels]\n"), Err(LabelError::Empty));
        assert_matches!(
            LabelTable::from_toml_str("[labels]\nbob = \"diamond\"\n"),
            Err(LabelError::Parse(_))
        );
    }

    #[test]
    fn test_report_accuracy() {
        let report = CalibrationReport::from_samples(vec![
            sample("a", FaceShape::Oval, FaceShape::Oval),
            sample("b", FaceShape::Oval, FaceShape::Round),
            sample("c", FaceShape::Square, FaceShape::Square),
            sample("d", FaceShape::Heart, FaceShape::Oval),
        ]);
        assert_eq!(report.correct(), 2);
        assert_eq!(report.total(), 4);
        assert_eq!(report.accuracy(), 0.5);
        assert_eq!(
            report.per_shape()[&FaceShape::Oval],
            ShapeStats { correct: 1, total: 2 }
        );
        assert_eq!(report.per_shape()[&FaceShape::Heart].accuracy(), 0.0);
        assert!(!report.per_shape().contains_key(&FaceShape::Round));
        let wrong: Vec<_> = report.misclassified().map(|s| s.name.as_str()).collect();
        assert_eq!(wrong, vec!["b", "d"]);
    }

    #[test]
    fn test_empty_report() {
        let report = CalibrationReport::from_samples(Vec::new());
        assert_eq!(report.accuracy(), 0.0);
        assert!(report.averages_by_expected().is_empty());
    }

    #[test]
    fn test_averages_by_expected() {
        let report = CalibrationReport::from_samples(vec![
            Sample::new(
                "a",
                FaceShape::Round,
                FaceShape::Round,
                Some(6),
                ratios(0.9, 0.76, 1.0, 30.0),
            ),
            Sample::new(
                "b",
                FaceShape::Round,
                FaceShape::Oval,
                Some(10),
                ratios(0.8, 0.78, 1.1, 34.0),
            ),
        ]);
        let avg = report.averages_by_expected()[&FaceShape::Round];
        assert_eq!(avg.count, 2);
        assert!((avg.width_to_height - 0.85).abs() < 1e-9);
        assert!((avg.jaw_to_face - 0.77).abs() < 1e-9);
        assert!((avg.forehead_to_jaw - 1.05).abs() < 1e-9);
        assert!((avg.avg_jaw_angle - 32.0).abs() < 1e-9);
    }

    #[test]
    fn test_regression_check() {
        let recorded_at = Utc::now();
        let report = CalibrationReport::from_samples(vec![
            sample("a", FaceShape::Oval, FaceShape::Oval),
            sample("b", FaceShape::Oval, FaceShape::Round),
        ]);
        let baseline = report.to_baseline(recorded_at);
        assert_eq!(baseline.accuracy, 0.5);
        assert!(report.check_regression(&baseline).is_ok());

        let better = Baseline {
            correct: 3,
            total: 4,
            accuracy: 0.75,
            ..baseline.clone()
        };
        let err = report.check_regression(&better).unwrap_err();
        assert_eq!(err.baseline_correct, 3);
        assert!(err.to_string().starts_with("calibration accuracy regressed: 1/2"));
    }

    #[test]
    fn test_sample_json_is_flat() {
        let value = serde_json::to_value(sample("a", FaceShape::Oval, FaceShape::Heart)).unwrap();
        assert_eq!(value["expected"], "oval");
        assert_eq!(value["predicted"], "heart");
        assert_eq!(value["isCorrect"], false);
        assert_eq!(value["jawToFaceRatio"], 0.78);
        assert_eq!(value["faceThirds"], "30:33:37");
    }

    #[test]
    fn test_baseline_roundtrip() {
        let baseline = Baseline {
            recorded_at: "2026-03-01T12:00:00Z".parse().unwrap(),
            correct: 21,
            total: 30,
            accuracy: 0.7,
        };
        let json = serde_json::to_string(&baseline).unwrap();
        assert!(json.contains("recordedAt"));
        assert_eq!(serde_json::from_str::<Baseline>(&json).unwrap(), baseline);
    }
}
