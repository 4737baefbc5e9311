//! faceshape-core — Geometric face-shape classifier.
//!
//! Maps 32 positional facial landmarks to named points, derives widths,
//! ratios, face thirds and jaw angles, then applies an ordered table of
//! calibrated rules to pick one of five face shapes. Pure and synchronous;
//! every call is independent.

pub mod analysis;
pub mod calibration;
pub mod classifier;
pub mod descriptors;
pub mod landmarks;
pub mod metrics;
pub mod types;

pub use analysis::{analyze, analyze_landmarks, analyze_with};
pub use classifier::{Classification, PriorityRules, Rule, ShapeClassifier};
pub use landmarks::{InsufficientLandmarks, LandmarkName, NamedLandmarks, Point};
pub use metrics::Metrics;
pub use types::{Details, FaceAnalysis, FaceShape, Ratios};
