//! Landmark mapping: positional landmark sequence to named anatomical points.
//!
//! The upstream face detector reports landmarks as an ordered list where
//! position `i` always carries the same anatomical meaning. [`NamedLandmarks`]
//! turns that list into a name-addressable map with explicit absence.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of landmarks in the upstream ordering.
pub const LANDMARK_COUNT: usize = 32;

/// A 2D landmark in image-pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

macro_rules! landmark_names {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Anatomical landmark, declared in upstream index order.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum LandmarkName {
            $($variant),+
        }

        impl LandmarkName {
            /// Every landmark, indexed by its upstream position.
            pub const ALL: [LandmarkName; LANDMARK_COUNT] = [$(LandmarkName::$variant),+];

            /// Upstream identifier, e.g. `FOREHEAD_GLABELLA`.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(LandmarkName::$variant => $name),+
                }
            }
        }
    };
}

landmark_names! {
    LeftEye => "LEFT_EYE",
    RightEye => "RIGHT_EYE",
    LeftOfLeftEyebrow => "LEFT_OF_LEFT_EYEBROW",
    RightOfLeftEyebrow => "RIGHT_OF_LEFT_EYEBROW",
    LeftOfRightEyebrow => "LEFT_OF_RIGHT_EYEBROW",
    RightOfRightEyebrow => "RIGHT_OF_RIGHT_EYEBROW",
    MidpointBetweenEyes => "MIDPOINT_BETWEEN_EYES",
    NoseTip => "NOSE_TIP",
    UpperLip => "UPPER_LIP",
    LowerLip => "LOWER_LIP",
    MouthLeft => "MOUTH_LEFT",
    MouthRight => "MOUTH_RIGHT",
    MouthCenter => "MOUTH_CENTER",
    NoseBottomRight => "NOSE_BOTTOM_RIGHT",
    NoseBottomLeft => "NOSE_BOTTOM_LEFT",
    NoseBottomCenter => "NOSE_BOTTOM_CENTER",
    LeftEyeTopBoundary => "LEFT_EYE_TOP_BOUNDARY",
    LeftEyeRightCorner => "LEFT_EYE_RIGHT_CORNER",
    LeftEyeBottomBoundary => "LEFT_EYE_BOTTOM_BOUNDARY",
    LeftEyeLeftCorner => "LEFT_EYE_LEFT_CORNER",
    RightEyeTopBoundary => "RIGHT_EYE_TOP_BOUNDARY",
    RightEyeRightCorner => "RIGHT_EYE_RIGHT_CORNER",
    RightEyeBottomBoundary => "RIGHT_EYE_BOTTOM_BOUNDARY",
    RightEyeLeftCorner => "RIGHT_EYE_LEFT_CORNER",
    LeftEyebrowUpperMidpoint => "LEFT_EYEBROW_UPPER_MIDPOINT",
    RightEyebrowUpperMidpoint => "RIGHT_EYEBROW_UPPER_MIDPOINT",
    LeftEarTragion => "LEFT_EAR_TRAGION",
    RightEarTragion => "RIGHT_EAR_TRAGION",
    ForeheadGlabella => "FOREHEAD_GLABELLA",
    ChinGnathion => "CHIN_GNATHION",
    ChinLeftGonion => "CHIN_LEFT_GONION",
    ChinRightGonion => "CHIN_RIGHT_GONION",
}

impl LandmarkName {
    /// The six landmarks without which no face geometry can be measured.
    pub const REQUIRED: [LandmarkName; 6] = [
        LandmarkName::ForeheadGlabella,
        LandmarkName::ChinGnathion,
        LandmarkName::LeftEarTragion,
        LandmarkName::RightEarTragion,
        LandmarkName::ChinLeftGonion,
        LandmarkName::ChinRightGonion,
    ];

    /// Position of this landmark in the upstream sequence.
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for LandmarkName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown landmark name: {0}")]
pub struct UnknownLandmark(pub String);

impl FromStr for LandmarkName {
    type Err = UnknownLandmark;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LandmarkName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownLandmark(s.to_string()))
    }
}

/// One or more required landmarks were absent.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("insufficient landmarks: missing {}", format_missing(.missing))]
pub struct InsufficientLandmarks {
    pub missing: Vec<LandmarkName>,
}

fn format_missing(missing: &[LandmarkName]) -> String {
    missing
        .iter()
        .map(|name| name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// The six required points, guaranteed present.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequiredLandmarks {
    pub forehead: Point,
    pub chin: Point,
    pub left_ear: Point,
    pub right_ear: Point,
    pub left_jaw: Point,
    pub right_jaw: Point,
}

/// Name-addressable landmark map. Absent names are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedLandmarks {
    points: [Option<Point>; LANDMARK_COUNT],
}

impl NamedLandmarks {
    /// Map an upstream landmark sequence by position.
    ///
    /// Points beyond index 31 are ignored; a short sequence leaves the
    /// trailing names unset. Coordinates are not validated.
    pub fn from_points(points: &[Point]) -> Self {
        let mut named = Self::default();
        for (slot, point) in named.points.iter_mut().zip(points) {
            *slot = Some(*point);
        }
        named
    }

    pub fn get(&self, name: LandmarkName) -> Option<Point> {
        self.points[name.index()]
    }

    pub fn insert(&mut self, name: LandmarkName, point: Point) -> Option<Point> {
        self.points[name.index()].replace(point)
    }

    pub fn remove(&mut self, name: LandmarkName) -> Option<Point> {
        self.points[name.index()].take()
    }

    /// Number of landmarks present.
    pub fn len(&self) -> usize {
        self.points.iter().filter(|p| p.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Present landmarks in upstream order.
    pub fn iter(&self) -> impl Iterator<Item = (LandmarkName, Point)> + '_ {
        LandmarkName::ALL
            .iter()
            .zip(self.points.iter())
            .filter_map(|(name, point)| point.map(|p| (*name, p)))
    }

    /// Collect the required landmarks, reporting every one that is missing.
    pub fn required(&self) -> Result<RequiredLandmarks, InsufficientLandmarks> {
        let missing: Vec<LandmarkName> = LandmarkName::REQUIRED
            .iter()
            .copied()
            .filter(|name| self.get(*name).is_none())
            .collect();

        match (
            self.get(LandmarkName::ForeheadGlabella),
            self.get(LandmarkName::ChinGnathion),
            self.get(LandmarkName::LeftEarTragion),
            self.get(LandmarkName::RightEarTragion),
            self.get(LandmarkName::ChinLeftGonion),
            self.get(LandmarkName::ChinRightGonion),
        ) {
            (
                Some(forehead),
                Some(chin),
                Some(left_ear),
                Some(right_ear),
                Some(left_jaw),
                Some(right_jaw),
            ) => Ok(RequiredLandmarks {
                forehead,
                chin,
                left_ear,
                right_ear,
                left_jaw,
                right_jaw,
            }),
            _ => Err(InsufficientLandmarks { missing }),
        }
    }
}
