//! Wire model of the `images:annotate` face-detection call.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use faceshape_core::Point;
use serde::{Deserialize, Serialize};

const FACE_DETECTION: &str = "FACE_DETECTION";

#[derive(Debug, Serialize)]
pub struct AnnotateRequest {
    pub requests: Vec<ImageRequest>,
}

#[derive(Debug, Serialize)]
pub struct ImageRequest {
    pub image: ImageContent,
    pub features: Vec<Feature>,
}

#[derive(Debug, Serialize)]
pub struct ImageContent {
    /// Base64-encoded image bytes.
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub max_results: u32,
}

impl AnnotateRequest {
    /// Face detection for a single image, best face only.
    pub fn single_face(image: &[u8]) -> Self {
        Self {
            requests: vec![ImageRequest {
                image: ImageContent {
                    content: STANDARD.encode(image),
                },
                features: vec![Feature {
                    kind: FACE_DETECTION,
                    max_results: 1,
                }],
            }],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnnotateResponse {
    #[serde(default)]
    pub responses: Vec<ImageResponse>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    #[serde(default)]
    pub face_annotations: Vec<FaceAnnotation>,
    /// Per-image failure reported inside a 200 response.
    #[serde(default)]
    pub error: Option<ImageStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageStatus {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceAnnotation {
    #[serde(default)]
    pub landmarks: Vec<Landmark>,
    #[serde(default)]
    pub detection_confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Landmark {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub position: Option<Position>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub z: Option<f64>,
}

impl Landmark {
    /// Image-plane point; absent coordinates read as 0.
    pub fn point(&self) -> Point {
        let position = self.position.unwrap_or_default();
        Point::new(position.x.unwrap_or(0.0), position.y.unwrap_or(0.0))
    }
}

impl AnnotateResponse {
    /// Landmarks of the first detected face, in upstream order.
    ///
    /// `Ok(None)` when no face was found; `Err` when the service reported a
    /// per-image failure.
    pub fn first_face_landmarks(&self) -> Result<Option<Vec<Point>>, ImageStatus> {
        let Some(image) = self.responses.first() else {
            return Ok(None);
        };
        if let Some(status) = &image.error {
            return Err(status.clone());
        }
        let Some(face) = image.face_annotations.first() else {
            return Ok(None);
        };
        if face.landmarks.is_empty() {
            tracing::warn!("face detected without landmarks");
        }
        tracing::debug!(
            faces = image.face_annotations.len(),
            landmarks = face.landmarks.len(),
            confidence = ?face.detection_confidence,
            "decoded face annotation"
        );
        Ok(Some(face.landmarks.iter().map(Landmark::point).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body() {
        let body = serde_json::to_value(AnnotateRequest::single_face(b"jpeg")).unwrap();
        assert_eq!(body["requests"][0]["image"]["content"], "anBlZw==");
        assert_eq!(body["requests"][0]["features"][0]["type"], "FACE_DETECTION");
        assert_eq!(body["requests"][0]["features"][0]["maxResults"], 1);
    }

    #[test]
    fn test_missing_coordinates_default_to_zero() {
        let json = r#"{
            "responses": [{
                "faceAnnotations": [{
                    "detectionConfidence": 0.98,
                    "landmarks": [
                        {"type": "LEFT_EYE", "position": {"x": 10.5, "y": 20.25, "z": 0.1}},
                        {"type": "RIGHT_EYE", "position": {"y": 21.0}},
                        {"type": "LEFT_OF_LEFT_EYEBROW"}
                    ]
                }, {
                    "landmarks": []
                }]
            }]
        }"#;
        let response: AnnotateResponse = serde_json::from_str(json).unwrap();
        let points = response.first_face_landmarks().unwrap().unwrap();
        assert_eq!(
            points,
            vec![
                Point::new(10.5, 20.25),
                Point::new(0.0, 21.0),
                Point::new(0.0, 0.0),
            ]
        );
    }

    #[test]
    fn test_no_face() {
        let response: AnnotateResponse = serde_json::from_str(r#"{"responses": [{}]}"#).unwrap();
        assert!(response.first_face_landmarks().unwrap().is_none());
        let response: AnnotateResponse = serde_json::from_str("{}").unwrap();
        assert!(response.first_face_landmarks().unwrap().is_none());
    }

    #[test]
    fn test_per_image_error() {
        let json = r#"{"responses": [{"error": {"code": 3, "message": "Bad image data."}}]}"#;
        let response: AnnotateResponse = serde_json::from_str(json).unwrap();
        let status = response.first_face_landmarks().unwrap_err();
        assert_eq!(status.code, 3);
        assert_eq!(status.message, "Bad image data.");
    }
}
