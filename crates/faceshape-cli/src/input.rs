use anyhow::{bail, Context, Result};
use faceshape_core::Point;
use faceshape_vision::AnnotateResponse;
use serde_json::Value;
use std::path::Path;

/// Landmarks from a JSON document: either a bare array of `{x, y}` points
/// or a saved `images:annotate` response.
pub fn parse_landmarks(raw: &str) -> Result<Vec<Point>> {
    let value: Value = serde_json::from_str(raw).context("input is not valid JSON")?;
    if value.is_array() {
        return serde_json::from_value(value).context("expected an array of {x, y} points");
    }
    if value.get("responses").is_none() {
        bail!("expected a point array or an annotate response");
    }

    let response: AnnotateResponse =
        serde_json::from_value(value).context("malformed annotate response")?;
    match response.first_face_landmarks() {
        Ok(Some(points)) => Ok(points),
        Ok(None) => bail!("no face in annotate response"),
        Err(status) => bail!("annotate response carries error {}: {}", status.code, status.message),
    }
}

pub fn read_landmarks(path: &Path) -> Result<Vec<Point>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_landmarks(&raw).with_context(|| format!("in {}", path.display()))
}
