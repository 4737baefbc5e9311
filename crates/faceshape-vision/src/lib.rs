//! faceshape-vision — Landmark source backed by a cloud face-detection API.
//!
//! Encodes an image, calls `images:annotate` with a bearer token and
//! decodes the first face's landmarks into the positional sequence
//! expected by `faceshape-core`.

pub mod annotate;
pub mod client;
pub mod credential;

pub use annotate::{AnnotateRequest, AnnotateResponse, FaceAnnotation, ImageStatus, Landmark};
pub use client::{VisionClient, VisionError, DEFAULT_ENDPOINT};
pub use credential::{
    refresh_token_from_config, Credential, CredentialError, OAuthClient, DEFAULT_TOKEN_ENDPOINT,
};
