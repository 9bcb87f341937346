//! Wire types for the processing backend.
//!
//! Routes consumed by the client:
//!   POST /upload              → multipart `video` field, JSON [`UploadResult`]
//!   GET  <locator>            → raw landmark text for one stream
//!   GET  /download/test.txt   → availability probe

use serde::{Deserialize, Serialize};

use crate::landmarks::LandmarkKind;

/// Multipart field the backend reads the video from.
pub const VIDEO_FIELD: &str = "video";

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid upload response: {0}")]
    Json(#[from] serde_json::Error),
    #[error("upload response has an empty `{0}` locator")]
    EmptyLocator(&'static str),
}

/// Locators returned by `POST /upload`, one per landmark stream.
///
/// Each is a path fragment relative to the API root, not the data itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    pub body_landmarks: String,
    pub left_hand_landmarks: String,
    pub right_hand_landmarks: String,
}

impl UploadResult {
    /// Parse and validate an upload response body.
    ///
    /// Missing or non-string fields fail in serde; empty ones are rejected
    /// here rather than resolved to the API root.
    pub fn parse(body: &str) -> Result<Self, ProtocolError> {
        let result: UploadResult = serde_json::from_str(body)?;
        for (field, value) in [
            ("body_landmarks", &result.body_landmarks),
            ("left_hand_landmarks", &result.left_hand_landmarks),
            ("right_hand_landmarks", &result.right_hand_landmarks),
        ] {
            if value.trim().is_empty() {
                return Err(ProtocolError::EmptyLocator(field));
            }
        }
        Ok(result)
    }

    pub fn locator(&self, kind: LandmarkKind) -> &str {
        match kind {
            LandmarkKind::Body => &self.body_landmarks,
            LandmarkKind::LeftHand => &self.left_hand_landmarks,
            LandmarkKind::RightHand => &self.right_hand_landmarks,
        }
    }
}

/// Join a locator (or route) onto the API root with exactly one `/`.
pub fn resolve_locator(api_root: &str, locator: &str) -> String {
    let root = api_root.trim_end_matches('/');
    let path = locator.trim_start_matches('/');
    format!("{root}/{path}")
}
