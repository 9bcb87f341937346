//! Landmark streams and the bundle handed to the presentation layer.

use std::fmt;

/// Text shown for a stream that has not been received yet.
pub const PLACEHOLDER: &str = "No data available";

/// One of the three landmark streams the backend extracts from a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LandmarkKind {
    Body,
    LeftHand,
    RightHand,
}

impl LandmarkKind {
    pub const ALL: [LandmarkKind; 3] = [Self::Body, Self::LeftHand, Self::RightHand];

    /// Heading of the landmark box.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Body => "Body Landmarks",
            Self::LeftHand => "Left Hand Landmarks",
            Self::RightHand => "Right Hand Landmarks",
        }
    }

    /// File name used when the stream is exported ("download as file").
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Body => "body_landmarks.txt",
            Self::LeftHand => "left_hand_landmarks.txt",
            Self::RightHand => "right_hand_landmarks.txt",
        }
    }
}

impl fmt::Display for LandmarkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Body => "body",
            Self::LeftHand => "left hand",
            Self::RightHand => "right hand",
        };
        f.write_str(name)
    }
}

/// The terminal artifact of one successful upload.
///
/// The empty bundle is the initial presentation state.  A bundle built by
/// [`LandmarkBundle::complete`] always carries all three streams.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LandmarkBundle {
    pub body: Option<String>,
    pub left_hand: Option<String>,
    pub right_hand: Option<String>,
}

impl LandmarkBundle {
    pub fn complete(body: String, left_hand: String, right_hand: String) -> Self {
        LandmarkBundle {
            body: Some(body),
            left_hand: Some(left_hand),
            right_hand: Some(right_hand),
        }
    }

    pub fn get(&self, kind: LandmarkKind) -> Option<&str> {
        match kind {
            LandmarkKind::Body => self.body.as_deref(),
            LandmarkKind::LeftHand => self.left_hand.as_deref(),
            LandmarkKind::RightHand => self.right_hand.as_deref(),
        }
    }

    /// True when every stream is present.
    pub fn is_complete(&self) -> bool {
        LandmarkKind::ALL.iter().all(|k| self.get(*k).is_some())
    }

    /// Stream text, or [`PLACEHOLDER`] when it is absent or empty.
    pub fn display_text(&self, kind: LandmarkKind) -> &str {
        match self.get(kind) {
            Some(text) if !text.is_empty() => text,
            _ => PLACEHOLDER,
        }
    }
}
