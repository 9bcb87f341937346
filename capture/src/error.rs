//! Error taxonomy of the capture-and-retrieval pipeline.
//!
//! Every variant's `Display` is the message shown to the user at the point of
//! failure.

use stickframes_common::landmarks::LandmarkKind;
use thiserror::Error;

use crate::controller::CaptureStatus;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to access camera. Please ensure camera permissions are granted. ({0})")]
    Permission(String),

    #[error("Upload failed: {0}")]
    Upload(#[from] UploadError),

    #[error("Failed to fetch landmark data: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("Processing server is not running. Please start the server first.")]
    ServerUnavailable,

    #[error("A video is already being processed.")]
    Busy,

    #[error("Cannot {action} while {status}.")]
    InvalidState {
        action: &'static str,
        status: CaptureStatus,
    },
}

/// Failure of the ingest call (or of preparing its payload).
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{0}")]
    Transport(String),

    /// Non-success HTTP status, e.g. `503 Service Unavailable`.
    #[error("{0}")]
    Status(String),

    #[error("malformed response ({0})")]
    Malformed(String),

    #[error("file is {size} bytes, the maximum is {max} bytes")]
    TooLarge { size: u64, max: u64 },

    #[error("cannot read {path}: {reason}")]
    Read { path: String, reason: String },
}

/// Failure of one of the three landmark fetches.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("{kind} landmarks returned {status}")]
    Status { kind: LandmarkKind, status: String },

    #[error("{kind} landmarks: {reason}")]
    Transport { kind: LandmarkKind, reason: String },
}

impl RetrievalError {
    pub fn kind(&self) -> LandmarkKind {
        match self {
            Self::Status { kind, .. } | Self::Transport { kind, .. } => *kind,
        }
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
