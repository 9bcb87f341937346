//! Media capture state machine.
//!
//! The recorder's callbacks (permission grant/denial, data available, stop)
//! are explicit transition functions here, so the lifecycle can be driven
//! without a camera.  The async side lives in [`crate::recording`].
//!
//! ```text
//! Idle ──grant──▶ Recording ──stopped──▶ Recorded ──upload──▶ Uploading ──▶ Idle
//!   ▲                                       │
//!   └────────────── retake / teardown ──────┘
//! ```

use std::fmt;
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::camera::MediaStream;
use crate::error::{PipelineError, Result};
use crate::media::VideoBlob;
use crate::object_url::{ObjectUrl, ObjectUrls};
use crate::session::{SessionTicket, SessionTracker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStatus {
    Idle,
    Recording,
    Recorded,
    Uploading,
}

impl fmt::Display for CaptureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Recorded => "recorded",
            Self::Uploading => "uploading",
        };
        f.write_str(s)
    }
}

pub struct CaptureController {
    status: CaptureStatus,
    /// Waiting on the camera permission prompt.
    permission_pending: bool,
    /// Stop requested, waiting for the recorder's stop event.
    stopping: bool,
    session: Option<SessionTicket>,
    tracks: Option<Box<dyn MediaStream>>,
    chunks: Vec<Vec<u8>>,
    blob: Option<Rc<VideoBlob>>,
    preview: Option<ObjectUrl>,
    urls: ObjectUrls,
    sessions: SessionTracker,
    mime: String,
    error: Option<String>,
}

impl CaptureController {
    pub fn new(urls: ObjectUrls, sessions: SessionTracker, mime: impl Into<String>) -> Self {
        CaptureController {
            status: CaptureStatus::Idle,
            permission_pending: false,
            stopping: false,
            session: None,
            tracks: None,
            chunks: Vec::new(),
            blob: None,
            preview: None,
            urls,
            sessions,
            mime: mime.into(),
            error: None,
        }
    }

    pub fn status(&self) -> CaptureStatus {
        self.status
    }

    pub fn session(&self) -> Option<SessionTicket> {
        self.session
    }

    /// Preview reference of the finished recording, while `Recorded` or
    /// `Uploading`.
    pub fn preview(&self) -> Option<&ObjectUrl> {
        self.preview.as_ref()
    }

    pub fn blob(&self) -> Option<&VideoBlob> {
        self.blob.as_deref()
    }

    pub fn has_live_tracks(&self) -> bool {
        self.tracks.is_some()
    }

    pub fn is_permission_pending(&self) -> bool {
        self.permission_pending
    }

    pub fn last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    fn invalid(&self, action: &'static str) -> PipelineError {
        debug!("Rejected {action} while {}", self.status);
        PipelineError::InvalidState {
            action,
            status: self.status,
        }
    }

    // ── start ────────────────────────────────────────────────────────

    /// About to show the camera permission prompt.
    pub fn begin_start(&mut self) -> Result<()> {
        if self.status != CaptureStatus::Idle || self.permission_pending {
            return Err(self.invalid("start recording"));
        }
        self.permission_pending = true;
        self.error = None;
        Ok(())
    }

    /// The prompt was granted: bind the stream and start buffering chunks.
    ///
    /// A grant that arrives after teardown is released immediately.
    pub fn on_permission_granted(
        &mut self,
        mut tracks: Box<dyn MediaStream>,
    ) -> Result<SessionTicket> {
        if !self.permission_pending || self.status != CaptureStatus::Idle {
            tracks.stop_tracks();
            return Err(self.invalid("bind camera stream"));
        }

        let ticket = self.sessions.begin();
        self.permission_pending = false;
        self.stopping = false;
        self.chunks.clear();
        self.tracks = Some(tracks);
        self.session = Some(ticket);
        self.status = CaptureStatus::Recording;
        info!("Recording started ({ticket:?})");
        Ok(ticket)
    }

    /// The prompt was denied or no camera exists.  Stays `Idle`.
    pub fn on_permission_denied(&mut self, err: PipelineError) -> PipelineError {
        self.permission_pending = false;
        warn!("Camera unavailable: {err}");
        self.error = Some(err.to_string());
        err
    }

    // ── recording ────────────────────────────────────────────────────

    pub fn on_data_available(&mut self, chunk: Vec<u8>) {
        if self.status != CaptureStatus::Recording {
            debug!("Dropping {} byte chunk while {}", chunk.len(), self.status);
            return;
        }
        if !chunk.is_empty() {
            self.chunks.push(chunk);
        }
    }

    /// Ask the encoder to finish; [`Self::on_recorder_stopped`] follows.
    pub fn request_stop(&mut self) -> Result<()> {
        if self.status != CaptureStatus::Recording || self.stopping {
            return Err(self.invalid("stop recording"));
        }
        self.stopping = true;
        if let Some(tracks) = self.tracks.as_mut() {
            tracks.request_stop();
        }
        Ok(())
    }

    /// The recorder's stop event: finalise the blob, release the camera and
    /// create the single preview reference.
    pub fn on_recorder_stopped(&mut self) -> Result<()> {
        if self.status != CaptureStatus::Recording {
            return Err(self.invalid("finish recording"));
        }

        let blob = Rc::new(VideoBlob::from_chunks(
            std::mem::take(&mut self.chunks),
            &self.mime,
        ));

        // The last frame stays on screen, but the hardware must go.
        if let Some(mut tracks) = self.tracks.take() {
            tracks.stop_tracks();
        }

        self.urls.release(self.preview.take().as_ref());
        self.preview = Some(self.urls.acquire(blob.clone()));
        info!("Recording finished ({} bytes)", blob.len());

        self.blob = Some(blob);
        self.stopping = false;
        self.status = CaptureStatus::Recorded;
        Ok(())
    }

    // ── retake / upload ──────────────────────────────────────────────

    /// Cleanup half of a retake: revoke the preview and discard the blob.
    pub fn discard_recording(&mut self) -> Result<()> {
        if self.status != CaptureStatus::Recorded {
            return Err(self.invalid("retake"));
        }
        self.clear_recording();
        if let Some(ticket) = self.session.take() {
            self.sessions.retire(ticket);
        }
        self.status = CaptureStatus::Idle;
        Ok(())
    }

    /// Hand the finished recording to the uploader.
    ///
    /// Processing is the user's latest intent, so the upload runs under a
    /// fresh session even if a file upload finished since the recording.
    pub fn begin_upload(&mut self) -> Result<(SessionTicket, Rc<VideoBlob>)> {
        if self.status != CaptureStatus::Recorded {
            return Err(self.invalid("process recording"));
        }
        let Some(blob) = self.blob.clone() else {
            return Err(self.invalid("process recording"));
        };
        let ticket = self.sessions.begin();
        self.session = Some(ticket);
        self.error = None;
        self.status = CaptureStatus::Uploading;
        Ok((ticket, blob))
    }

    /// Upload finished, either way.  The recording is discarded and the
    /// controller returns to `Idle`; failures leave their message behind.
    ///
    /// Ignored when `ticket` is not the upload this controller started.
    pub fn finish_upload(&mut self, ticket: SessionTicket, outcome: Result<(), &PipelineError>) {
        if self.status != CaptureStatus::Uploading || self.session != Some(ticket) {
            debug!("Ignoring upload result for {ticket:?}");
            return;
        }
        self.clear_recording();
        self.session = None;
        self.status = CaptureStatus::Idle;
        if let Err(err) = outcome {
            self.error = Some(err.to_string());
        }
    }

    /// Unmount: release the camera and every reference, back to `Idle`.
    pub fn teardown(&mut self) {
        if let Some(mut tracks) = self.tracks.take() {
            tracks.stop_tracks();
        }
        self.clear_recording();
        self.chunks.clear();
        if let Some(ticket) = self.session.take() {
            self.sessions.retire(ticket);
        }
        self.permission_pending = false;
        self.stopping = false;
        self.status = CaptureStatus::Idle;
    }

    fn clear_recording(&mut self) {
        self.urls.release(self.preview.take().as_ref());
        self.blob = None;
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        self.teardown();
    }
}
