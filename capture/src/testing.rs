//! In-crate fakes for the camera, the backend and the sink.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::{mpsc, Notify};

use stickframes_common::landmarks::{LandmarkBundle, LandmarkKind};
use stickframes_common::protocol::UploadResult;

use crate::backend::Backend;
use crate::camera::{Camera, GrantedStream, MediaStream, RecorderEvent};
use crate::error::{PipelineError, RetrievalError, UploadError};
use crate::media::VideoBlob;
use crate::sink::LandmarkSink;

// ── camera ───────────────────────────────────────────────────────────────

#[derive(Default)]
struct TrackState {
    live: Cell<bool>,
    stop_requests: Cell<usize>,
    events: RefCell<Option<mpsc::UnboundedSender<RecorderEvent>>>,
}

/// Camera tracks whose state stays observable after they are handed over.
#[derive(Clone, Default)]
pub(crate) struct FakeTracks {
    state: Rc<TrackState>,
}

impl FakeTracks {
    pub(crate) fn new() -> Self {
        let tracks = Self::default();
        tracks.state.live.set(true);
        tracks
    }

    fn with_events(events: mpsc::UnboundedSender<RecorderEvent>) -> Self {
        let tracks = Self::new();
        *tracks.state.events.borrow_mut() = Some(events);
        tracks
    }

    pub(crate) fn is_live(&self) -> bool {
        self.state.live.get()
    }

    pub(crate) fn stop_requests(&self) -> usize {
        self.state.stop_requests.get()
    }

    /// Simulate the encoder emitting a chunk.
    pub(crate) fn emit(&self, chunk: &[u8]) {
        if let Some(tx) = self.state.events.borrow().as_ref() {
            let _ = tx.send(RecorderEvent::DataAvailable(chunk.to_vec()));
        }
    }
}

impl MediaStream for FakeTracks {
    fn request_stop(&mut self) {
        self.state.stop_requests.set(self.state.stop_requests.get() + 1);
        if let Some(tx) = self.state.events.borrow().as_ref() {
            let _ = tx.send(RecorderEvent::Stopped);
        }
    }

    fn stop_tracks(&mut self) {
        self.state.live.set(false);
    }
}

pub(crate) struct FakeCamera {
    grant: Cell<bool>,
    opened: Cell<usize>,
    current: RefCell<Option<FakeTracks>>,
}

impl FakeCamera {
    pub(crate) fn new() -> Self {
        FakeCamera {
            grant: Cell::new(true),
            opened: Cell::new(0),
            current: RefCell::new(None),
        }
    }

    pub(crate) fn deny(&self) {
        self.grant.set(false);
    }

    pub(crate) fn opened(&self) -> usize {
        self.opened.get()
    }

    /// Tracks handed out by the most recent grant.
    pub(crate) fn tracks(&self) -> Option<FakeTracks> {
        self.current.borrow().clone()
    }
}

#[async_trait(?Send)]
impl Camera for FakeCamera {
    async fn open(&self) -> Result<GrantedStream, PipelineError> {
        if !self.grant.get() {
            return Err(PipelineError::Permission("NotAllowedError: permission denied".into()));
        }
        self.opened.set(self.opened.get() + 1);
        let (tx, events) = mpsc::unbounded_channel();
        let tracks = FakeTracks::with_events(tx);
        *self.current.borrow_mut() = Some(tracks.clone());
        Ok(GrantedStream {
            tracks: Box::new(tracks),
            events,
        })
    }
}

// ── backend ──────────────────────────────────────────────────────────────

/// Backend double.  Locators are derived from the uploaded file's stem;
/// a locator without served text answers `404 Not Found`.
pub(crate) struct FakeBackend {
    reachable: Cell<bool>,
    upload_status: RefCell<Option<String>>,
    malformed: Cell<bool>,
    texts: RefCell<HashMap<String, String>>,
    holds: RefCell<HashMap<String, Rc<Notify>>>,
    pings: Cell<usize>,
    uploads: RefCell<Vec<(String, usize)>>,
    fetches: Cell<usize>,
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        FakeBackend {
            reachable: Cell::new(true),
            upload_status: RefCell::new(None),
            malformed: Cell::new(false),
            texts: RefCell::new(HashMap::new()),
            holds: RefCell::new(HashMap::new()),
            pings: Cell::new(0),
            uploads: RefCell::new(Vec::new()),
            fetches: Cell::new(0),
        }
    }

    pub(crate) fn locators_for(stem: &str) -> UploadResult {
        UploadResult {
            body_landmarks: format!("/download/{stem}_body.txt"),
            left_hand_landmarks: format!("/download/{stem}_left_hand.txt"),
            right_hand_landmarks: format!("/download/{stem}_right_hand.txt"),
        }
    }

    pub(crate) fn set_reachable(&self, reachable: bool) {
        self.reachable.set(reachable);
    }

    pub(crate) fn fail_uploads_with(&self, status: &str) {
        *self.upload_status.borrow_mut() = Some(status.to_string());
    }

    pub(crate) fn answer_malformed(&self) {
        self.malformed.set(true);
    }

    /// Serve landmark texts for uploads of `<stem>.*`.
    pub(crate) fn serve(&self, stem: &str, body: &str, left_hand: &str, right_hand: &str) {
        let locators = Self::locators_for(stem);
        let mut texts = self.texts.borrow_mut();
        texts.insert(locators.body_landmarks, body.to_string());
        texts.insert(locators.left_hand_landmarks, left_hand.to_string());
        texts.insert(locators.right_hand_landmarks, right_hand.to_string());
    }

    pub(crate) fn remove(&self, locator: &str) {
        self.texts.borrow_mut().remove(locator);
    }

    /// Keep the upload of `file_name` pending until the returned gate is
    /// notified.
    pub(crate) fn hold_upload(&self, file_name: &str) -> Rc<Notify> {
        let gate = Rc::new(Notify::new());
        self.holds
            .borrow_mut()
            .insert(file_name.to_string(), gate.clone());
        gate
    }

    pub(crate) fn pings(&self) -> usize {
        self.pings.get()
    }

    pub(crate) fn uploads(&self) -> Vec<(String, usize)> {
        self.uploads.borrow().clone()
    }

    pub(crate) fn fetches(&self) -> usize {
        self.fetches.get()
    }
}

#[async_trait(?Send)]
impl Backend for FakeBackend {
    async fn ping(&self) -> Result<()> {
        self.pings.set(self.pings.get() + 1);
        if !self.reachable.get() {
            bail!("connection refused");
        }
        Ok(())
    }

    async fn upload(&self, video: &VideoBlob) -> Result<UploadResult, UploadError> {
        self.uploads
            .borrow_mut()
            .push((video.file_name.clone(), video.len()));

        let gate = self.holds.borrow().get(&video.file_name).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if let Some(status) = self.upload_status.borrow().clone() {
            return Err(UploadError::Status(status));
        }
        if self.malformed.get() {
            return Err(UploadError::Malformed("missing field `body_landmarks`".into()));
        }
        let stem = video
            .file_name
            .split('.')
            .next()
            .unwrap_or_default()
            .to_string();
        Ok(Self::locators_for(&stem))
    }

    async fn fetch_landmarks(
        &self,
        kind: LandmarkKind,
        locator: &str,
    ) -> Result<String, RetrievalError> {
        self.fetches.set(self.fetches.get() + 1);
        tokio::task::yield_now().await;
        self.texts
            .borrow()
            .get(locator)
            .cloned()
            .ok_or_else(|| RetrievalError::Status {
                kind,
                status: "404 Not Found".into(),
            })
    }
}

// ── sink ─────────────────────────────────────────────────────────────────

#[derive(Default)]
pub(crate) struct RecordingSink {
    received: RefCell<Vec<LandmarkBundle>>,
}

impl RecordingSink {
    pub(crate) fn received(&self) -> Vec<LandmarkBundle> {
        self.received.borrow().clone()
    }
}

impl LandmarkSink for RecordingSink {
    fn on_landmarks_received(&self, bundle: &LandmarkBundle) {
        self.received.borrow_mut().push(bundle.clone());
    }
}
