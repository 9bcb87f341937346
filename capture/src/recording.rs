//! Camera section: record, retake, and process a webcam clip.
//!
//! Drives [`CaptureController`] from async code.  The controller is never
//! borrowed across an `.await`; every suspension point (permission prompt,
//! recorder flush, upload) happens between two short transitions.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use tracing::{debug, info};

use crate::camera::{Camera, RecorderEvent, RecorderEvents};
use crate::controller::{CaptureController, CaptureStatus};
use crate::error::{PipelineError, Result};
use crate::object_url::{ObjectUrl, ObjectUrls};
use crate::orchestrator::{Delivery, Orchestrator};
use crate::session::SessionTicket;
use crate::status::ServerStatusReader;

pub struct CameraSection {
    camera: Rc<dyn Camera>,
    controller: RefCell<CaptureController>,
    events: RefCell<Option<RecorderEvents>>,
    orchestrator: Rc<Orchestrator>,
    server: ServerStatusReader,
}

impl CameraSection {
    pub fn new(
        camera: Rc<dyn Camera>,
        orchestrator: Rc<Orchestrator>,
        server: ServerStatusReader,
        urls: ObjectUrls,
        recording_mime: &str,
    ) -> Self {
        let controller =
            CaptureController::new(urls, orchestrator.sessions().clone(), recording_mime);
        CameraSection {
            camera,
            controller: RefCell::new(controller),
            events: RefCell::new(None),
            orchestrator,
            server,
        }
    }

    pub fn status(&self) -> CaptureStatus {
        self.controller.borrow().status()
    }

    pub fn preview(&self) -> Option<ObjectUrl> {
        self.controller.borrow().preview().cloned()
    }

    pub fn last_error(&self) -> Option<String> {
        self.controller.borrow().last_error().map(str::to_string)
    }

    /// Read access to the state machine.
    pub fn controller(&self) -> Ref<'_, CaptureController> {
        self.controller.borrow()
    }

    /// Ask for the camera and start recording.
    pub async fn start_recording(&self) -> Result<SessionTicket> {
        if !self.server.is_running() {
            let err = PipelineError::ServerUnavailable;
            self.controller.borrow_mut().set_error(err.to_string());
            return Err(err);
        }

        self.controller.borrow_mut().begin_start()?;
        match self.camera.open().await {
            Ok(granted) => {
                let ticket = self
                    .controller
                    .borrow_mut()
                    .on_permission_granted(granted.tracks)?;
                *self.events.borrow_mut() = Some(granted.events);
                Ok(ticket)
            }
            Err(err) => Err(self.controller.borrow_mut().on_permission_denied(err)),
        }
    }

    /// Stop the recorder, collect its remaining chunks and finalise the clip.
    pub async fn stop_recording(&self) -> Result<()> {
        self.controller.borrow_mut().request_stop()?;

        let events = self.events.borrow_mut().take();
        if let Some(mut events) = events {
            while let Some(event) = events.recv().await {
                match event {
                    RecorderEvent::DataAvailable(chunk) => {
                        self.controller.borrow_mut().on_data_available(chunk);
                    }
                    RecorderEvent::Stopped => break,
                }
            }
        }

        self.controller.borrow_mut().on_recorder_stopped()
    }

    /// Throw the current clip away and immediately record a new one.
    pub async fn retake(&self) -> Result<SessionTicket> {
        self.controller.borrow_mut().discard_recording()?;
        info!("Retaking recording");
        self.start_recording().await
    }

    /// Upload the finished clip.  Whatever the outcome, the clip is
    /// discarded and the section returns to `Idle`.
    pub async fn process(&self) -> Result<Delivery> {
        let (ticket, blob) = self.controller.borrow_mut().begin_upload()?;
        let result = self.orchestrator.process(ticket, &blob).await;
        drop(blob);

        self.controller
            .borrow_mut()
            .finish_upload(ticket, result.as_ref().map(|_| ()));
        debug!("Camera section back to {}", self.status());
        result
    }

    /// Unmount: release the camera and the preview.
    pub fn teardown(&self) {
        self.events.borrow_mut().take();
        self.controller.borrow_mut().teardown();
    }
}
