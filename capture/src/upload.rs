//! Upload section: pick or drop a video file and process it.

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::media::VideoBlob;
use crate::orchestrator::{Delivery, Orchestrator};
use crate::status::ServerStatusReader;

pub struct UploadSection {
    orchestrator: Rc<Orchestrator>,
    server: ServerStatusReader,
    max_upload_bytes: u64,
    uploading: Cell<bool>,
    selected: RefCell<Option<String>>,
    error: RefCell<Option<String>>,
}

impl UploadSection {
    pub fn new(
        orchestrator: Rc<Orchestrator>,
        server: ServerStatusReader,
        max_upload_bytes: u64,
    ) -> Self {
        UploadSection {
            orchestrator,
            server,
            max_upload_bytes,
            uploading: Cell::new(false),
            selected: RefCell::new(None),
            error: RefCell::new(None),
        }
    }

    /// File picking and dropping are only offered while the backend runs
    /// and nothing is in flight.
    pub fn is_enabled(&self) -> bool {
        self.server.is_running() && !self.uploading.get()
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading.get()
    }

    /// Name of the file being (or last successfully) processed.
    pub fn selected(&self) -> Option<String> {
        self.selected.borrow().clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.error.borrow().clone()
    }

    /// File picker.
    pub async fn select_file(&self, path: &Path) -> Result<Delivery> {
        self.check_available()?;
        self.submit(path).await
    }

    /// Drag and drop.  Only the first file is used; an empty drop does
    /// nothing.
    pub async fn drop_files(&self, paths: &[PathBuf]) -> Result<Option<Delivery>> {
        self.check_available()?;
        match paths.first() {
            Some(path) => self.submit(path).await.map(Some),
            None => Ok(None),
        }
    }

    fn check_available(&self) -> Result<()> {
        if !self.server.is_running() {
            let err = PipelineError::ServerUnavailable;
            warn!("Rejected upload: backend is {}", self.server.current());
            *self.error.borrow_mut() = Some(err.to_string());
            return Err(err);
        }
        if self.uploading.get() {
            return Err(PipelineError::Busy);
        }
        Ok(())
    }

    async fn submit(&self, path: &Path) -> Result<Delivery> {
        let name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        let ticket = self.orchestrator.sessions().begin();

        *self.selected.borrow_mut() = Some(name.clone());
        *self.error.borrow_mut() = None;
        self.uploading.set(true);
        info!("Processing {name}");

        let result = match VideoBlob::from_file(path, self.max_upload_bytes).await {
            Ok(video) => self.orchestrator.process(ticket, &video).await,
            Err(e) => Err(e.into()),
        };

        self.uploading.set(false);
        match &result {
            Ok(Delivery::Delivered(_)) => {}
            Ok(Delivery::Discarded) => {
                info!("Processing {name} was superseded");
                *self.selected.borrow_mut() = None;
            }
            Err(err) => {
                warn!("Processing {name} failed: {err}");
                *self.selected.borrow_mut() = None;
                *self.error.borrow_mut() = Some(err.to_string());
            }
        }
        result
    }
}
