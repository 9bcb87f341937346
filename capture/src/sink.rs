//! Landmark presentation sink.
//!
//! The orchestrator calls [`LandmarkSink::on_landmarks_received`] exactly once
//! per successful upload, always with a complete bundle.

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use stickframes_common::landmarks::{LandmarkBundle, LandmarkKind};

pub trait LandmarkSink {
    fn on_landmarks_received(&self, bundle: &LandmarkBundle);
}

/// The three landmark boxes: holds the latest bundle and exports streams
/// as text files.
#[derive(Debug, Default)]
pub struct LandmarkBoard {
    current: RefCell<LandmarkBundle>,
    deliveries: Cell<usize>,
}

impl LandmarkBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bundle(&self) -> LandmarkBundle {
        self.current.borrow().clone()
    }

    /// Number of bundles received so far.
    pub fn deliveries(&self) -> usize {
        self.deliveries.get()
    }

    /// Text of one box, placeholder included.
    pub fn render(&self, kind: LandmarkKind) -> String {
        self.current.borrow().display_text(kind).to_string()
    }

    /// Write one stream to `dir/<kind file name>`.  Returns `None` (and
    /// writes nothing) when the stream has not been received.
    pub fn export(&self, kind: LandmarkKind, dir: &Path) -> Result<Option<PathBuf>> {
        let current = self.current.borrow();
        let Some(text) = current.get(kind).filter(|t| !t.is_empty()) else {
            return Ok(None);
        };

        std::fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create {}", dir.display()))?;
        let path = dir.join(kind.file_name());
        std::fs::write(&path, text)
            .with_context(|| format!("Cannot write {}", path.display()))?;
        info!("Saved {} → {}", kind.title(), path.display());
        Ok(Some(path))
    }

    /// Export every received stream.
    pub fn export_all(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for kind in LandmarkKind::ALL {
            if let Some(path) = self.export(kind, dir)? {
                written.push(path);
            }
        }
        Ok(written)
    }
}

impl LandmarkSink for LandmarkBoard {
    fn on_landmarks_received(&self, bundle: &LandmarkBundle) {
        *self.current.borrow_mut() = bundle.clone();
        self.deliveries.set(self.deliveries.get() + 1);
    }
}
