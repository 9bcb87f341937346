//! Backend availability, probed once per run.
//!
//! The probe is the only writer: [`StatusWriter::resolve`] consumes the
//! writer, so the status leaves `Checking` exactly once.  Everyone else holds
//! a read-only [`ServerStatusReader`].

use std::fmt;
use std::rc::Rc;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::backend::Backend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    Checking,
    Running,
    NotRunning,
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Checking => "checking",
            Self::Running => "running",
            Self::NotRunning => "not running",
        };
        f.write_str(s)
    }
}

/// Create the status cell, initially `Checking`.
pub fn channel() -> (StatusWriter, ServerStatusReader) {
    let (tx, rx) = watch::channel(ServerStatus::Checking);
    (StatusWriter { tx }, ServerStatusReader { rx })
}

pub struct StatusWriter {
    tx: watch::Sender<ServerStatus>,
}

impl StatusWriter {
    /// Record the terminal status.  `Checking` is not a terminal value and
    /// is mapped to `NotRunning`.
    pub fn resolve(self, status: ServerStatus) {
        let status = match status {
            ServerStatus::Checking => ServerStatus::NotRunning,
            other => other,
        };
        self.tx.send_replace(status);
    }
}

#[derive(Debug, Clone)]
pub struct ServerStatusReader {
    rx: watch::Receiver<ServerStatus>,
}

impl ServerStatusReader {
    /// A reader whose status is already decided.
    pub fn fixed(status: ServerStatus) -> Self {
        let (writer, reader) = channel();
        writer.resolve(status);
        reader
    }

    pub fn current(&self) -> ServerStatus {
        *self.rx.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.current() == ServerStatus::Running
    }

    /// Wait until the probe has decided.  If the writer is dropped without
    /// resolving, the backend is treated as not running.
    pub async fn resolved(&mut self) -> ServerStatus {
        match self.rx.wait_for(|s| *s != ServerStatus::Checking).await {
            Ok(status) => *status,
            Err(_) => ServerStatus::NotRunning,
        }
    }
}

/// Issue the reachability request and record the outcome.  No retry.
pub async fn probe<B: Backend + ?Sized>(backend: &B, writer: StatusWriter) -> ServerStatus {
    let status = match backend.ping().await {
        Ok(()) => ServerStatus::Running,
        Err(e) => {
            warn!("Backend unreachable: {e:#}");
            ServerStatus::NotRunning
        }
    };
    info!("Backend is {status}");
    writer.resolve(status);
    status
}

/// Run [`probe`] as a local task.  Must be called inside a `LocalSet`.
pub fn spawn_probe(backend: Rc<dyn Backend>) -> ServerStatusReader {
    let (writer, reader) = channel();
    tokio::task::spawn_local(async move {
        probe(backend.as_ref(), writer).await;
    });
    reader
}
