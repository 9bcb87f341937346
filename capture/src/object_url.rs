//! Temporary references to in-memory blobs (recording previews).
//!
//! Every [`ObjectUrls::acquire`] must be paired with a
//! [`ObjectUrls::release`]; releasing is idempotent so cleanup paths can call
//! it unconditionally.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::media::VideoBlob;

/// Opaque handle to a live blob reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectUrl(u64);

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blob:stickframes/{}", self.0)
    }
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    live: HashMap<u64, Rc<VideoBlob>>,
}

/// Shared, single-threaded registry of live blob references.
#[derive(Clone, Default)]
pub struct ObjectUrls {
    inner: Rc<RefCell<Registry>>,
}

impl ObjectUrls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh reference to `blob`.
    pub fn acquire(&self, blob: Rc<VideoBlob>) -> ObjectUrl {
        let mut reg = self.inner.borrow_mut();
        reg.next_id += 1;
        let id = reg.next_id;
        reg.live.insert(id, blob);
        debug!("acquired blob:stickframes/{id} ({} live)", reg.live.len());
        ObjectUrl(id)
    }

    /// Revoke a reference.  Unknown, already released or absent handles are
    /// a no-op.
    pub fn release(&self, url: Option<&ObjectUrl>) {
        let Some(url) = url else { return };
        let mut reg = self.inner.borrow_mut();
        if reg.live.remove(&url.0).is_some() {
            debug!("released {url} ({} live)", reg.live.len());
        }
    }

    /// The blob behind a live handle; `None` once it has been released.
    pub fn resolve(&self, url: &ObjectUrl) -> Option<Rc<VideoBlob>> {
        self.inner.borrow().live.get(&url.0).cloned()
    }

    /// Number of handles acquired and not yet released.
    pub fn outstanding(&self) -> usize {
        self.inner.borrow().live.len()
    }
}
