//! Capture-session identity.
//!
//! Results are only applied for the session that is still active when they
//! arrive; a response for a superseded session is dropped.

use std::cell::Cell;
use std::rc::Rc;

/// Identity of one capture session (a recording attempt or a file pick).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionTicket(u64);

/// Hands out tickets; the most recently begun one is the active session.
#[derive(Debug, Clone, Default)]
pub struct SessionTracker {
    current: Rc<Cell<u64>>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new session, superseding whichever one was active.
    pub fn begin(&self) -> SessionTicket {
        let next = self.current.get() + 1;
        self.current.set(next);
        SessionTicket(next)
    }

    pub fn is_active(&self, ticket: SessionTicket) -> bool {
        self.current.get() == ticket.0
    }

    /// End `ticket` without starting another one.  No-op if it was already
    /// superseded.
    pub fn retire(&self, ticket: SessionTicket) {
        if self.is_active(ticket) {
            self.current.set(ticket.0 + 1);
        }
    }
}
