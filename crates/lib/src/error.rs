//! Reasons a user action is refused before any backend call is made.

use std::sync::atomic::{AtomicBool, Ordering};

/// A refused action. Nothing was sent to the backend; unless noted, nothing was added to the feed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// Input was empty or whitespace only.
    #[error("nothing to send")]
    EmptyInput,
    /// The surface needs an active workspace session and none exists.
    #[error("create or join a workspace first")]
    NoSession,
    /// Another exchange (or create/join) on this surface is still in flight.
    #[error("still waiting for the previous request")]
    Busy,
    /// A workspace session is already active; create/join is not available.
    #[error("already in workspace {0}")]
    AlreadyInWorkspace(String),
    /// The surface does not offer this action (e.g. uploads on the agent surface).
    #[error("{0} is not available here")]
    Unsupported(&'static str),
    /// No selected file was of an accepted type. The feed received one inline notice per file.
    #[error("no supported files selected")]
    NoAcceptedFiles,
}

/// Marks an action as in flight for as long as it is held; a second acquire fails with `Busy`.
pub(crate) struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    pub(crate) fn acquire(flag: &'a AtomicBool) -> Result<Self, Rejection> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| Self(flag))
            .map_err(|_| Rejection::Busy)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
