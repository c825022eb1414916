//! Errors surfaced by [`crate::pool::ComputePool::submit`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComputeError {
    /// No handler was registered under this tag.
    #[error("no handler registered for tag {0:?}")]
    UnknownHandler(String),

    /// The handler ran but returned an application-level failure.
    #[error("handler {0:?} failed: {1}")]
    HandlerFailed(String, String),

    /// The executor that owned the task vanished before replying (e.g. panicked).
    #[error("executor for tag {0:?} dropped the reply channel")]
    ExecutorLost(String),
}
