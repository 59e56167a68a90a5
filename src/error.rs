//! Error types at each component boundary.
//!
//! Transient errors (`BackendError`) are never surfaced to a `Reader`; they
//! are logged and retried. `UsageError` is raised eagerly at construction
//! time, before the runner ever starts. `Interrupted` is the only error that
//! terminates the runner.

use thiserror::Error;

/// A failure returned by the [`Login`](crate::collab::Login) or
/// [`Renew`](crate::collab::Renew) collaborator (HTTP 4xx/5xx, network
/// errors, malformed responses). Opaque to this crate — it owns no
/// transport and so has no status-code taxonomy of its own.
#[derive(Debug, Error, Clone)]
#[error("backend error: {msg}")]
pub struct BackendError {
    pub msg: String,
}

impl BackendError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

/// Cancellation observed during a [`Sleeper::sleep`](crate::sleep::Sleeper).
/// Unwinds whichever state the runner was in and transitions to S4
/// Terminated.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("interrupted")]
pub struct Interrupted;

/// Raised eagerly at [`LifecycleBuilder::start`](crate::facade::LifecycleBuilder::start)
/// time; the runner never starts.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum UsageError {
    #[error("no Login collaborator was configured")]
    MissingLogin,
    #[error("no Renew collaborator was configured")]
    MissingRenew,
}
