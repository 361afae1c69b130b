//! Route processing: the session pipeline, its worker task and listener seams.
//!
//! # Architecture
//!
//! ```text
//!  enqueue(sample) ─┐
//!  apply_route() ───┼─► WorkItem queue ─► worker task ─► Dispatch queue ─► dispatch task ─► listener
//!  flush() ─────────┘   (unbounded FIFO)  (one item at    (unbounded FIFO)  (in order)
//!                                          a time, owns
//!                                          the session)
//! ```
//!
//! The worker owns the [`NavigationSession`] outright, so off-route and
//! faster-route state are only ever touched by one task. Results are handed to
//! a separate dispatch task so a slow listener never blocks processing.
//!
//! # Lifecycle
//!
//! ```text
//! Idle --bind_session--> Active --end_session--> Draining --> Stopped
//! Stopped --bind_session--> Active
//! ```

mod listener;
mod session;
mod update;
mod worker;

pub use listener::{EventDispatcher, NavigationEventListener, RouteFetcher, RouteUpdateListener};
pub use session::NavigationSession;
pub use update::RouteUpdate;
pub use worker::RouteProcessor;

use thiserror::Error;

use crate::config::ConfigError;
use crate::route::RouteError;

/// Lifecycle state of a [`RouteProcessor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    /// No session bound; enqueues are rejected.
    Idle,
    /// Session bound; samples are accepted and processed in order.
    Active,
    /// Session ending; no new samples, queued ones are discarded.
    Draining,
    /// Session released. A new bind is required.
    Stopped,
}

impl ProcessorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessorState::Idle => "Idle",
            ProcessorState::Active => "Active",
            ProcessorState::Draining => "Draining",
            ProcessorState::Stopped => "Stopped",
        }
    }
}

impl std::fmt::Display for ProcessorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("processor is {0}, no session is active")]
    NotActive(ProcessorState),

    #[error("processor is {0}, end the current session first")]
    AlreadyActive(ProcessorState),

    #[error("no Tokio runtime available to run the worker")]
    NoRuntime,

    #[error("invalid route: {0}")]
    InvalidRoute(#[from] RouteError),

    #[error("invalid options: {0}")]
    InvalidOptions(#[from] ConfigError),

    #[error("session stopped before the request completed")]
    Stopped,
}
