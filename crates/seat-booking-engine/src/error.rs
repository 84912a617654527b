//! Infrastructure errors of the engine
//!
//! Domain refusals (unknown seat, foreign hold, ...) are not errors; they are
//! [`Outcome`](seat_booking_core::Outcome)s.
use std::any::Any;
use std::fmt;
use std::io;

use thiserror::Error;

/// The worker pool could not be started
#[derive(Debug, Error)]
pub enum InitError {
    /// A pool without workers would never run anything
    #[error("a worker pool needs at least one worker")]
    NoWorkers,
    /// The operating system refused to create a worker thread
    #[error("failed to spawn worker {index}")]
    Spawn {
        /// Index of the worker that could not be created
        index: usize,
        /// Error reported by the thread builder
        #[source]
        source: io::Error,
    },
}

/// Reason a submission was refused
#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum RejectedError {
    /// Shutdown has begun, no new work is accepted
    #[error("the service is shutting down")]
    ShuttingDown,
    /// The queue holds as many tasks as it may
    #[error("the request queue is full ({capacity} pending)")]
    QueueFull {
        /// Configured queue capacity
        capacity: usize,
    },
}

/// A refused submission, handing the task back to the caller
pub struct Rejected<T> {
    reason: RejectedError,
    task: T,
}

impl<T> Rejected<T> {
    pub(crate) fn new(reason: RejectedError, task: T) -> Self {
        Self { reason, task }
    }

    /// Why the task was refused
    pub fn reason(&self) -> RejectedError {
        self.reason
    }

    /// Take the refused task back
    pub fn into_task(self) -> T {
        self.task
    }

    /// Split into the reason and the task
    pub fn into_parts(self) -> (RejectedError, T) {
        (self.reason, self.task)
    }
}

impl<T> fmt::Debug for Rejected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected")
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}

impl<T> fmt::Display for Rejected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.reason, f)
    }
}

impl<T> std::error::Error for Rejected<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.reason)
    }
}

/// A task did not produce a result
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum TaskError {
    /// The task body panicked; the worker survived
    #[error("task panicked: {0}")]
    Panicked(String),
    /// The task was dropped unexecuted by an immediate shutdown
    #[error("task was discarded before it ran")]
    Discarded,
}

impl TaskError {
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        TaskError::Panicked(panic_message(payload.as_ref()))
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
