//! :rocket: The seat booking engine.
//!
//! A fixed [worker pool][pool] executes seat operations taken from a shared
//! queue against the [seat registry][registry], where every seat is guarded
//! by its own lock. The [dispatcher] glues both together behind the
//! [`RequestHandler`](seat_booking_core::RequestHandler) interface used by
//! the transport.

#![allow(rustdoc::private_intra_doc_links)]
use seat_booking_core::Config;

mod dispatcher;
mod error;
mod pool;
mod registry;
mod task;

pub use dispatcher::Dispatcher;
pub use error::{InitError, Rejected, RejectedError, TaskError};
pub use pool::{Job, PoolStats, ShutdownMode, Task, WorkerPool, WorkerState};
pub use registry::SeatRegistry;
pub use task::{ReplyHandle, SeatTask};

/// Entrypoint of the engine
///
/// Initialises the seats and starts the workers. Startup must not proceed if
/// this fails.
pub fn launch(config: &Config) -> Result<Dispatcher, InitError> {
    Dispatcher::new(config)
}
