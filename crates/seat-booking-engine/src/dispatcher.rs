//! Implementation of the dispatcher
use std::sync::Arc;

use seat_booking_core::{Command, Config, Request, RequestHandler};
use tracing::{debug, info, trace, warn};

use crate::error::{InitError, RejectedError};
use crate::pool::{PoolStats, ShutdownMode, WorkerPool};
use crate::registry::SeatRegistry;
use crate::task::{ReplyHandle, SeatTask};

/// Entry point for seat operations
///
/// Turns requests into [`SeatTask`]s and queues them on the worker pool. The
/// workers run them against the shared [`SeatRegistry`] and answer the client.
pub struct Dispatcher {
    registry: Arc<SeatRegistry>,
    pool: WorkerPool<SeatTask>,
    shutdown_mode: ShutdownMode,
}

impl Dispatcher {
    /// Create the registry and start the workers
    pub fn new(config: &Config) -> Result<Self, InitError> {
        let registry = Arc::new(SeatRegistry::initialize(config.seats, config.hold_policy));
        let pool = WorkerPool::create(config.workers as usize, config.queue_capacity as usize)?;
        let shutdown_mode = if config.graceful_shutdown {
            ShutdownMode::Graceful
        } else {
            ShutdownMode::Immediate
        };
        Ok(Self {
            registry,
            pool,
            shutdown_mode,
        })
    }

    /// Queue `command` and return a handle to wait for its response
    pub fn submit(&self, command: Command) -> Result<ReplyHandle, RejectedError> {
        let (task, handle) = SeatTask::for_caller(command, Arc::clone(&self.registry));
        if let Err(rejected) = self.pool.submit(task) {
            let reason = rejected.reason();
            warn!(command = ?rejected.into_task().command(), %reason, "submission rejected");
            return Err(reason);
        }
        Ok(handle)
    }

    /// The seats, for inspection
    pub fn registry(&self) -> &SeatRegistry {
        &self.registry
    }

    /// Counters of the worker pool
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Stop the workers in the configured mode
    pub(crate) fn stop_pool(&self) {
        self.pool.shutdown(self.shutdown_mode);
    }
}

impl RequestHandler for Dispatcher {
    fn handle(&self, request: Request) {
        let command = match request.command() {
            Ok(command) => command,
            Err(missing) => {
                debug!(url = request.url(), %missing, "incomplete request");
                request.respond_with_err(missing.to_string());
                return;
            }
        };
        trace!(?command, "dispatching");

        let task = SeatTask::for_request(command, Arc::clone(&self.registry), request);
        if let Err(rejected) = self.pool.submit(task) {
            let (reason, task) = rejected.into_parts();
            warn!(command = ?task.command(), %reason, "request rejected");
            task.refuse(reason);
        }
    }

    fn shutdown(self) {
        self.stop_pool();
        let Dispatcher { registry, pool, .. } = self;
        drop(pool);

        match Arc::try_unwrap(registry) {
            Ok(registry) => registry.teardown(),
            Err(_) => warn!("seat registry still referenced after shutdown"),
        }
        info!("seat booking system shut down");
    }
}
