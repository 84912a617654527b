//! A seat operation bound to the place its answer must go
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crossbeam::channel::{self, Receiver, Sender};
use seat_booking_core::{Command, Request, Response};
use tracing::error;

use crate::error::{RejectedError, TaskError};
use crate::pool::Task;
use crate::registry::SeatRegistry;

/// Where the result of a [`SeatTask`] is delivered
enum Reply {
    /// written back to the client connection
    Connection(Request),
    /// handed to a caller waiting on a [`ReplyHandle`]
    Caller(Sender<Result<Response, TaskError>>),
}

impl Reply {
    fn deliver(self, result: Result<Response, TaskError>) {
        match (self, result) {
            (Reply::Connection(rq), Ok(response)) => rq.respond_with_string(response.to_string()),
            (Reply::Connection(rq), Err(err)) => rq.respond_with_failure(err.to_string()),
            (Reply::Caller(sender), result) => {
                // the caller may have stopped waiting
                let _ = sender.send(result);
            }
        }
    }
}

/// One seat operation, executed on a worker thread
pub struct SeatTask {
    command: Command,
    registry: Arc<SeatRegistry>,
    reply: Reply,
}

impl SeatTask {
    /// A task answering the client that sent `request`
    pub(crate) fn for_request(
        command: Command,
        registry: Arc<SeatRegistry>,
        request: Request,
    ) -> Self {
        Self {
            command,
            registry,
            reply: Reply::Connection(request),
        }
    }

    /// A task answering through the returned handle
    pub(crate) fn for_caller(command: Command, registry: Arc<SeatRegistry>) -> (Self, ReplyHandle) {
        let (sender, receiver) = channel::bounded(1);
        let task = Self {
            command,
            registry,
            reply: Reply::Caller(sender),
        };
        (task, ReplyHandle { receiver })
    }

    /// The command this task executes
    pub fn command(&self) -> &Command {
        &self.command
    }

    /// Answer without running the command
    ///
    /// A client connection is told the service is unavailable; a waiting
    /// caller observes [`TaskError::Discarded`].
    pub(crate) fn refuse(self, reason: RejectedError) {
        match self.reply {
            Reply::Connection(rq) => rq.respond_unavailable(reason.to_string()),
            Reply::Caller(sender) => drop(sender),
        }
    }
}

impl Task for SeatTask {
    fn run(self) {
        let SeatTask {
            command,
            registry,
            reply,
        } = self;
        let result = panic::catch_unwind(AssertUnwindSafe(|| registry.apply(&command)))
            .map_err(TaskError::from_panic);
        if let Err(err) = &result {
            error!(?command, error = %err, "seat operation failed");
        }
        reply.deliver(result);
    }

    fn abandon(self) {
        self.refuse(RejectedError::ShuttingDown);
    }
}

/// Receives the result of a submitted command
#[derive(Debug)]
pub struct ReplyHandle {
    receiver: Receiver<Result<Response, TaskError>>,
}

impl ReplyHandle {
    /// Block until the command has run
    ///
    /// Returns [`TaskError::Discarded`] if the task was dropped without
    /// running.
    pub fn wait(self) -> Result<Response, TaskError> {
        self.receiver.recv().unwrap_or(Err(TaskError::Discarded))
    }
}
