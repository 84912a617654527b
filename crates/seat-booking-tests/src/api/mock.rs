//! Mock API implementation directly using the `seat-booking-engine` crate

use std::sync::Arc;

use seat_booking_core::{Config, Operation, RawRequest, Request, RequestHandler};
use seat_booking_engine::Dispatcher;
use tokio::sync::oneshot;
use tokio::task::{self, JoinHandle};

use super::{Api, ApiError, RequestMsg, Response};

pub struct MockDispatcher {
    dispatcher: Arc<Dispatcher>,
    join_handles: Vec<JoinHandle<()>>,
}

struct MockRawRequest {
    operation: Operation,
    response_channel: oneshot::Sender<Response>,
}

pub async fn start(threads: u16, config: Config) -> eyre::Result<(MockDispatcher, Api)> {
    let dispatcher =
        Arc::new(task::spawn_blocking(move || seat_booking_engine::launch(&config)).await??);

    let it = (0..threads).map(|_| {
        let (sender, receiver) = flume::bounded::<RequestMsg>(65536);
        let dispatcher = dispatcher.clone();
        let handle = task::spawn_blocking(move || {
            let dispatcher = &*dispatcher;
            for msg in receiver.into_iter() {
                let raw = Box::new(MockRawRequest {
                    operation: msg.operation,
                    response_channel: msg.response_channel,
                });
                dispatcher.handle(Request::from_raw(
                    msg.operation,
                    msg.seat,
                    msg.customer,
                    msg.priority,
                    raw,
                ))
            }
        });
        (sender, handle)
    });
    let (senders, join_handles) = it.unzip();

    let mock_dispatcher = MockDispatcher {
        dispatcher,
        join_handles,
    };
    Ok((mock_dispatcher, Api::new(senders)))
}

impl MockDispatcher {
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Wait for the acceptors to run dry, then shut the engine down
    pub async fn shutdown(self) {
        for handle in self.join_handles {
            handle.await.unwrap()
        }
        task::spawn_blocking(move || Arc::into_inner(self.dispatcher).unwrap().shutdown())
            .await
            .unwrap();
    }
}

impl MockRawRequest {
    fn send(self, response: Response) {
        // the test may have given up waiting
        let _ = self.response_channel.send(response);
    }
}

impl RawRequest for MockRawRequest {
    fn url(&self) -> &str {
        match self.operation {
            Operation::List => "/list_seats",
            Operation::Hold => "/view_seat",
            Operation::Confirm => "/confirm",
            Operation::Cancel => "/cancel",
        }
    }

    fn respond_with_string(self: Box<Self>, s: String) {
        self.send(Response::Text(s))
    }

    fn respond_with_err(self: Box<Self>, err: String) {
        self.send(Response::Error(ApiError::BadRequest(err)))
    }

    fn respond_unavailable(self: Box<Self>, reason: String) {
        self.send(Response::Error(ApiError::Unavailable(reason)))
    }

    fn respond_with_failure(self: Box<Self>, reason: String) {
        self.send(Response::Error(ApiError::Failure(reason)))
    }
}
