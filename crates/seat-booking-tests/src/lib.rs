use eyre::Result;
use seat_booking_core::{Config, CustomerId, HoldPolicy, SeatId, SeatStatus};

mod api;
pub use api::{Api, ApiError, ApiResponse, Reply, SessionState, UserSession};

pub struct TestCtxBuilder {
    /// Number of seats
    pub seats: u32,
    /// Count of worker threads
    pub workers: u32,
    /// Bound of the request queue, `0` for unbounded
    pub queue_capacity: u32,
    /// Count of acceptor threads feeding the dispatcher
    pub acceptor_threads: u16,
    /// What a hold on a seat pending for someone else does
    pub hold_policy: HoldPolicy,
}

impl Default for TestCtxBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestCtxBuilder {
    /// Create a new test context builder with the service defaults
    pub fn new() -> Self {
        let config = Config::default();
        TestCtxBuilder {
            seats: config.seats,
            workers: config.workers,
            queue_capacity: 0,
            acceptor_threads: 2,
            hold_policy: config.hold_policy,
        }
    }

    /// Set the number of seats
    pub fn with_seats(mut self, seats: u32) -> Self {
        self.seats = seats;
        self
    }

    /// Set the number of worker threads
    pub fn with_workers(mut self, workers: u32) -> Self {
        assert_ne!(workers, 0);
        self.workers = workers;
        self
    }

    /// Bound the request queue
    pub fn with_queue_capacity(mut self, capacity: u32) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the number of acceptor threads to use
    pub fn with_acceptor_threads(mut self, threads: u16) -> Self {
        assert_ne!(threads, 0);
        self.acceptor_threads = threads;
        self
    }

    pub fn with_hold_policy(mut self, policy: HoldPolicy) -> Self {
        self.hold_policy = policy;
        self
    }

    /// Get the [`Config`] for launching the seat booking system
    fn config(&self) -> Config {
        Config {
            seats: self.seats,
            workers: self.workers,
            queue_capacity: self.queue_capacity,
            graceful_shutdown: true,
            hold_policy: self.hold_policy,
        }
    }

    /// Build the test context
    pub async fn build(self) -> Result<TestCtx> {
        let (dispatcher, api) = api::mock::start(self.acceptor_threads, self.config()).await?;

        Ok(TestCtx {
            api,
            dispatcher,
            seats: self.seats,
            drop_bomb: DropBomb,
        })
    }
}

/// Test context
pub struct TestCtx {
    /// API allowing to interact with the seat booking system
    pub api: Api,
    dispatcher: api::mock::MockDispatcher,
    /// Number of seats
    pub seats: u32,

    drop_bomb: DropBomb,
}

impl TestCtx {
    /// Current state and holder of a seat, read directly from the registry
    pub fn seat(&self, id: SeatId) -> Option<(SeatStatus, Option<CustomerId>)> {
        self.dispatcher.dispatcher().registry().inspect(id)
    }

    /// Shut down the seat booking system and finish the test
    pub async fn finish(self) {
        std::mem::forget(self.drop_bomb);
        drop(self.api);
        self.dispatcher.shutdown().await;
    }
}

struct DropBomb;

impl Drop for DropBomb {
    fn drop(&mut self) {
        eprintln!("@TestAuthor: You should call `ctx.finish().await` to shut the seat booking system down");
    }
}
