use crate::{Command, CustomerId, MissingArgument, SeatId};

/// Kind of the request
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(u8)]
pub enum Operation {
    /// List every seat together with its state
    List,

    /// Place a hold on a seat
    ///
    /// Served from `/view_seat`: looking at a seat reserves it for the
    /// customer until they confirm or cancel.
    Hold,

    /// Buy a seat previously held by the same customer
    Confirm,

    /// Release a seat previously held by the same customer
    Cancel,
}

/// Request received from a client
///
/// The transport parses the request line into an operation and its integer
/// arguments and hands the result to a [`RequestHandler`]. The answer goes
/// back through one of the `respond_*` methods, each of which consumes the
/// request.
pub struct Request {
    operation: Operation,
    seat: Option<SeatId>,
    customer: Option<CustomerId>,
    priority: Option<u32>,
    raw: Box<dyn RawRequest + Send>,
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("operation", &self.operation)
            .field("seat", &self.seat)
            .field("customer", &self.customer)
            .field("priority", &self.priority)
            .field("raw", &format_args!(".."))
            .finish()
    }
}

/// Interface for handling client requests
pub trait RequestHandler {
    /// Handle a request
    ///
    /// This method may be called concurrently from different threads.
    fn handle(&self, request: Request);

    /// Shut the seat booking system down
    ///
    /// This method waits for all threads spawned for the system to have
    /// terminated.
    fn shutdown(self);
}

/// A raw request, implemented by the transport
pub trait RawRequest {
    /// Get the URL
    fn url(&self) -> &str;

    /// Respond with the text of a regular answer
    fn respond_with_string(self: Box<Self>, s: String);
    /// Respond with an error message describing an invalid request
    fn respond_with_err(self: Box<Self>, err: String);
    /// Respond that the service cannot take the request right now
    fn respond_unavailable(self: Box<Self>, reason: String);
    /// Respond that the request failed inside the service
    fn respond_with_failure(self: Box<Self>, reason: String);
}

impl Request {
    /// Get the request's operation
    #[inline]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Get the seat id, if provided
    #[inline]
    pub fn seat_id(&self) -> Option<SeatId> {
        self.seat
    }

    /// Get the customer id, if provided
    #[inline]
    pub fn customer_id(&self) -> Option<CustomerId> {
        self.customer
    }

    /// Get the customer priority, if provided
    #[inline]
    pub fn priority(&self) -> Option<u32> {
        self.priority
    }

    /// Get the request URL
    #[inline]
    pub fn url(&self) -> &str {
        self.raw.url()
    }

    /// Validate the arguments into a [`Command`]
    pub fn command(&self) -> Result<Command, MissingArgument> {
        Command::new(self.operation, self.seat, self.customer, self.priority)
    }

    /// Respond with the text of a regular answer.
    ///
    /// This method blocks until the response has been sent.
    #[inline]
    pub fn respond_with_string(self, s: impl Into<String>) {
        self.raw.respond_with_string(s.into());
    }

    /// Respond with an error indicating an invalid request to the client.
    ///
    /// This method blocks until the response has been sent.
    #[inline]
    pub fn respond_with_err(self, err: impl Into<String>) {
        self.raw.respond_with_err(err.into());
    }

    /// Respond with a transient failure; the client may retry later.
    ///
    /// This method blocks until the response has been sent.
    #[inline]
    pub fn respond_unavailable(self, reason: impl Into<String>) {
        self.raw.respond_unavailable(reason.into());
    }

    /// Respond with an internal failure.
    ///
    /// This method blocks until the response has been sent.
    #[inline]
    pub fn respond_with_failure(self, reason: impl Into<String>) {
        self.raw.respond_with_failure(reason.into());
    }

    /// Create a new request from a [`RawRequest`]
    #[inline]
    pub fn from_raw(
        operation: Operation,
        seat: Option<SeatId>,
        customer: Option<CustomerId>,
        priority: Option<u32>,
        raw: Box<dyn RawRequest + Send>,
    ) -> Self {
        Self {
            operation,
            seat,
            customer,
            priority,
            raw,
        }
    }
}
