//! 🏗 Shared vocabulary of the seat booking service: requests, commands,
//! outcomes and configuration.
#![warn(missing_docs)]

mod command;
mod request;
mod response;
mod seat;

use serde::Deserialize;

pub use command::{Command, MissingArgument, SeatRequest};
pub use request::{Operation, RawRequest, Request, RequestHandler};
pub use response::{Outcome, Response, Transition};
pub use seat::{CustomerId, SeatEntry, SeatId, SeatStatus};

/// What `hold` does when a seat is already pending for another customer
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HoldPolicy {
    /// Hand the pending seat over to the new customer
    #[default]
    Reassign,
    /// Refuse with [`Outcome::AlreadyHeld`] while someone else holds the seat
    Reject,
}

/// Configuration of the seat booking system
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Number of seats, with ids `0..seats`
    pub seats: u32,
    /// Number of worker threads executing seat operations
    pub workers: u32,
    /// Maximum number of queued operations, `0` for an unbounded queue
    pub queue_capacity: u32,
    /// Let queued operations finish on shutdown instead of discarding them
    pub graceful_shutdown: bool,
    /// Behaviour of `hold` on a seat pending for somebody else
    pub hold_policy: HoldPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seats: 20,
            workers: 4,
            queue_capacity: 256,
            graceful_shutdown: true,
            hold_policy: HoldPolicy::Reassign,
        }
    }
}
