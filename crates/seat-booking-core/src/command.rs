use thiserror::Error;

use crate::{CustomerId, Operation, SeatId};

/// Arguments of an operation addressing a single seat
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SeatRequest {
    /// The seat to operate on
    pub seat: SeatId,
    /// The customer asking
    pub customer: CustomerId,
    /// Accepted for compatibility, not used for scheduling
    pub priority: u32,
}

/// A fully validated seat operation
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Command {
    /// List all seats with their state
    List,
    /// Place a hold on a seat
    Hold(SeatRequest),
    /// Turn the caller's hold into a purchase
    Confirm(SeatRequest),
    /// Give up the caller's hold
    Cancel(SeatRequest),
}

/// A required argument was not supplied with the request
#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum MissingArgument {
    /// No seat id
    #[error("No seat id provided!")]
    Seat,
    /// No customer id
    #[error("No customer id provided!")]
    Customer,
}

impl Command {
    /// Assemble a command from the parsed fields of a request
    ///
    /// Everything but [`Operation::List`] needs a seat and a customer. A
    /// missing priority counts as `0`.
    pub fn new(
        operation: Operation,
        seat: Option<SeatId>,
        customer: Option<CustomerId>,
        priority: Option<u32>,
    ) -> Result<Self, MissingArgument> {
        if operation == Operation::List {
            return Ok(Command::List);
        }
        let args = SeatRequest {
            seat: seat.ok_or(MissingArgument::Seat)?,
            customer: customer.ok_or(MissingArgument::Customer)?,
            priority: priority.unwrap_or(0),
        };
        Ok(match operation {
            Operation::Hold => Command::Hold(args),
            Operation::Confirm => Command::Confirm(args),
            Operation::Cancel => Command::Cancel(args),
            Operation::List => Command::List,
        })
    }

    /// The operation this command performs
    pub fn operation(&self) -> Operation {
        match self {
            Command::List => Operation::List,
            Command::Hold(_) => Operation::Hold,
            Command::Confirm(_) => Operation::Confirm,
            Command::Cancel(_) => Operation::Cancel,
        }
    }
}
