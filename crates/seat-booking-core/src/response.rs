use std::fmt;

use crate::{Operation, SeatEntry, SeatId, SeatStatus};

/// A state change applied to a seat
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Transition {
    /// The seat that changed
    pub seat: SeatId,
    /// State before the operation
    pub from: SeatStatus,
    /// State after the operation
    pub to: SeatStatus,
}

/// Result of a seat operation
///
/// None of these are errors: every variant is a regular answer of the
/// reservation state machine.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Outcome {
    /// A hold was placed or a hold was turned into a purchase
    Confirmed(Transition),
    /// A hold was released
    Cancelled(Transition),
    /// The seat cannot be held right now
    AlreadyHeld,
    /// No seat with the requested id
    NotFound,
    /// The seat belongs to another customer
    PermissionDenied,
    /// The caller owns the seat but there is no hold to act on
    NoPendingHold,
}

/// Everything a seat operation can answer
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Response {
    /// Answer to [`Operation::List`]
    Listing(Vec<SeatEntry>),
    /// Answer to a single-seat operation
    Outcome(Operation, Outcome),
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Listing(seats) if seats.is_empty() => f.write_str("No seats found"),
            Response::Listing(seats) => {
                let mut first = true;
                for seat in seats {
                    if !first {
                        f.write_str(",")?;
                    }
                    first = false;
                    write!(f, "{seat}")?;
                }
                Ok(())
            }
            Response::Outcome(op, outcome) => match outcome {
                // the state letter is the one the seat had before the change
                Outcome::Confirmed(t) if *op == Operation::Hold => {
                    write!(f, "Confirm seat: {} {} ?", t.seat, t.from.as_char())
                }
                Outcome::Confirmed(t) => {
                    write!(f, "Seat confirmed: {} {}", t.seat, t.from.as_char())
                }
                Outcome::Cancelled(t) => {
                    write!(f, "Seat request cancelled: {} {}", t.seat, t.from.as_char())
                }
                Outcome::NotFound => f.write_str("Requested seat not found"),
                Outcome::PermissionDenied => {
                    f.write_str("Permission denied - seat held by another user")
                }
                Outcome::NoPendingHold => f.write_str("No pending request"),
                Outcome::AlreadyHeld => f.write_str("Seat unavailable"),
            },
        }
    }
}
