//! Implementation of the seat registry
//!
//! Seats live in a fixed array indexed by id, each behind its own lock. Every
//! operation touches exactly one seat and holds its lock only for the
//! read-check-write of that seat, so operations on different seats never
//! contend and no lock ordering problem can arise.
use parking_lot::Mutex;
use seat_booking_core::{
    Command, CustomerId, HoldPolicy, Operation, Outcome, Response, SeatEntry, SeatId, SeatStatus,
    Transition,
};
use tracing::{debug, info};

/// State of one seat; the holder only exists while the seat is taken
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum SeatState {
    Available,
    Pending(CustomerId),
    Occupied(CustomerId),
}

impl SeatState {
    fn status(self) -> SeatStatus {
        match self {
            SeatState::Available => SeatStatus::Available,
            SeatState::Pending(_) => SeatStatus::Pending,
            SeatState::Occupied(_) => SeatStatus::Occupied,
        }
    }

    fn holder(self) -> Option<CustomerId> {
        match self {
            SeatState::Available => None,
            SeatState::Pending(customer) | SeatState::Occupied(customer) => Some(customer),
        }
    }
}

struct Seat {
    id: SeatId,
    state: Mutex<SeatState>,
}

/// Owner of all seats and of the reservation state machine
pub struct SeatRegistry {
    seats: Box<[Seat]>,
    policy: HoldPolicy,
}

impl SeatRegistry {
    /// Create `seat_count` seats with ids `0..seat_count`, all available
    pub fn initialize(seat_count: u32, policy: HoldPolicy) -> Self {
        let seats = (0..seat_count)
            .map(|id| Seat {
                id,
                state: Mutex::new(SeatState::Available),
            })
            .collect();
        info!(seats = seat_count, ?policy, "seat registry initialized");
        Self { seats, policy }
    }

    /// Number of seats
    pub fn len(&self) -> usize {
        self.seats.len()
    }

    /// Whether the registry has no seats at all
    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    /// Status and holder of a seat, or [`None`] for an unknown id
    pub fn inspect(&self, id: SeatId) -> Option<(SeatStatus, Option<CustomerId>)> {
        let state = *self.seat(id)?.state.lock();
        Some((state.status(), state.holder()))
    }

    /// List every seat in id order
    ///
    /// Seats are read one at a time, so the listing may mix states from
    /// before and after operations running concurrently.
    pub fn list_seats(&self) -> Vec<SeatEntry> {
        self.seats
            .iter()
            .map(|seat| SeatEntry {
                id: seat.id,
                status: seat.state.lock().status(),
            })
            .collect()
    }

    /// Place a hold on a seat for `customer`
    pub fn hold(&self, id: SeatId, customer: CustomerId, priority: u32) -> Outcome {
        let Some(seat) = self.seat(id) else {
            return Outcome::NotFound;
        };
        let outcome = {
            let mut state = seat.state.lock();
            let from = state.status();
            match *state {
                SeatState::Occupied(_) => Outcome::AlreadyHeld,
                SeatState::Pending(holder)
                    if holder != customer && self.policy == HoldPolicy::Reject =>
                {
                    Outcome::AlreadyHeld
                }
                SeatState::Available | SeatState::Pending(_) => {
                    *state = SeatState::Pending(customer);
                    Outcome::Confirmed(Transition {
                        seat: id,
                        from,
                        to: SeatStatus::Pending,
                    })
                }
            }
        };
        debug!(seat = id, %customer, priority, ?outcome, "hold");
        outcome
    }

    /// Turn the pending hold of `customer` into a purchase
    pub fn confirm(&self, id: SeatId, customer: CustomerId, priority: u32) -> Outcome {
        let Some(seat) = self.seat(id) else {
            return Outcome::NotFound;
        };
        let outcome = {
            let mut state = seat.state.lock();
            match *state {
                SeatState::Pending(holder) if holder == customer => {
                    *state = SeatState::Occupied(customer);
                    Outcome::Confirmed(Transition {
                        seat: id,
                        from: SeatStatus::Pending,
                        to: SeatStatus::Occupied,
                    })
                }
                other if other.holder() != Some(customer) => Outcome::PermissionDenied,
                _ => Outcome::NoPendingHold,
            }
        };
        debug!(seat = id, %customer, priority, ?outcome, "confirm");
        outcome
    }

    /// Release the pending hold of `customer`
    pub fn cancel(&self, id: SeatId, customer: CustomerId, priority: u32) -> Outcome {
        let Some(seat) = self.seat(id) else {
            return Outcome::NotFound;
        };
        let outcome = {
            let mut state = seat.state.lock();
            match *state {
                SeatState::Pending(holder) if holder == customer => {
                    *state = SeatState::Available;
                    Outcome::Cancelled(Transition {
                        seat: id,
                        from: SeatStatus::Pending,
                        to: SeatStatus::Available,
                    })
                }
                other if other.holder() != Some(customer) => Outcome::PermissionDenied,
                _ => Outcome::NoPendingHold,
            }
        };
        debug!(seat = id, %customer, priority, ?outcome, "cancel");
        outcome
    }

    /// Execute a command
    pub fn apply(&self, command: &Command) -> Response {
        match *command {
            Command::List => Response::Listing(self.list_seats()),
            Command::Hold(rq) => Response::Outcome(
                Operation::Hold,
                self.hold(rq.seat, rq.customer, rq.priority),
            ),
            Command::Confirm(rq) => Response::Outcome(
                Operation::Confirm,
                self.confirm(rq.seat, rq.customer, rq.priority),
            ),
            Command::Cancel(rq) => Response::Outcome(
                Operation::Cancel,
                self.cancel(rq.seat, rq.customer, rq.priority),
            ),
        }
    }

    /// Destroy the registry, logging the final state of the seats
    pub fn teardown(self) {
        let (mut available, mut pending, mut occupied) = (0, 0, 0);
        for entry in self.list_seats() {
            match entry.status {
                SeatStatus::Available => available += 1,
                SeatStatus::Pending => pending += 1,
                SeatStatus::Occupied => occupied += 1,
            }
        }
        info!(available, pending, occupied, "seat registry torn down");
    }

    fn seat(&self, id: SeatId) -> Option<&Seat> {
        self.seats.get(id as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;

    const ALICE: CustomerId = CustomerId(7);
    const BOB: CustomerId = CustomerId(9);

    fn moved(seat: SeatId, from: SeatStatus, to: SeatStatus) -> Transition {
        Transition { seat, from, to }
    }

    #[test]
    fn fresh_registry_lists_every_seat_available() {
        let registry = SeatRegistry::initialize(5, HoldPolicy::Reassign);
        let listing = registry.list_seats();

        assert_eq!(registry.len(), 5);
        assert!(!registry.is_empty());
        assert_eq!(listing.len(), 5);
        for (i, entry) in listing.iter().enumerate() {
            assert_eq!(entry.id as usize, i);
            assert_eq!(entry.status, SeatStatus::Available);
        }

        let empty = SeatRegistry::initialize(0, HoldPolicy::Reassign);
        assert!(empty.is_empty());
        assert!(empty.list_seats().is_empty());
    }

    #[test]
    fn hold_confirm_then_cancel() {
        use SeatStatus::*;
        let registry = SeatRegistry::initialize(3, HoldPolicy::Reassign);

        assert_eq!(
            registry.hold(1, ALICE, 0),
            Outcome::Confirmed(moved(1, Available, Pending))
        );
        assert_eq!(registry.confirm(1, BOB, 0), Outcome::PermissionDenied);
        assert_eq!(
            registry.confirm(1, ALICE, 0),
            Outcome::Confirmed(moved(1, Pending, Occupied))
        );
        assert_eq!(registry.cancel(1, ALICE, 0), Outcome::NoPendingHold);
        assert_eq!(registry.inspect(1), Some((Occupied, Some(ALICE))));
    }

    #[test]
    fn occupied_seats_cannot_be_held() {
        let registry = SeatRegistry::initialize(1, HoldPolicy::Reassign);
        registry.hold(0, ALICE, 0);
        registry.confirm(0, ALICE, 0);

        assert_eq!(registry.hold(0, BOB, 0), Outcome::AlreadyHeld);
        assert_eq!(registry.hold(0, ALICE, 0), Outcome::AlreadyHeld);
        assert_eq!(
            registry.inspect(0),
            Some((SeatStatus::Occupied, Some(ALICE)))
        );
    }

    #[test]
    fn cancel_makes_the_seat_available_again() {
        use SeatStatus::*;
        let registry = SeatRegistry::initialize(2, HoldPolicy::Reassign);
        registry.hold(0, ALICE, 0);

        assert_eq!(
            registry.cancel(0, ALICE, 0),
            Outcome::Cancelled(moved(0, Pending, Available))
        );
        assert_eq!(registry.inspect(0), Some((Available, None)));
        assert_eq!(
            registry.hold(0, BOB, 0),
            Outcome::Confirmed(moved(0, Available, Pending))
        );
    }

    #[test]
    fn strangers_never_change_a_seat() {
        let registry = SeatRegistry::initialize(3, HoldPolicy::Reassign);
        // seat 0 available, seat 1 pending, seat 2 occupied
        registry.hold(1, ALICE, 0);
        registry.hold(2, ALICE, 0);
        registry.confirm(2, ALICE, 0);
        let before: Vec<_> = (0..3).map(|id| registry.inspect(id)).collect();

        for id in 0..3 {
            assert_eq!(registry.confirm(id, BOB, 0), Outcome::PermissionDenied);
            assert_eq!(registry.cancel(id, BOB, 0), Outcome::PermissionDenied);
        }

        let after: Vec<_> = (0..3).map(|id| registry.inspect(id)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn unknown_seats_are_not_found() {
        let registry = SeatRegistry::initialize(3, HoldPolicy::Reassign);
        assert_eq!(registry.hold(3, ALICE, 0), Outcome::NotFound);
        assert_eq!(registry.confirm(u32::MAX, ALICE, 0), Outcome::NotFound);
        assert_eq!(registry.cancel(17, ALICE, 0), Outcome::NotFound);
        assert_eq!(registry.inspect(3), None);
    }

    #[test]
    fn pending_hold_is_reassigned_by_default() {
        use SeatStatus::*;
        let registry = SeatRegistry::initialize(1, HoldPolicy::Reassign);
        registry.hold(0, ALICE, 0);

        assert_eq!(
            registry.hold(0, BOB, 0),
            Outcome::Confirmed(moved(0, Pending, Pending))
        );
        assert_eq!(registry.confirm(0, ALICE, 0), Outcome::PermissionDenied);
        assert_eq!(registry.inspect(0), Some((Pending, Some(BOB))));
    }

    #[test]
    fn pending_hold_is_kept_under_reject_policy() {
        use SeatStatus::*;
        let registry = SeatRegistry::initialize(1, HoldPolicy::Reject);
        registry.hold(0, ALICE, 0);

        assert_eq!(registry.hold(0, BOB, 0), Outcome::AlreadyHeld);
        // the holder may refresh their own hold
        assert_eq!(
            registry.hold(0, ALICE, 0),
            Outcome::Confirmed(moved(0, Pending, Pending))
        );
        assert_eq!(registry.inspect(0), Some((Pending, Some(ALICE))));
    }

    #[test]
    fn racing_holds_admit_exactly_one_customer() {
        const CUSTOMERS: u32 = 32;
        let registry = Arc::new(SeatRegistry::initialize(1, HoldPolicy::Reject));
        let barrier = Arc::new(Barrier::new(CUSTOMERS as usize));

        let handles: Vec<_> = (0..CUSTOMERS)
            .map(|c| {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    registry.hold(0, CustomerId(c), 0)
                })
            })
            .collect();
        let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let winners: Vec<_> = outcomes
            .iter()
            .filter(|o| matches!(o, Outcome::Confirmed(t) if t.from == SeatStatus::Available))
            .collect();
        assert_eq!(winners.len(), 1);
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| **o == Outcome::AlreadyHeld)
                .count(),
            CUSTOMERS as usize - 1
        );
    }

    #[test]
    fn racing_hold_and_confirm_sell_the_seat_once() {
        const CUSTOMERS: u32 = 32;
        let registry = Arc::new(SeatRegistry::initialize(1, HoldPolicy::Reassign));
        let barrier = Arc::new(Barrier::new(CUSTOMERS as usize));

        let handles: Vec<_> = (0..CUSTOMERS)
            .map(|c| {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    registry.hold(0, CustomerId(c), 0);
                    (c, registry.confirm(0, CustomerId(c), 0))
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let buyers: Vec<_> = results
            .iter()
            .filter(|(_, o)| matches!(o, Outcome::Confirmed(_)))
            .map(|(c, _)| CustomerId(*c))
            .collect();
        assert_eq!(buyers.len(), 1);
        assert_eq!(
            registry.inspect(0),
            Some((SeatStatus::Occupied, Some(buyers[0])))
        );
    }

    #[test]
    fn concurrent_traffic_only_makes_legal_transitions() {
        const THREADS: u32 = 8;
        const SEATS: u32 = 4;
        let registry = Arc::new(SeatRegistry::initialize(SEATS, HoldPolicy::Reassign));

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    let customer = CustomerId(t % 3);
                    for i in 0..2_000u32 {
                        let seat = (i * 7 + t) % SEATS;
                        let outcome = match (i + t) % 3 {
                            0 => registry.hold(seat, customer, 0),
                            1 => registry.confirm(seat, customer, 0),
                            _ => registry.cancel(seat, customer, 0),
                        };
                        if let Outcome::Confirmed(change) | Outcome::Cancelled(change) = outcome {
                            let legal = matches!(
                                (change.from, change.to),
                                (SeatStatus::Available, SeatStatus::Pending)
                                    | (SeatStatus::Pending, SeatStatus::Pending)
                                    | (SeatStatus::Pending, SeatStatus::Occupied)
                                    | (SeatStatus::Pending, SeatStatus::Available)
                            );
                            assert!(legal, "illegal transition {change:?}");
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        for id in 0..SEATS {
            match registry.inspect(id) {
                Some((SeatStatus::Available, holder)) => assert_eq!(holder, None),
                Some((_, holder)) => assert!(holder.is_some()),
                None => panic!("seat {id} vanished"),
            }
        }
    }

    #[test]
    fn apply_wraps_outcomes_with_their_operation() {
        use seat_booking_core::SeatRequest;
        let registry = SeatRegistry::initialize(2, HoldPolicy::Reassign);
        let args = SeatRequest {
            seat: 1,
            customer: ALICE,
            priority: 5,
        };

        let response = registry.apply(&Command::Hold(args));
        assert_eq!(response.to_string(), "Confirm seat: 1 A ?");
        let response = registry.apply(&Command::Confirm(args));
        assert_eq!(response.to_string(), "Seat confirmed: 1 P");
        let response = registry.apply(&Command::List);
        assert_eq!(response.to_string(), "0 A,1 O");
    }
}
