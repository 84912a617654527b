use std::fmt;

/// Identifier of a seat, stable for the lifetime of the registry
pub type SeatId = u32;

/// Opaque identifier of a customer
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct CustomerId(pub u32);

impl From<u32> for CustomerId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Reservation state of a seat as seen from the outside
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum SeatStatus {
    /// Free to be held
    Available,
    /// Held by a customer, awaiting confirmation or cancellation
    Pending,
    /// Sold
    Occupied,
}

impl SeatStatus {
    /// Single-letter code used on the wire
    pub fn as_char(self) -> char {
        match self {
            SeatStatus::Available => 'A',
            SeatStatus::Pending => 'P',
            SeatStatus::Occupied => 'O',
        }
    }

    /// Inverse of [`Self::as_char()`]
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'A' => Some(SeatStatus::Available),
            'P' => Some(SeatStatus::Pending),
            'O' => Some(SeatStatus::Occupied),
            _ => None,
        }
    }
}

/// One line of a seat listing
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SeatEntry {
    /// The seat
    pub id: SeatId,
    /// Its state at the time it was read
    pub status: SeatStatus,
}

impl fmt::Display for SeatEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.status.as_char())
    }
}
