use std::{str::FromStr, sync::Arc};

use eyre::{eyre, Result};
use flume::Sender;
use nanorand::Rng;
use seat_booking_core::{CustomerId, Operation, SeatEntry, SeatId, SeatStatus};
use thiserror::Error;
use tokio::sync::oneshot;

pub mod mock;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Error 400: {0}")]
    BadRequest(String),
    #[error("Error 503: {0}")]
    Unavailable(String),
    #[error("Error 500: {0}")]
    Failure(String),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
enum Response {
    Text(String),
    Error(ApiError),
}

struct RequestMsg {
    operation: Operation,
    seat: Option<SeatId>,
    customer: Option<CustomerId>,
    priority: Option<u32>,
    response_channel: oneshot::Sender<Response>,
}

pub struct Api {
    /// One channel per acceptor thread
    channels: Arc<Vec<Sender<RequestMsg>>>,

    my_channel: Sender<RequestMsg>,
    my_index: usize,
}

impl Api {
    fn new(channels: Vec<Sender<RequestMsg>>) -> Self {
        let my_channel = channels[0].clone();
        Self {
            channels: Arc::new(channels),
            my_channel,
            my_index: 0,
        }
    }
}

impl Clone for Api {
    fn clone(&self) -> Self {
        let my_index = (self.my_index + 1) % self.channels.len();
        Self {
            channels: self.channels.clone(),
            my_channel: self.channels[my_index].clone(),
            my_index,
        }
    }
}

impl Api {
    /// Send a request with arbitrary (possibly missing) arguments
    pub async fn request(
        &self,
        operation: Operation,
        seat: Option<SeatId>,
        customer: Option<CustomerId>,
        priority: Option<u32>,
    ) -> Result<ApiResponse<Reply>> {
        let (sender, receiver) = oneshot::channel();
        let msg = RequestMsg {
            operation,
            seat,
            customer,
            priority,
            response_channel: sender,
        };
        self.my_channel.send_async(msg).await?;
        let result = match receiver.await? {
            Response::Text(text) => Ok(text.parse()?),
            Response::Error(err) => Err(err),
        };
        Ok(ApiResponse { customer, result })
    }

    pub async fn list_seats(&self) -> Result<ApiResponse<Reply>> {
        self.request(Operation::List, None, None, None).await
    }

    pub async fn view_seat(
        &self,
        seat: SeatId,
        customer: CustomerId,
        priority: u32,
    ) -> Result<ApiResponse<Reply>> {
        self.request(Operation::Hold, Some(seat), Some(customer), Some(priority))
            .await
    }

    pub async fn confirm(
        &self,
        seat: SeatId,
        customer: CustomerId,
        priority: u32,
    ) -> Result<ApiResponse<Reply>> {
        self.request(Operation::Confirm, Some(seat), Some(customer), Some(priority))
            .await
    }

    pub async fn cancel(
        &self,
        seat: SeatId,
        customer: CustomerId,
        priority: u32,
    ) -> Result<ApiResponse<Reply>> {
        self.request(Operation::Cancel, Some(seat), Some(customer), Some(priority))
            .await
    }

    /// Create a session for a random customer
    pub fn create_user_session(&self) -> UserSession {
        let customer = CustomerId(nanorand::tls_rng().generate());
        self.create_user_session_for(customer)
    }

    pub fn create_user_session_for(&self, customer: CustomerId) -> UserSession {
        UserSession {
            api: self,
            customer,
            priority: 0,
            state: SessionState::None,
        }
    }
}

pub struct ApiResponse<T> {
    pub customer: Option<CustomerId>,
    pub result: ApiResult<T>,
}

/// A successful answer, parsed from its text
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Reply {
    Listing(Vec<SeatEntry>),
    /// The seat is now held; `previous` is its state before the hold
    HoldOffered { seat: SeatId, previous: SeatStatus },
    Confirmed { seat: SeatId, previous: SeatStatus },
    Cancelled { seat: SeatId, previous: SeatStatus },
    Unavailable,
    NotFound,
    PermissionDenied,
    NoPendingRequest,
}

impl Reply {
    pub fn listing(self) -> Result<Vec<SeatEntry>> {
        match self {
            Reply::Listing(seats) => Ok(seats),
            reply => Err(eyre!("expected a seat listing, got {reply:?}")),
        }
    }

    pub fn held(&self) -> Result<SeatId> {
        match *self {
            Reply::HoldOffered { seat, .. } => Ok(seat),
            ref reply => Err(eyre!("holding the seat failed: {reply:?}")),
        }
    }
}

fn parse_entry(s: &str) -> Result<SeatEntry> {
    let (id, status) = s
        .split_once(' ')
        .ok_or_else(|| eyre!("malformed seat entry {s:?}"))?;
    let mut chars = status.chars();
    let status = match (chars.next(), chars.next()) {
        (Some(c), None) => SeatStatus::from_char(c),
        _ => None,
    }
    .ok_or_else(|| eyre!("malformed seat status in {s:?}"))?;
    Ok(SeatEntry {
        id: id.parse()?,
        status,
    })
}

impl FromStr for Reply {
    type Err = eyre::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix("Confirm seat: ") {
            let entry = parse_entry(
                rest.strip_suffix(" ?")
                    .ok_or_else(|| eyre!("malformed hold reply {s:?}"))?,
            )?;
            return Ok(Reply::HoldOffered {
                seat: entry.id,
                previous: entry.status,
            });
        }
        if let Some(rest) = s.strip_prefix("Seat confirmed: ") {
            let entry = parse_entry(rest)?;
            return Ok(Reply::Confirmed {
                seat: entry.id,
                previous: entry.status,
            });
        }
        if let Some(rest) = s.strip_prefix("Seat request cancelled: ") {
            let entry = parse_entry(rest)?;
            return Ok(Reply::Cancelled {
                seat: entry.id,
                previous: entry.status,
            });
        }
        match s {
            "No seats found" => Ok(Reply::Listing(Vec::new())),
            "Seat unavailable" => Ok(Reply::Unavailable),
            "Requested seat not found" => Ok(Reply::NotFound),
            "Permission denied - seat held by another user" => Ok(Reply::PermissionDenied),
            "No pending request" => Ok(Reply::NoPendingRequest),
            listing => Ok(Reply::Listing(
                listing
                    .split(',')
                    .map(parse_entry)
                    .collect::<Result<_>>()?,
            )),
        }
    }
}

pub enum SessionState {
    None,
    Holding(SeatId),
    Bought(SeatId),
}

pub struct UserSession<'a> {
    pub api: &'a Api,
    pub customer: CustomerId,
    pub priority: u32,
    pub state: SessionState,
}

impl<'a> UserSession<'a> {
    pub async fn view_seat(&mut self, seat: SeatId) -> Result<ApiResponse<Reply>> {
        let response = self.api.view_seat(seat, self.customer, self.priority).await?;
        if let Ok(Reply::HoldOffered { seat, .. }) = &response.result {
            self.state = SessionState::Holding(*seat);
        }
        Ok(response)
    }

    pub async fn confirm(&mut self, seat: SeatId) -> Result<ApiResponse<Reply>> {
        let response = self.api.confirm(seat, self.customer, self.priority).await?;
        if let Ok(Reply::Confirmed { seat, .. }) = &response.result {
            self.state = SessionState::Bought(*seat);
        }
        Ok(response)
    }

    pub async fn cancel(&mut self, seat: SeatId) -> Result<ApiResponse<Reply>> {
        let response = self.api.cancel(seat, self.customer, self.priority).await?;
        if let Ok(Reply::Cancelled { .. }) = &response.result {
            self.state = SessionState::None;
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replies_parse() {
        assert_eq!(
            "0 A,1 P,2 O".parse::<Reply>().unwrap(),
            Reply::Listing(vec![
                SeatEntry {
                    id: 0,
                    status: SeatStatus::Available
                },
                SeatEntry {
                    id: 1,
                    status: SeatStatus::Pending
                },
                SeatEntry {
                    id: 2,
                    status: SeatStatus::Occupied
                },
            ])
        );
        assert_eq!(
            "Confirm seat: 3 A ?\n".parse::<Reply>().unwrap(),
            Reply::HoldOffered {
                seat: 3,
                previous: SeatStatus::Available
            }
        );
        assert_eq!(
            "Seat confirmed: 3 P".parse::<Reply>().unwrap(),
            Reply::Confirmed {
                seat: 3,
                previous: SeatStatus::Pending
            }
        );
        assert_eq!(
            "No seats found".parse::<Reply>().unwrap(),
            Reply::Listing(Vec::new())
        );
        assert!("0 X".parse::<Reply>().is_err());
        assert!("Confirm seat: 3 A".parse::<Reply>().is_err());
    }
}
