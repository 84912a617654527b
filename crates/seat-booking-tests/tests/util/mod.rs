use eyre::{eyre, Result};
use seat_booking_core::{SeatId, SeatStatus};
use seat_booking_tests::{Reply, TestCtx, UserSession};

/// Holds and confirms `seat`, failing the test if either step is refused.
#[allow(unused)]
pub async fn buy(session: &mut UserSession<'_>, seat: SeatId) -> Result<()> {
    let offered = session.view_seat(seat).await?.result?;
    assert_eq!(
        offered.held()?,
        seat,
        "Holding seat {seat} must hold exactly that seat."
    );
    match session.confirm(seat).await?.result? {
        Reply::Confirmed { seat: s, previous } if s == seat => {
            assert_eq!(previous, SeatStatus::Pending);
            Ok(())
        }
        reply => Err(eyre!("confirming seat {seat} failed: {reply:?}")),
    }
}

/// The state of every seat as reported by `list_seats`.
#[allow(unused)]
pub async fn statuses(ctx: &TestCtx) -> Result<Vec<SeatStatus>> {
    let seats = ctx.api.list_seats().await?.result?.listing()?;
    assert_eq!(
        seats.len(),
        ctx.seats as usize,
        "The listing must contain every seat."
    );
    for (i, entry) in seats.iter().enumerate() {
        assert_eq!(entry.id as usize, i, "The listing must be ordered by seat id.");
    }
    Ok(seats.into_iter().map(|entry| entry.status).collect())
}
