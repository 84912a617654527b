use eyre::Result;
use seat_booking_core::{CustomerId, SeatStatus};
use seat_booking_tests::{Reply, SessionState, TestCtxBuilder};

mod util;

#[tokio::test] // Every test function needs to be decorated with this attribute
#[ntest::timeout(20_000)] // Test timeout in ms
async fn test_example() -> Result<()> {
    // Create a test context with 3 seats
    let ctx = TestCtxBuilder::new().with_seats(3).build().await?;

    let mut alice = ctx.api.create_user_session_for(CustomerId(7));
    let mut bob = ctx.api.create_user_session_for(CustomerId(9));

    assert_eq!(
        alice.view_seat(1).await?.result?,
        Reply::HoldOffered {
            seat: 1,
            previous: SeatStatus::Available
        },
        "An available seat must be held for the first customer asking."
    );
    assert_eq!(
        ctx.seat(1),
        Some((SeatStatus::Pending, Some(CustomerId(7))))
    );
    assert!(matches!(alice.state, SessionState::Holding(1)));

    assert_eq!(
        bob.confirm(1).await?.result?,
        Reply::PermissionDenied,
        "Only the holder may confirm a seat."
    );
    assert_eq!(
        alice.confirm(1).await?.result?,
        Reply::Confirmed {
            seat: 1,
            previous: SeatStatus::Pending
        }
    );
    assert!(matches!(alice.state, SessionState::Bought(1)));
    assert!(matches!(bob.state, SessionState::None));
    assert_eq!(
        alice.cancel(1).await?.result?,
        Reply::NoPendingRequest,
        "A sold seat cannot be cancelled."
    );
    assert!(matches!(alice.state, SessionState::Bought(1)));

    assert_eq!(
        util::statuses(&ctx).await?,
        [
            SeatStatus::Available,
            SeatStatus::Occupied,
            SeatStatus::Available
        ]
    );

    // Finish the test
    ctx.finish().await;
    Ok(())
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_buy_every_seat() -> Result<()> {
    let ctx = TestCtxBuilder::new()
        .with_seats(100)
        .with_acceptor_threads(4)
        .build()
        .await?;

    for seat in 0..100 {
        let mut session = ctx.api.create_user_session_for(CustomerId(seat));
        util::buy(&mut session, seat).await?;
    }
    assert!(util::statuses(&ctx)
        .await?
        .iter()
        .all(|status| *status == SeatStatus::Occupied));

    let mut late = ctx.api.create_user_session_for(CustomerId(1_000));
    assert_eq!(late.view_seat(42).await?.result?, Reply::Unavailable);

    ctx.finish().await;
    Ok(())
}
