mod common;

use common::*;
use hostel_booking_core::domain::{BookingStatus, BookingType, Caller, PaymentStatus, Role};
use hostel_booking_core::error::BookingError;
use hostel_booking_core::services::CreateBookingInput;
use uuid::Uuid;

#[tokio::test]
async fn test_daily_booking_is_priced_and_left_pending() {
    let h = Harness::new();
    let room = h.standard_room().await;

    let booking = h.pending_booking(&room, 1).await;

    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.booking_type, BookingType::Daily);
    assert_eq!(booking.base_amount, money("2400.00"));
    assert_eq!(booking.security_deposit, money("5000.00"));
    assert_eq!(booking.total_amount, money("7400.00"));
    assert_eq!(h.room(room.id).await.current_occupancy, 0);
}

#[tokio::test]
async fn test_monthly_booking_is_prorated() {
    let h = Harness::new();
    let room = h.standard_room().await;

    let booking = h
        .bookings
        .create_booking(
            &guest(),
            CreateBookingInput {
                booking_type: "monthly".to_string(),
                check_in_date: date(2024, 6, 1),
                check_out_date: date(2024, 6, 16),
                ..daily_input(room.id, 1)
            },
        )
        .await
        .unwrap();

    assert_eq!(booking.base_amount, money("7500.00"));
    assert_eq!(booking.total_amount, money("12500.00"));
}

#[tokio::test]
async fn test_special_requests_are_trimmed() {
    let h = Harness::new();
    let room = h.standard_room().await;

    let booking = h
        .bookings
        .create_booking(
            &guest(),
            CreateBookingInput {
                special_requests: Some("  lower bunk please  ".to_string()),
                ..daily_input(room.id, 1)
            },
        )
        .await
        .unwrap();

    assert_eq!(booking.special_requests, "lower bunk please");
}

#[tokio::test]
async fn test_special_requests_keep_word_breaks() {
    let h = Harness::new();
    let room = h.standard_room().await;

    let booking = h
        .bookings
        .create_booking(
            &guest(),
            CreateBookingInput {
                special_requests: Some("late\tcheck-in\n2 beds\r\nnear window\u{0007}".to_string()),
                ..daily_input(room.id, 1)
            },
        )
        .await
        .unwrap();

    assert_eq!(booking.special_requests, "late check-in 2 beds near window");
}

#[tokio::test]
async fn test_large_group_limited_only_by_capacity() {
    let h = Harness::new();
    let dorm = h.room_with(60, 0).await;

    let booking = h
        .bookings
        .create_booking(&guest(), daily_input(dorm.id, 60))
        .await
        .unwrap();
    assert_eq!(booking.guests, 60);

    let err = h
        .bookings
        .create_booking(&guest(), daily_input(dorm.id, 61))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::RoomUnavailable { .. }));
}

#[tokio::test]
async fn test_only_users_may_book() {
    let h = Harness::new();
    let room = h.standard_room().await;

    for role in [Role::Owner, Role::Admin] {
        let caller = Caller::new(Uuid::new_v4(), role);
        let err = h
            .bookings
            .create_booking(&caller, daily_input(room.id, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::NotPermitted(r) if r == role));
    }
}

#[tokio::test]
async fn test_booking_rejected_when_room_lacks_spots() {
    let h = Harness::new();
    let room = h.room_with(4, 3).await;

    let err = h
        .bookings
        .create_booking(&guest(), daily_input(room.id, 2))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BookingError::RoomUnavailable {
            requested: 2,
            available: 1,
            ..
        }
    ));
}

#[tokio::test]
async fn test_booking_rejected_for_invalid_dates() {
    let h = Harness::new();
    let room = h.standard_room().await;

    let err = h
        .bookings
        .create_booking(
            &guest(),
            CreateBookingInput {
                check_in_date: date(2024, 6, 4),
                check_out_date: date(2024, 6, 4),
                ..daily_input(room.id, 1)
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::InvalidBookingRequest(_)));
}

#[tokio::test]
async fn test_booking_rejected_for_unknown_type_and_bad_guests() {
    let h = Harness::new();
    let room = h.standard_room().await;

    let err = h
        .bookings
        .create_booking(
            &guest(),
            CreateBookingInput {
                booking_type: "weekly".to_string(),
                ..daily_input(room.id, 1)
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::InvalidBookingRequest(_)));

    let err = h
        .bookings
        .create_booking(&guest(), daily_input(room.id, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)));
}

#[tokio::test]
async fn test_booking_unknown_room() {
    let h = Harness::new();

    let err = h
        .bookings
        .create_booking(&guest(), daily_input(Uuid::new_v4(), 1))
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::NotFound(_)));
}

#[tokio::test]
async fn test_cancel_pending_booking_invalidates_open_payment() {
    let h = Harness::new();
    let room = h.standard_room().await;
    let (booking, _) = h.booking_with_order(&room, 1).await;

    let cancellation = h.bookings.cancel(booking.id).await.unwrap();

    assert_eq!(cancellation.booking.status, BookingStatus::Cancelled);
    assert_eq!(cancellation.room.current_occupancy, 0);
    let payment = cancellation.payment.unwrap();
    assert_eq!(payment.status, PaymentStatus::Failed);
    assert_eq!(payment.failure_reason.as_deref(), Some("booking cancelled"));
}

#[tokio::test]
async fn test_cancel_confirmed_booking_releases_spots() {
    let h = Harness::new();
    let room = h.room_with(4, 1).await;
    let (booking, order_id) = h.booking_with_order(&room, 2).await;
    h.reconciliation
        .confirm(&signed(&order_id, "pay_1"))
        .await
        .unwrap();
    assert_eq!(h.room(room.id).await.current_occupancy, 3);

    let cancellation = h.bookings.cancel(booking.id).await.unwrap();

    assert_eq!(cancellation.booking.status, BookingStatus::Cancelled);
    assert_eq!(cancellation.room.current_occupancy, 1);
    assert_eq!(h.room(room.id).await.current_occupancy, 1);
    // A captured payment is kept as is; refunds happen outside this service.
    assert_eq!(cancellation.payment.unwrap().status, PaymentStatus::Completed);
}

#[tokio::test]
async fn test_cancel_twice_is_rejected() {
    let h = Harness::new();
    let room = h.standard_room().await;
    let booking = h.pending_booking(&room, 1).await;

    h.bookings.cancel(booking.id).await.unwrap();
    let err = h.bookings.cancel(booking.id).await.unwrap_err();

    assert!(matches!(
        err,
        BookingError::InvalidTransition {
            status: BookingStatus::Cancelled,
            ..
        }
    ));
}

#[tokio::test]
async fn test_complete_requires_confirmed_booking() {
    let h = Harness::new();
    let room = h.standard_room().await;
    let (booking, order_id) = h.booking_with_order(&room, 2).await;

    let err = h.bookings.complete(booking.id).await.unwrap_err();
    assert!(matches!(err, BookingError::InvalidTransition { .. }));

    h.reconciliation
        .confirm(&signed(&order_id, "pay_1"))
        .await
        .unwrap();
    let completed = h.bookings.complete(booking.id).await.unwrap();

    assert_eq!(completed.status, BookingStatus::Completed);
    assert_eq!(h.room(room.id).await.current_occupancy, 2);

    let err = h.bookings.cancel(booking.id).await.unwrap_err();
    assert!(matches!(err, BookingError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_operations_on_missing_booking() {
    let h = Harness::new();
    let id = Uuid::new_v4();

    assert!(matches!(
        h.bookings.cancel(id).await,
        Err(BookingError::NotFound(_))
    ));
    assert!(matches!(
        h.bookings.complete(id).await,
        Err(BookingError::NotFound(_))
    ));
    assert!(matches!(
        h.bookings.get_booking(id).await,
        Err(BookingError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_list_bookings_is_scoped_and_newest_first() {
    let h = Harness::new();
    let room = h.standard_room().await;
    let caller = guest();

    let first = h
        .bookings
        .create_booking(&caller, daily_input(room.id, 1))
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = h
        .bookings
        .create_booking(&caller, daily_input(room.id, 1))
        .await
        .unwrap();
    h.pending_booking(&room, 1).await;

    let listed = h.bookings.list_bookings(caller.user_id).await.unwrap();

    let ids: Vec<Uuid> = listed.iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
}
