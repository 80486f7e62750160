//! Multi-entity state transitions.
//!
//! Each function takes working copies of every row it touches, validates the whole
//! transition before mutating anything, and reports what happened. Stores load the
//! rows under lock, call one of these, and persist the copies only on `Ok`, which
//! is what makes each operation all-or-nothing.

use chrono::{DateTime, Utc};

use crate::domain::{Booking, BookingStatus, Payment, PaymentConfirmation, PaymentStatus, Room};
use crate::error::BookingError;

pub const CANCELLED_BOOKING_REASON: &str = "booking cancelled";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Payment completed, booking confirmed, occupancy committed.
    Applied,
    /// Same confirmation was already applied; nothing changed.
    Replayed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderAttachment {
    /// A new payment row must be inserted.
    Inserted(Payment),
    /// The existing failed payment was reopened with a new order id. The previous
    /// order id stays bound to the payment.
    Reopened,
    /// An open order already exists; the caller's order id was not used.
    Existing,
}

fn ensure_transition(
    booking: &Booking,
    next: BookingStatus,
    action: &'static str,
) -> Result<(), BookingError> {
    if booking.status.can_transition_to(next) {
        Ok(())
    } else {
        Err(BookingError::InvalidTransition {
            booking_id: booking.id,
            status: booking.status,
            action,
        })
    }
}

/// Applies a verified gateway confirmation.
///
/// The confirmation may name an order the payment has since moved past (a late
/// capture after a reopen). The charge is real either way, so the payment is bound
/// back to the order that was paid.
pub fn reconcile(
    payment: &mut Payment,
    booking: &mut Booking,
    room: &mut Room,
    confirmation: &PaymentConfirmation,
    now: DateTime<Utc>,
) -> Result<ReconcileOutcome, BookingError> {
    if payment.status == PaymentStatus::Completed {
        return if payment.payment_id.as_deref() == Some(confirmation.payment_id.as_str()) {
            Ok(ReconcileOutcome::Replayed)
        } else {
            Err(BookingError::AlreadyConfirmed(payment.order_id.clone()))
        };
    }

    ensure_transition(booking, BookingStatus::Confirmed, "confirm")?;
    room.admit(booking.guests)?;

    payment.order_id = confirmation.order_id.clone();
    payment.status = PaymentStatus::Completed;
    payment.payment_id = Some(confirmation.payment_id.clone());
    payment.signature = Some(confirmation.signature.clone());
    payment.failure_reason = None;
    payment.updated_at = now;

    booking.status = BookingStatus::Confirmed;
    booking.updated_at = now;

    Ok(ReconcileOutcome::Applied)
}

/// Cancels a pending or confirmed booking. A confirmed booking gives its spots back;
/// an uncompleted payment is invalidated alongside.
pub fn cancel(
    booking: &mut Booking,
    room: &mut Room,
    payment: Option<&mut Payment>,
    now: DateTime<Utc>,
) -> Result<(), BookingError> {
    ensure_transition(booking, BookingStatus::Cancelled, "cancel")?;

    if booking.status == BookingStatus::Confirmed {
        room.release(booking.guests);
    }

    booking.status = BookingStatus::Cancelled;
    booking.updated_at = now;

    if let Some(payment) = payment {
        if payment.status != PaymentStatus::Completed {
            payment.status = PaymentStatus::Failed;
            payment.failure_reason = Some(CANCELLED_BOOKING_REASON.to_string());
            payment.updated_at = now;
        }
    }

    Ok(())
}

/// Marks a confirmed stay as finished. Occupancy is released by checkout, not here.
pub fn complete(booking: &mut Booking, now: DateTime<Utc>) -> Result<(), BookingError> {
    ensure_transition(booking, BookingStatus::Completed, "complete")?;
    booking.status = BookingStatus::Completed;
    booking.updated_at = now;
    Ok(())
}

/// Records a gateway-reported failure. Returns `false` when there is nothing to record:
/// the failure was already recorded, or it names an order the payment has moved past.
pub fn fail(
    payment: &mut Payment,
    order_id: &str,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<bool, BookingError> {
    if payment.order_id != order_id {
        return Ok(false);
    }
    match payment.status {
        PaymentStatus::Completed => Err(BookingError::AlreadyConfirmed(payment.order_id.clone())),
        PaymentStatus::Failed => Ok(false),
        PaymentStatus::Created => {
            payment.status = PaymentStatus::Failed;
            payment.failure_reason = Some(reason.to_string());
            payment.updated_at = now;
            Ok(true)
        }
    }
}

/// Binds a freshly opened gateway order to a pending booking.
pub fn attach_order(
    booking: &Booking,
    existing: Option<&mut Payment>,
    order_id: &str,
    currency: &str,
    now: DateTime<Utc>,
) -> Result<OrderAttachment, BookingError> {
    if booking.status != BookingStatus::Pending {
        return Err(BookingError::InvalidTransition {
            booking_id: booking.id,
            status: booking.status,
            action: "open an order for",
        });
    }

    match existing {
        None => Ok(OrderAttachment::Inserted(Payment::new(
            booking.id,
            order_id.to_string(),
            booking.total_amount.clone(),
            currency.to_string(),
        ))),
        Some(payment) => match payment.status {
            PaymentStatus::Created => Ok(OrderAttachment::Existing),
            PaymentStatus::Completed => {
                Err(BookingError::AlreadyConfirmed(payment.order_id.clone()))
            }
            PaymentStatus::Failed => {
                payment.order_id = order_id.to_string();
                payment.amount = booking.total_amount.clone();
                payment.currency = currency.to_string();
                payment.status = PaymentStatus::Created;
                payment.payment_id = None;
                payment.signature = None;
                payment.failure_reason = None;
                payment.updated_at = now;
                Ok(OrderAttachment::Reopened)
            }
        },
    }
}
