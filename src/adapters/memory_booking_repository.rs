//! In-process implementation of BookingRepository.
//! All tables sit behind one async mutex, so every multi-row operation is serialized.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::lifecycle::{self, OrderAttachment, ReconcileOutcome};
use crate::domain::{Booking, Payment, PaymentConfirmation, Room};
use crate::error::BookingError;
use crate::ports::{
    BookingRepository, Cancellation, Confirmation, RepositoryError, RepositoryResult,
};

#[derive(Default)]
struct Tables {
    rooms: HashMap<Uuid, Room>,
    bookings: HashMap<Uuid, Booking>,
    payments: HashMap<Uuid, Payment>,
    /// Every order id ever bound, to the payment it belongs to.
    orders: HashMap<String, Uuid>,
}

impl Tables {
    fn room(&self, id: Uuid) -> RepositoryResult<&Room> {
        self.rooms
            .get(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("room {}", id)))
    }

    fn booking(&self, id: Uuid) -> RepositoryResult<&Booking> {
        self.bookings
            .get(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("booking {}", id)))
    }

    fn payment_by_order(&self, order_id: &str) -> Option<&Payment> {
        self.orders
            .get(order_id)
            .and_then(|payment_id| self.payments.get(payment_id))
    }

    fn payment_for_booking(&self, booking_id: Uuid) -> Option<&Payment> {
        self.payments.values().find(|p| p.booking_id == booking_id)
    }

    /// Stores the payment under its current order id. Order ids are never reused.
    fn bind_order(&mut self, payment: &Payment) -> RepositoryResult<()> {
        if self.orders.contains_key(&payment.order_id) {
            return Err(RepositoryError::Conflict(format!("order {}", payment.order_id)));
        }
        self.orders.insert(payment.order_id.clone(), payment.id);
        self.payments.insert(payment.id, payment.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryBookingRepository {
    tables: Mutex<Tables>,
}

impl InMemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn ping(&self) -> RepositoryResult<()> {
        Ok(())
    }

    async fn insert_room(&self, room: &Room) -> RepositoryResult<Room> {
        let mut tables = self.tables.lock().await;
        if tables.rooms.contains_key(&room.id) {
            return Err(RepositoryError::Conflict(format!("room {}", room.id)));
        }
        tables.rooms.insert(room.id, room.clone());
        Ok(room.clone())
    }

    async fn get_room(&self, id: Uuid) -> RepositoryResult<Room> {
        self.tables.lock().await.room(id).cloned()
    }

    async fn insert_booking(&self, booking: &Booking) -> RepositoryResult<Booking> {
        let mut tables = self.tables.lock().await;
        tables.room(booking.room_id)?;
        if tables.bookings.contains_key(&booking.id) {
            return Err(RepositoryError::Conflict(format!("booking {}", booking.id)));
        }
        tables.bookings.insert(booking.id, booking.clone());
        Ok(booking.clone())
    }

    async fn get_booking(&self, id: Uuid) -> RepositoryResult<Booking> {
        self.tables.lock().await.booking(id).cloned()
    }

    async fn list_bookings_for_user(&self, user_id: Uuid) -> RepositoryResult<Vec<Booking>> {
        let tables = self.tables.lock().await;
        let mut bookings: Vec<Booking> = tables
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn find_payment_by_order(&self, order_id: &str) -> RepositoryResult<Option<Payment>> {
        Ok(self.tables.lock().await.payment_by_order(order_id).cloned())
    }

    async fn find_payment_for_booking(&self, booking_id: Uuid) -> RepositoryResult<Option<Payment>> {
        Ok(self.tables.lock().await.payment_for_booking(booking_id).cloned())
    }

    async fn attach_order(
        &self,
        booking_id: Uuid,
        order_id: &str,
        currency: &str,
    ) -> Result<Payment, BookingError> {
        let mut tables = self.tables.lock().await;
        let booking = tables.booking(booking_id)?.clone();
        let mut existing = tables.payment_for_booking(booking_id).cloned();

        match lifecycle::attach_order(&booking, existing.as_mut(), order_id, currency, Utc::now())? {
            OrderAttachment::Inserted(payment) => {
                tables.bind_order(&payment)?;
                Ok(payment)
            }
            OrderAttachment::Reopened => {
                let payment = existing.ok_or_else(|| {
                    RepositoryError::NotFound(format!("payment for booking {}", booking_id))
                })?;
                tables.bind_order(&payment)?;
                Ok(payment)
            }
            OrderAttachment::Existing => Ok(existing.ok_or_else(|| {
                RepositoryError::NotFound(format!("payment for booking {}", booking_id))
            })?),
        }
    }

    async fn apply_confirmation(
        &self,
        confirmation: &PaymentConfirmation,
    ) -> Result<Confirmation, BookingError> {
        let mut tables = self.tables.lock().await;
        let mut payment = tables
            .payment_by_order(&confirmation.order_id)
            .cloned()
            .ok_or_else(|| BookingError::UnknownOrder(confirmation.order_id.clone()))?;
        let mut booking = tables.booking(payment.booking_id)?.clone();
        let mut room = tables.room(booking.room_id)?.clone();

        let outcome =
            lifecycle::reconcile(&mut payment, &mut booking, &mut room, confirmation, Utc::now())?;

        if outcome == ReconcileOutcome::Applied {
            tables.payments.insert(payment.id, payment.clone());
            tables.bookings.insert(booking.id, booking.clone());
            tables.rooms.insert(room.id, room.clone());
        }

        Ok(Confirmation {
            outcome,
            booking,
            payment,
            room,
        })
    }

    async fn cancel_booking(&self, booking_id: Uuid) -> Result<Cancellation, BookingError> {
        let mut tables = self.tables.lock().await;
        let mut booking = tables.booking(booking_id)?.clone();
        let mut room = tables.room(booking.room_id)?.clone();
        let mut payment = tables.payment_for_booking(booking_id).cloned();

        lifecycle::cancel(&mut booking, &mut room, payment.as_mut(), Utc::now())?;

        tables.bookings.insert(booking.id, booking.clone());
        tables.rooms.insert(room.id, room.clone());
        if let Some(payment) = &payment {
            tables.payments.insert(payment.id, payment.clone());
        }

        Ok(Cancellation {
            booking,
            room,
            payment,
        })
    }

    async fn complete_booking(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        let mut tables = self.tables.lock().await;
        let mut booking = tables.booking(booking_id)?.clone();
        lifecycle::complete(&mut booking, Utc::now())?;
        tables.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn fail_payment(&self, order_id: &str, reason: &str) -> Result<Payment, BookingError> {
        let mut tables = self.tables.lock().await;
        let mut payment = tables
            .payment_by_order(order_id)
            .cloned()
            .ok_or_else(|| BookingError::UnknownOrder(order_id.to_string()))?;

        if lifecycle::fail(&mut payment, order_id, reason, Utc::now())? {
            tables.payments.insert(payment.id, payment.clone());
        }
        Ok(payment)
    }
}
