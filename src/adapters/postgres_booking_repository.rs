//! Postgres implementation of BookingRepository.
//!
//! Multi-row operations run in one transaction and lock rows with `FOR UPDATE` in a
//! fixed order (booking, payment, room) so concurrent confirmations and cancellations
//! serialize on the room without deadlocking.
//!
//! Order ids resolve through `payment_orders`, which keeps every order a payment
//! has had, not only the current one.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::lifecycle::{self, OrderAttachment, ReconcileOutcome};
use crate::domain::{Booking, Payment, PaymentConfirmation, Room};
use crate::error::BookingError;
use crate::ports::{
    BookingRepository, Cancellation, Confirmation, RepositoryError, RepositoryResult,
};

const ROOM_COLUMNS: &str = "id, property_id, room_number, room_type, capacity, current_occupancy, \
     daily_rate, monthly_rate, security_deposit, is_available, created_at";

const BOOKING_COLUMNS: &str = "id, user_id, room_id, booking_type, check_in_date, check_out_date, \
     guests, special_requests, base_amount, security_deposit, total_amount, status, \
     created_at, updated_at";

const PAYMENT_COLUMNS: &str = "id, booking_id, order_id, payment_id, signature, amount, currency, \
     status, failure_reason, created_at, updated_at";

/// Postgres-backed booking repository.
#[derive(Clone)]
pub struct PostgresBookingRepository {
    pool: PgPool,
}

impl PostgresBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> RepositoryResult<Transaction<'_, Postgres>> {
        self.pool.begin().await.map_err(RepositoryError::from)
    }
}

fn map_insert_error(err: sqlx::Error, what: String) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::Conflict(what),
        _ => RepositoryError::from(err),
    }
}

async fn lock_booking(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> RepositoryResult<Booking> {
    let row = sqlx::query_as::<_, BookingRow>(&format!(
        "SELECT {} FROM bookings WHERE id = $1 FOR UPDATE",
        BOOKING_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?;

    row.ok_or_else(|| RepositoryError::NotFound(format!("booking {}", id)))?
        .into_domain()
}

async fn lock_room(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> RepositoryResult<Room> {
    let row = sqlx::query_as::<_, RoomRow>(&format!(
        "SELECT {} FROM rooms WHERE id = $1 FOR UPDATE",
        ROOM_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?;

    row.ok_or_else(|| RepositoryError::NotFound(format!("room {}", id)))?
        .into_domain()
}

async fn lock_payment_for_booking(
    tx: &mut Transaction<'_, Postgres>,
    booking_id: Uuid,
) -> RepositoryResult<Option<Payment>> {
    let row = sqlx::query_as::<_, PaymentRow>(&format!(
        "SELECT {} FROM payments WHERE booking_id = $1 FOR UPDATE",
        PAYMENT_COLUMNS
    ))
    .bind(booking_id)
    .fetch_optional(&mut **tx)
    .await?;

    row.map(PaymentRow::into_domain).transpose()
}

async fn write_booking_status(
    tx: &mut Transaction<'_, Postgres>,
    booking: &Booking,
) -> RepositoryResult<()> {
    sqlx::query("UPDATE bookings SET status = $1, updated_at = $2 WHERE id = $3")
        .bind(booking.status.as_str())
        .bind(booking.updated_at)
        .bind(booking.id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn write_room_occupancy(
    tx: &mut Transaction<'_, Postgres>,
    room: &Room,
) -> RepositoryResult<()> {
    sqlx::query("UPDATE rooms SET current_occupancy = $1 WHERE id = $2")
        .bind(room.current_occupancy)
        .bind(room.id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn write_payment(
    tx: &mut Transaction<'_, Postgres>,
    payment: &Payment,
) -> RepositoryResult<()> {
    sqlx::query(
        r#"
        UPDATE payments
        SET order_id = $1, payment_id = $2, signature = $3, amount = $4, currency = $5,
            status = $6, failure_reason = $7, updated_at = $8
        WHERE id = $9
        "#,
    )
    .bind(&payment.order_id)
    .bind(&payment.payment_id)
    .bind(&payment.signature)
    .bind(&payment.amount)
    .bind(&payment.currency)
    .bind(payment.status.as_str())
    .bind(&payment.failure_reason)
    .bind(payment.updated_at)
    .bind(payment.id)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_insert_error(e, format!("order {}", payment.order_id)))?;
    Ok(())
}

async fn insert_payment(
    tx: &mut Transaction<'_, Postgres>,
    payment: &Payment,
) -> RepositoryResult<()> {
    sqlx::query(
        r#"
        INSERT INTO payments (
            id, booking_id, order_id, payment_id, signature, amount, currency,
            status, failure_reason, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(payment.id)
    .bind(payment.booking_id)
    .bind(&payment.order_id)
    .bind(&payment.payment_id)
    .bind(&payment.signature)
    .bind(&payment.amount)
    .bind(&payment.currency)
    .bind(payment.status.as_str())
    .bind(&payment.failure_reason)
    .bind(payment.created_at)
    .bind(payment.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_insert_error(e, format!("order {}", payment.order_id)))?;
    Ok(())
}

async fn record_order(
    tx: &mut Transaction<'_, Postgres>,
    order_id: &str,
    payment_record_id: Uuid,
) -> RepositoryResult<()> {
    sqlx::query("INSERT INTO payment_orders (order_id, payment_record_id) VALUES ($1, $2)")
        .bind(order_id)
        .bind(payment_record_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_insert_error(e, format!("order {}", order_id)))?;
    Ok(())
}

#[async_trait]
impl BookingRepository for PostgresBookingRepository {
    async fn ping(&self) -> RepositoryResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_room(&self, room: &Room) -> RepositoryResult<Room> {
        let row = sqlx::query_as::<_, RoomRow>(&format!(
            r#"
            INSERT INTO rooms (
                id, property_id, room_number, room_type, capacity, current_occupancy,
                daily_rate, monthly_rate, security_deposit, is_available, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            ROOM_COLUMNS
        ))
        .bind(room.id)
        .bind(room.property_id)
        .bind(&room.room_number)
        .bind(room.room_type.as_str())
        .bind(room.capacity)
        .bind(room.current_occupancy)
        .bind(&room.daily_rate)
        .bind(&room.monthly_rate)
        .bind(&room.security_deposit)
        .bind(room.is_available)
        .bind(room.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, format!("room {}", room.room_number)))?;

        row.into_domain()
    }

    async fn get_room(&self, id: Uuid) -> RepositoryResult<Room> {
        let row = sqlx::query_as::<_, RoomRow>(&format!(
            "SELECT {} FROM rooms WHERE id = $1",
            ROOM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| RepositoryError::NotFound(format!("room {}", id)))?
            .into_domain()
    }

    async fn insert_booking(&self, booking: &Booking) -> RepositoryResult<Booking> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            INSERT INTO bookings (
                id, user_id, room_id, booking_type, check_in_date, check_out_date, guests,
                special_requests, base_amount, security_deposit, total_amount, status,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        ))
        .bind(booking.id)
        .bind(booking.user_id)
        .bind(booking.room_id)
        .bind(booking.booking_type.as_str())
        .bind(booking.check_in_date)
        .bind(booking.check_out_date)
        .bind(booking.guests)
        .bind(&booking.special_requests)
        .bind(&booking.base_amount)
        .bind(&booking.security_deposit)
        .bind(&booking.total_amount)
        .bind(booking.status.as_str())
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, format!("booking {}", booking.id)))?;

        row.into_domain()
    }

    async fn get_booking(&self, id: Uuid) -> RepositoryResult<Booking> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE id = $1",
            BOOKING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| RepositoryError::NotFound(format!("booking {}", id)))?
            .into_domain()
    }

    async fn list_bookings_for_user(&self, user_id: Uuid) -> RepositoryResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE user_id = $1 ORDER BY created_at DESC",
            BOOKING_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(BookingRow::into_domain).collect()
    }

    async fn find_payment_by_order(&self, order_id: &str) -> RepositoryResult<Option<Payment>> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM payments \
             WHERE id = (SELECT payment_record_id FROM payment_orders WHERE order_id = $1)",
            PAYMENT_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(PaymentRow::into_domain).transpose()
    }

    async fn find_payment_for_booking(&self, booking_id: Uuid) -> RepositoryResult<Option<Payment>> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM payments WHERE booking_id = $1",
            PAYMENT_COLUMNS
        ))
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(PaymentRow::into_domain).transpose()
    }

    async fn attach_order(
        &self,
        booking_id: Uuid,
        order_id: &str,
        currency: &str,
    ) -> Result<Payment, BookingError> {
        let mut tx = self.begin().await?;
        let booking = lock_booking(&mut tx, booking_id).await?;
        let mut existing = lock_payment_for_booking(&mut tx, booking_id).await?;

        let attachment =
            lifecycle::attach_order(&booking, existing.as_mut(), order_id, currency, Utc::now())?;

        let payment = match attachment {
            OrderAttachment::Inserted(payment) => {
                insert_payment(&mut tx, &payment).await?;
                record_order(&mut tx, &payment.order_id, payment.id).await?;
                payment
            }
            OrderAttachment::Reopened => {
                let payment = existing.ok_or_else(|| {
                    RepositoryError::NotFound(format!("payment for booking {}", booking_id))
                })?;
                record_order(&mut tx, &payment.order_id, payment.id).await?;
                write_payment(&mut tx, &payment).await?;
                payment
            }
            OrderAttachment::Existing => existing.ok_or_else(|| {
                RepositoryError::NotFound(format!("payment for booking {}", booking_id))
            })?,
        };

        tx.commit().await.map_err(RepositoryError::from)?;
        Ok(payment)
    }

    async fn apply_confirmation(
        &self,
        confirmation: &PaymentConfirmation,
    ) -> Result<Confirmation, BookingError> {
        // Resolve the booking first so locks are taken in the canonical order.
        // A payment never changes booking, so this read needs no lock.
        let booking_id: Option<Uuid> = sqlx::query_scalar(
            "SELECT p.booking_id FROM payment_orders o \
             JOIN payments p ON p.id = o.payment_record_id WHERE o.order_id = $1",
        )
        .bind(&confirmation.order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;
        let booking_id =
            booking_id.ok_or_else(|| BookingError::UnknownOrder(confirmation.order_id.clone()))?;

        let mut tx = self.begin().await?;
        let mut booking = lock_booking(&mut tx, booking_id).await?;
        let mut payment = lock_payment_for_booking(&mut tx, booking_id)
            .await?
            .ok_or_else(|| BookingError::UnknownOrder(confirmation.order_id.clone()))?;
        let mut room = lock_room(&mut tx, booking.room_id).await?;

        let outcome =
            lifecycle::reconcile(&mut payment, &mut booking, &mut room, confirmation, Utc::now())?;

        if outcome == ReconcileOutcome::Applied {
            write_payment(&mut tx, &payment).await?;
            write_booking_status(&mut tx, &booking).await?;
            write_room_occupancy(&mut tx, &room).await?;
            tx.commit().await.map_err(RepositoryError::from)?;
        } else {
            tx.rollback().await.map_err(RepositoryError::from)?;
        }

        Ok(Confirmation {
            outcome,
            booking,
            payment,
            room,
        })
    }

    async fn cancel_booking(&self, booking_id: Uuid) -> Result<Cancellation, BookingError> {
        let mut tx = self.begin().await?;
        let mut booking = lock_booking(&mut tx, booking_id).await?;
        let mut payment = lock_payment_for_booking(&mut tx, booking_id).await?;
        let mut room = lock_room(&mut tx, booking.room_id).await?;

        lifecycle::cancel(&mut booking, &mut room, payment.as_mut(), Utc::now())?;

        write_booking_status(&mut tx, &booking).await?;
        write_room_occupancy(&mut tx, &room).await?;
        if let Some(payment) = &payment {
            write_payment(&mut tx, payment).await?;
        }
        tx.commit().await.map_err(RepositoryError::from)?;

        Ok(Cancellation {
            booking,
            room,
            payment,
        })
    }

    async fn complete_booking(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        let mut tx = self.begin().await?;
        let mut booking = lock_booking(&mut tx, booking_id).await?;

        lifecycle::complete(&mut booking, Utc::now())?;

        write_booking_status(&mut tx, &booking).await?;
        tx.commit().await.map_err(RepositoryError::from)?;
        Ok(booking)
    }

    async fn fail_payment(&self, order_id: &str, reason: &str) -> Result<Payment, BookingError> {
        let mut tx = self.begin().await?;
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM payments \
             WHERE id = (SELECT payment_record_id FROM payment_orders WHERE order_id = $1) \
             FOR UPDATE",
            PAYMENT_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(RepositoryError::from)?;
        let mut payment = row
            .ok_or_else(|| BookingError::UnknownOrder(order_id.to_string()))?
            .into_domain()?;

        if lifecycle::fail(&mut payment, order_id, reason, Utc::now())? {
            write_payment(&mut tx, &payment).await?;
        }
        tx.commit().await.map_err(RepositoryError::from)?;
        Ok(payment)
    }
}

fn parse_column<T>(column: &str, value: &str) -> RepositoryResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| RepositoryError::Corrupt(format!("{}: {}", column, e)))
}

/// Internal row types for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct RoomRow {
    id: Uuid,
    property_id: Uuid,
    room_number: String,
    room_type: String,
    capacity: i32,
    current_occupancy: i32,
    daily_rate: BigDecimal,
    monthly_rate: BigDecimal,
    security_deposit: BigDecimal,
    is_available: bool,
    created_at: DateTime<Utc>,
}

impl RoomRow {
    fn into_domain(self) -> RepositoryResult<Room> {
        Ok(Room {
            id: self.id,
            property_id: self.property_id,
            room_number: self.room_number,
            room_type: parse_column("rooms.room_type", &self.room_type)?,
            capacity: self.capacity,
            current_occupancy: self.current_occupancy,
            daily_rate: self.daily_rate,
            monthly_rate: self.monthly_rate,
            security_deposit: self.security_deposit,
            is_available: self.is_available,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    user_id: Uuid,
    room_id: Uuid,
    booking_type: String,
    check_in_date: NaiveDate,
    check_out_date: NaiveDate,
    guests: i32,
    special_requests: String,
    base_amount: BigDecimal,
    security_deposit: BigDecimal,
    total_amount: BigDecimal,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_domain(self) -> RepositoryResult<Booking> {
        Ok(Booking {
            id: self.id,
            user_id: self.user_id,
            room_id: self.room_id,
            booking_type: parse_column("bookings.booking_type", &self.booking_type)?,
            check_in_date: self.check_in_date,
            check_out_date: self.check_out_date,
            guests: self.guests,
            special_requests: self.special_requests,
            base_amount: self.base_amount,
            security_deposit: self.security_deposit,
            total_amount: self.total_amount,
            status: parse_column("bookings.status", &self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    booking_id: Uuid,
    order_id: String,
    payment_id: Option<String>,
    signature: Option<String>,
    amount: BigDecimal,
    currency: String,
    status: String,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PaymentRow {
    fn into_domain(self) -> RepositoryResult<Payment> {
        Ok(Payment {
            id: self.id,
            booking_id: self.booking_id,
            order_id: self.order_id,
            payment_id: self.payment_id,
            signature: self.signature,
            amount: self.amount,
            currency: self.currency,
            status: parse_column("payments.status", &self.status)?,
            failure_reason: self.failure_reason,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
