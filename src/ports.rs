//! Ports the booking core depends on: persistence and the payment gateway.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{Booking, Payment, PaymentConfirmation, Room};
use crate::domain::lifecycle::ReconcileOutcome;
use crate::error::BookingError;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("duplicate {0}")]
    Conflict(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Every row touched by a confirmation, as committed.
#[derive(Debug, Clone)]
pub struct Confirmation {
    pub outcome: ReconcileOutcome,
    pub booking: Booking,
    pub payment: Payment,
    pub room: Room,
}

/// Every row touched by a cancellation, as committed.
#[derive(Debug, Clone)]
pub struct Cancellation {
    pub booking: Booking,
    pub room: Room,
    pub payment: Option<Payment>,
}

/// Persistence for rooms, bookings and payments.
///
/// The multi-row operations are atomic: either every row they touch is written, or
/// none is. Implementations serialize them per room so two confirmations can never
/// both pass a stale capacity check.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn ping(&self) -> RepositoryResult<()>;

    async fn insert_room(&self, room: &Room) -> RepositoryResult<Room>;
    async fn get_room(&self, id: Uuid) -> RepositoryResult<Room>;

    async fn insert_booking(&self, booking: &Booking) -> RepositoryResult<Booking>;
    async fn get_booking(&self, id: Uuid) -> RepositoryResult<Booking>;
    async fn list_bookings_for_user(&self, user_id: Uuid) -> RepositoryResult<Vec<Booking>>;

    /// Resolves any order ever bound to a payment, including ones a reopen superseded.
    async fn find_payment_by_order(&self, order_id: &str) -> RepositoryResult<Option<Payment>>;
    async fn find_payment_for_booking(&self, booking_id: Uuid) -> RepositoryResult<Option<Payment>>;

    /// Binds a gateway order to a pending booking, returning the payment now on file.
    async fn attach_order(
        &self,
        booking_id: Uuid,
        order_id: &str,
        currency: &str,
    ) -> Result<Payment, BookingError>;

    /// Completes the payment, confirms the booking and commits room occupancy.
    async fn apply_confirmation(
        &self,
        confirmation: &PaymentConfirmation,
    ) -> Result<Confirmation, BookingError>;

    async fn cancel_booking(&self, booking_id: Uuid) -> Result<Cancellation, BookingError>;

    async fn complete_booking(&self, booking_id: Uuid) -> Result<Booking, BookingError>;

    /// Marks an open payment failed. A failure for a superseded order changes nothing.
    /// Returns the payment as stored.
    async fn fail_payment(&self, order_id: &str, reason: &str) -> Result<Payment, BookingError>;
}

/// An order request in the gateway's minor currency unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub amount_minor: i64,
    pub currency: String,
    pub receipt: String,
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("gateway rejected the order: {status} {body}")]
    Rejected { status: u16, body: String },
    #[error("invalid response from gateway: {0}")]
    InvalidResponse(String),
    #[error("circuit breaker open: {0}")]
    CircuitBreakerOpen(String),
    #[error("amount {0} cannot be expressed in minor units")]
    InvalidAmount(BigDecimal),
}

/// Order-based payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Public key id handed to checkout clients.
    fn key_id(&self) -> &str;

    async fn create_order(&self, request: &OrderRequest) -> Result<String, GatewayError>;

    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool;

    /// Checks the signature on a failure callback, computed over `order_id|reason`.
    fn verify_failure_signature(&self, order_id: &str, reason: &str, signature: &str) -> bool;

    fn circuit_state(&self) -> String {
        "closed".to_string()
    }
}
