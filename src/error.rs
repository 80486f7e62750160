use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{BookingStatus, PricingError, Role};
use crate::ports::RepositoryError;
use crate::validation::ValidationError;

/// Failures of the booking core.
#[derive(Error, Debug)]
pub enum BookingError {
    #[error("invalid booking request: {0}")]
    InvalidBookingRequest(#[from] PricingError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("room {room_id} cannot take {requested} guest(s): {available} spot(s) available")]
    RoomUnavailable {
        room_id: Uuid,
        requested: i32,
        available: i32,
    },

    #[error("role {0} is not permitted to perform this action")]
    NotPermitted(Role),

    #[error("payment gateway unavailable, retry opening the order: {0}")]
    GatewayUnavailable(String),

    #[error("unknown order: {0}")]
    UnknownOrder(String),

    #[error("payment signature verification failed for order {0}")]
    SignatureInvalid(String),

    #[error("room {room_id} capacity exceeded: {requested} guest(s) requested, {available} spot(s) left")]
    CapacityExceeded {
        room_id: Uuid,
        requested: i32,
        available: i32,
    },

    #[error("order {0} is already confirmed")]
    AlreadyConfirmed(String),

    #[error("cannot {action} booking {booking_id}: it is {status}")]
    InvalidTransition {
        booking_id: Uuid,
        status: BookingStatus,
        action: &'static str,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

impl BookingError {
    /// Transient failures the caller may retry as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BookingError::GatewayUnavailable(_))
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        let message = err.to_string();
        match err {
            BookingError::InvalidBookingRequest(_) | BookingError::Validation(_) => {
                AppError::Validation(message)
            }
            BookingError::RoomUnavailable { .. }
            | BookingError::CapacityExceeded { .. }
            | BookingError::AlreadyConfirmed(_)
            | BookingError::InvalidTransition { .. } => AppError::Conflict(message),
            BookingError::NotPermitted(_) => AppError::Forbidden(message),
            BookingError::GatewayUnavailable(_) => AppError::ServiceUnavailable(message),
            BookingError::UnknownOrder(_) | BookingError::NotFound(_) => AppError::NotFound(message),
            BookingError::SignatureInvalid(_) => AppError::Unauthorized(message),
            BookingError::Storage(RepositoryError::NotFound(what)) => {
                AppError::NotFound(format!("{} not found", what))
            }
            BookingError::Storage(RepositoryError::Conflict(what)) => {
                AppError::Conflict(format!("duplicate {}", what))
            }
            BookingError::Storage(e) => AppError::DatabaseError(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
