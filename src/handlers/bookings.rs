use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Booking, Caller, Payment, Room};
use crate::error::{AppError, BookingError};
use crate::services::CreateBookingInput;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct BookingCreated {
    pub booking: Booking,
    /// `None` when the gateway could not open an order; retry via `POST /bookings/:id/order`.
    pub payment: Option<Payment>,
}

#[derive(Debug, Serialize)]
pub struct BookingCancelled {
    pub booking: Booking,
    pub room: Room,
    pub payment: Option<Payment>,
}

#[derive(Debug, Deserialize)]
pub struct ListFilter {
    pub user_id: Option<Uuid>,
}

pub async fn create_booking(
    State(state): State<AppState>,
    caller: Caller,
    Json(input): Json<CreateBookingInput>,
) -> Result<impl IntoResponse, AppError> {
    let booking = state.bookings.create_booking(&caller, input).await?;

    let payment = match state.reconciliation.open_order(booking.id).await {
        Ok(payment) => Some(payment),
        Err(e) if e.is_retryable() => {
            tracing::warn!(
                booking_id = %booking.id,
                error = %e,
                "Booking created without a payment order"
            );
            None
        }
        Err(e) => return Err(e.into()),
    };

    Ok((StatusCode::CREATED, Json(BookingCreated { booking, payment })))
}

pub async fn list_bookings(
    State(state): State<AppState>,
    caller: Caller,
    Query(filter): Query<ListFilter>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = match filter.user_id {
        Some(user_id) if !caller.may_manage(user_id) => {
            return Err(BookingError::NotPermitted(caller.role).into())
        }
        Some(user_id) => user_id,
        None => caller.user_id,
    };

    let bookings = state.bookings.list_bookings(user_id).await?;
    Ok(Json(bookings))
}

pub async fn get_booking(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let booking = managed_booking(&state, &caller, id).await?;
    Ok(Json(booking))
}

pub async fn open_order(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    managed_booking(&state, &caller, id).await?;
    let payment = state.reconciliation.open_order(id).await?;
    Ok(Json(payment))
}

pub async fn checkout(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    managed_booking(&state, &caller, id).await?;
    let checkout = state.reconciliation.checkout(id).await?;
    Ok(Json(checkout))
}

pub async fn cancel_booking(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    managed_booking(&state, &caller, id).await?;
    let cancellation = state.bookings.cancel(id).await?;
    Ok(Json(BookingCancelled {
        booking: cancellation.booking,
        room: cancellation.room,
        payment: cancellation.payment,
    }))
}

pub async fn complete_booking(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if !caller.role.is_staff() {
        return Err(BookingError::NotPermitted(caller.role).into());
    }
    let booking = state.bookings.complete(id).await?;
    Ok(Json(booking))
}

async fn managed_booking(
    state: &AppState,
    caller: &Caller,
    id: Uuid,
) -> Result<Booking, AppError> {
    let booking = state.bookings.get_booking(id).await?;
    if !caller.may_manage(booking.user_id) {
        return Err(BookingError::NotPermitted(caller.role).into());
    }
    Ok(booking)
}
