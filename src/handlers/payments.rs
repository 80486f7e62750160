//! Gateway callbacks. Both endpoints are hit by the gateway webhook and by the client
//! redirect after checkout, so they carry no caller identity: the HMAC signature is
//! what authenticates each callback.

use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::lifecycle::ReconcileOutcome;
use crate::domain::{Booking, Payment, PaymentConfirmation, PaymentFailure};
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ConfirmationResponse {
    pub outcome: &'static str,
    pub booking: Booking,
    pub payment: Payment,
    pub room_id: Uuid,
    pub current_occupancy: i32,
}

pub async fn confirm_payment(
    State(state): State<AppState>,
    Json(payload): Json<PaymentConfirmation>,
) -> Result<impl IntoResponse, AppError> {
    let confirmation = state.reconciliation.confirm(&payload).await?;

    Ok(Json(ConfirmationResponse {
        outcome: match confirmation.outcome {
            ReconcileOutcome::Applied => "applied",
            ReconcileOutcome::Replayed => "replayed",
        },
        booking: confirmation.booking,
        payment: confirmation.payment,
        room_id: confirmation.room.id,
        current_occupancy: confirmation.room.current_occupancy,
    }))
}

pub async fn record_failure(
    State(state): State<AppState>,
    Json(payload): Json<PaymentFailure>,
) -> Result<impl IntoResponse, AppError> {
    let payment = state.reconciliation.record_failure(&payload).await?;
    Ok(Json(payment))
}
