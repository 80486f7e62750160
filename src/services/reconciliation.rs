//! Payment reconciliation.
//!
//! Opens gateway orders for pending bookings and matches gateway callbacks back to
//! them. `confirm` is safe to call repeatedly: webhook and redirect deliveries of the
//! same payment collapse into one state change.

use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::lifecycle::ReconcileOutcome;
use crate::domain::{BookingStatus, Payment, PaymentConfirmation, PaymentFailure, PaymentStatus};
use crate::error::BookingError;
use crate::gateway::to_minor_units;
use crate::ports::{BookingRepository, Confirmation, OrderRequest, PaymentGateway};
use crate::services::booking::{not_found_as_domain, storage_not_found_as_domain};
use crate::validation::{
    sanitize_string, validate_gateway_reference, validate_max_len, FAILURE_REASON_MAX_LEN,
};

/// What a client needs to launch the gateway's checkout for a booking.
#[derive(Debug, Clone, Serialize)]
pub struct Checkout {
    pub booking_id: Uuid,
    pub order_id: String,
    pub key_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub payment_status: PaymentStatus,
}

#[derive(Clone)]
pub struct ReconciliationService {
    repository: Arc<dyn BookingRepository>,
    gateway: Arc<dyn PaymentGateway>,
    currency: String,
}

impl ReconciliationService {
    pub fn new(
        repository: Arc<dyn BookingRepository>,
        gateway: Arc<dyn PaymentGateway>,
        currency: String,
    ) -> Self {
        Self {
            repository,
            gateway,
            currency,
        }
    }

    /// Opens a gateway order for a pending booking. Never retried here: a failed call
    /// leaves the booking pending for the caller to try again.
    pub async fn open_order(&self, booking_id: Uuid) -> Result<Payment, BookingError> {
        let booking = self
            .repository
            .get_booking(booking_id)
            .await
            .map_err(not_found_as_domain)?;

        if booking.status != BookingStatus::Pending {
            return Err(BookingError::InvalidTransition {
                booking_id,
                status: booking.status,
                action: "open an order for",
            });
        }

        if let Some(existing) = self.repository.find_payment_for_booking(booking_id).await? {
            match existing.status {
                PaymentStatus::Created => return Ok(existing),
                PaymentStatus::Completed => {
                    return Err(BookingError::AlreadyConfirmed(existing.order_id))
                }
                PaymentStatus::Failed => {}
            }
        }

        let request = OrderRequest {
            amount_minor: to_minor_units(&booking.total_amount)
                .map_err(|e| BookingError::GatewayUnavailable(e.to_string()))?,
            currency: self.currency.clone(),
            receipt: booking.receipt(),
        };

        let order_id = self.gateway.create_order(&request).await.map_err(|e| {
            tracing::warn!(booking_id = %booking_id, error = %e, "Gateway order creation failed");
            BookingError::GatewayUnavailable(e.to_string())
        })?;

        let payment = self
            .repository
            .attach_order(booking_id, &order_id, &self.currency)
            .await?;

        if payment.order_id != order_id {
            tracing::warn!(
                booking_id = %booking_id,
                order_id = %order_id,
                kept_order_id = %payment.order_id,
                "Concurrent order opened for booking; new gateway order left unused"
            );
        } else {
            tracing::info!(
                booking_id = %booking_id,
                order_id = %order_id,
                amount_minor = request.amount_minor,
                "Payment order opened"
            );
        }

        Ok(payment)
    }

    pub async fn checkout(&self, booking_id: Uuid) -> Result<Checkout, BookingError> {
        let payment = self
            .repository
            .find_payment_for_booking(booking_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("payment for booking {}", booking_id)))?;

        Ok(Checkout {
            booking_id,
            amount_minor: to_minor_units(&payment.amount)
                .map_err(|e| BookingError::GatewayUnavailable(e.to_string()))?,
            order_id: payment.order_id,
            key_id: self.gateway.key_id().to_string(),
            currency: payment.currency,
            payment_status: payment.status,
        })
    }

    /// Verifies a gateway success callback and commits it atomically.
    pub async fn confirm(
        &self,
        confirmation: &PaymentConfirmation,
    ) -> Result<Confirmation, BookingError> {
        validate_gateway_reference("order_id", &confirmation.order_id)?;
        validate_gateway_reference("payment_id", &confirmation.payment_id)?;

        if self
            .repository
            .find_payment_by_order(&confirmation.order_id)
            .await?
            .is_none()
        {
            return Err(BookingError::UnknownOrder(confirmation.order_id.clone()));
        }

        if !self.gateway.verify_signature(
            &confirmation.order_id,
            &confirmation.payment_id,
            &confirmation.signature,
        ) {
            tracing::warn!(
                order_id = %confirmation.order_id,
                payment_id = %confirmation.payment_id,
                "Payment signature verification failed"
            );
            return Err(BookingError::SignatureInvalid(confirmation.order_id.clone()));
        }

        let result = self
            .repository
            .apply_confirmation(confirmation)
            .await
            .map_err(storage_not_found_as_domain);

        match &result {
            Ok(c) if c.outcome == ReconcileOutcome::Applied => tracing::info!(
                order_id = %confirmation.order_id,
                booking_id = %c.booking.id,
                room_id = %c.room.id,
                occupancy = c.room.current_occupancy,
                "Payment confirmed"
            ),
            Ok(c) => tracing::debug!(
                order_id = %confirmation.order_id,
                booking_id = %c.booking.id,
                "Duplicate payment confirmation ignored"
            ),
            Err(e @ BookingError::CapacityExceeded { .. }) => tracing::warn!(
                order_id = %confirmation.order_id,
                error = %e,
                "Payment confirmation rejected: room is full"
            ),
            Err(e) => tracing::warn!(
                order_id = %confirmation.order_id,
                error = %e,
                "Payment confirmation rejected"
            ),
        }

        result
    }

    /// Verifies and records a gateway failure callback. The booking stays pending.
    pub async fn record_failure(&self, failure: &PaymentFailure) -> Result<Payment, BookingError> {
        validate_gateway_reference("order_id", &failure.order_id)?;
        let reason = failure
            .reason
            .as_deref()
            .map(sanitize_string)
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| "payment failed".to_string());
        validate_max_len("reason", &reason, FAILURE_REASON_MAX_LEN)?;

        if self
            .repository
            .find_payment_by_order(&failure.order_id)
            .await?
            .is_none()
        {
            return Err(BookingError::UnknownOrder(failure.order_id.clone()));
        }

        if !self.gateway.verify_failure_signature(
            &failure.order_id,
            failure.signed_reason(),
            &failure.signature,
        ) {
            tracing::warn!(
                order_id = %failure.order_id,
                "Payment failure signature verification failed"
            );
            return Err(BookingError::SignatureInvalid(failure.order_id.clone()));
        }

        let payment = self
            .repository
            .fail_payment(&failure.order_id, &reason)
            .await?;
        if payment.order_id != failure.order_id {
            tracing::info!(
                order_id = %failure.order_id,
                current_order_id = %payment.order_id,
                "Failure for superseded order ignored"
            );
        } else {
            tracing::info!(
                order_id = %failure.order_id,
                booking_id = %payment.booking_id,
                reason = %reason,
                "Payment failure recorded"
            );
        }
        Ok(payment)
    }
}
