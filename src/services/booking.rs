//! Booking lifecycle: creation against room availability, cancellation, completion.

use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::pricing::{compute_price, BookingType, PricingPolicy};
use crate::domain::{Booking, Caller};
use crate::error::BookingError;
use crate::ports::{BookingRepository, Cancellation, RepositoryError};
use crate::validation::{clean_special_requests, validate_guests};

/// A booking request as submitted by a user.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateBookingInput {
    pub room_id: Uuid,
    pub booking_type: String,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub guests: i32,
    #[serde(default)]
    pub special_requests: Option<String>,
}

#[derive(Clone)]
pub struct BookingService {
    repository: Arc<dyn BookingRepository>,
    pricing: PricingPolicy,
}

impl BookingService {
    pub fn new(repository: Arc<dyn BookingRepository>, pricing: PricingPolicy) -> Self {
        Self {
            repository,
            pricing,
        }
    }

    /// Prices the stay and records a pending booking. Occupancy is committed later,
    /// when the payment is confirmed.
    pub async fn create_booking(
        &self,
        caller: &Caller,
        input: CreateBookingInput,
    ) -> Result<Booking, BookingError> {
        if !caller.role.can_book() {
            return Err(BookingError::NotPermitted(caller.role));
        }
        validate_guests(input.guests)?;
        let special_requests = clean_special_requests(input.special_requests.as_deref())?;
        let booking_type: BookingType = input.booking_type.parse()?;

        let room = self
            .repository
            .get_room(input.room_id)
            .await
            .map_err(not_found_as_domain)?;

        if !room.can_accommodate(input.guests) {
            tracing::info!(
                room_id = %room.id,
                requested = input.guests,
                available = room.available_spots(),
                "Booking rejected: room unavailable"
            );
            return Err(BookingError::RoomUnavailable {
                room_id: room.id,
                requested: input.guests,
                available: if room.is_available { room.available_spots() } else { 0 },
            });
        }

        let quote = compute_price(
            &self.pricing,
            &room,
            booking_type,
            input.check_in_date,
            input.check_out_date,
        )?;

        let booking = Booking::new(
            caller.user_id,
            room.id,
            booking_type,
            input.check_in_date,
            input.check_out_date,
            input.guests,
            special_requests,
            quote,
        );
        let booking = self.repository.insert_booking(&booking).await?;

        tracing::info!(
            booking_id = %booking.id,
            room_id = %booking.room_id,
            booking_type = %booking.booking_type,
            total_amount = %booking.total_amount,
            "Booking created"
        );

        Ok(booking)
    }

    pub async fn get_booking(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        self.repository
            .get_booking(booking_id)
            .await
            .map_err(not_found_as_domain)
    }

    pub async fn list_bookings(&self, user_id: Uuid) -> Result<Vec<Booking>, BookingError> {
        Ok(self.repository.list_bookings_for_user(user_id).await?)
    }

    pub async fn cancel(&self, booking_id: Uuid) -> Result<Cancellation, BookingError> {
        let cancellation = self
            .repository
            .cancel_booking(booking_id)
            .await
            .map_err(storage_not_found_as_domain)?;

        tracing::info!(
            booking_id = %booking_id,
            room_id = %cancellation.room.id,
            occupancy = cancellation.room.current_occupancy,
            "Booking cancelled"
        );
        Ok(cancellation)
    }

    pub async fn complete(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        let booking = self
            .repository
            .complete_booking(booking_id)
            .await
            .map_err(storage_not_found_as_domain)?;

        tracing::info!(booking_id = %booking_id, "Booking completed");
        Ok(booking)
    }
}

pub(crate) fn not_found_as_domain(err: RepositoryError) -> BookingError {
    match err {
        RepositoryError::NotFound(what) => BookingError::NotFound(what),
        other => BookingError::Storage(other),
    }
}

pub(crate) fn storage_not_found_as_domain(err: BookingError) -> BookingError {
    match err {
        BookingError::Storage(inner) => not_found_as_domain(inner),
        other => other,
    }
}
