//! Room inventory: capacity, occupancy and the rates a booking is priced from.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::BookingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    Shared,
    Private,
    SemiPrivate,
}

impl RoomType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomType::Shared => "shared",
            RoomType::Private => "private",
            RoomType::SemiPrivate => "semi_private",
        }
    }
}

impl fmt::Display for RoomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoomType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shared" => Ok(RoomType::Shared),
            "private" => Ok(RoomType::Private),
            "semi_private" => Ok(RoomType::SemiPrivate),
            other => Err(format!("unknown room type: {}", other)),
        }
    }
}

/// A bookable room. `current_occupancy` never exceeds `capacity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub property_id: Uuid,
    pub room_number: String,
    pub room_type: RoomType,
    pub capacity: i32,
    pub current_occupancy: i32,
    pub daily_rate: BigDecimal,
    pub monthly_rate: BigDecimal,
    pub security_deposit: BigDecimal,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
}

impl Room {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        property_id: Uuid,
        room_number: String,
        room_type: RoomType,
        capacity: i32,
        daily_rate: BigDecimal,
        monthly_rate: BigDecimal,
        security_deposit: BigDecimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            property_id,
            room_number,
            room_type,
            capacity,
            current_occupancy: 0,
            daily_rate,
            monthly_rate,
            security_deposit,
            is_available: true,
            created_at: Utc::now(),
        }
    }

    pub fn available_spots(&self) -> i32 {
        (self.capacity - self.current_occupancy).max(0)
    }

    /// Whether a new booking for `guests` may be accepted against this room right now.
    pub fn can_accommodate(&self, guests: i32) -> bool {
        self.is_available && guests <= self.available_spots()
    }

    /// Commits `guests` spots. Leaves the room untouched on failure.
    pub fn admit(&mut self, guests: i32) -> Result<(), BookingError> {
        let available = self.available_spots();
        if guests > available {
            return Err(BookingError::CapacityExceeded {
                room_id: self.id,
                requested: guests,
                available,
            });
        }
        self.current_occupancy += guests;
        Ok(())
    }

    /// Releases `guests` spots, flooring occupancy at zero.
    pub fn release(&mut self, guests: i32) {
        self.current_occupancy = (self.current_occupancy - guests).max(0);
    }
}
