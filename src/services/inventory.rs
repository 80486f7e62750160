use bigdecimal::BigDecimal;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{Room, RoomType};
use crate::error::BookingError;
use crate::ports::BookingRepository;
use crate::services::booking::not_found_as_domain;
use crate::validation::{
    sanitize_string, validate_max_len, validate_money_amount, validate_required, ValidationError,
};

pub const ROOM_NUMBER_MAX_LEN: usize = 10;

/// A room listing handed over by the property management side.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRoom {
    pub property_id: Uuid,
    pub room_number: String,
    pub room_type: RoomType,
    pub capacity: i32,
    pub daily_rate: BigDecimal,
    pub monthly_rate: BigDecimal,
    #[serde(default)]
    pub security_deposit: Option<BigDecimal>,
}

#[derive(Clone)]
pub struct InventoryService {
    repository: Arc<dyn BookingRepository>,
}

impl InventoryService {
    pub fn new(repository: Arc<dyn BookingRepository>) -> Self {
        Self { repository }
    }

    pub async fn register_room(&self, input: NewRoom) -> Result<Room, BookingError> {
        let room_number = sanitize_string(&input.room_number);
        validate_required("room_number", &room_number)?;
        validate_max_len("room_number", &room_number, ROOM_NUMBER_MAX_LEN)?;
        if input.capacity < 1 {
            return Err(ValidationError::new("capacity", "must be at least 1").into());
        }
        let security_deposit = input.security_deposit.unwrap_or_else(|| BigDecimal::from(0));
        validate_money_amount("daily_rate", &input.daily_rate)?;
        validate_money_amount("monthly_rate", &input.monthly_rate)?;
        validate_money_amount("security_deposit", &security_deposit)?;

        let room = Room::new(
            input.property_id,
            room_number,
            input.room_type,
            input.capacity,
            input.daily_rate,
            input.monthly_rate,
            security_deposit,
        );
        let room = self.repository.insert_room(&room).await?;

        tracing::info!(
            room_id = %room.id,
            property_id = %room.property_id,
            capacity = room.capacity,
            "Room registered"
        );
        Ok(room)
    }

    pub async fn get_room(&self, room_id: Uuid) -> Result<Room, BookingError> {
        self.repository
            .get_room(room_id)
            .await
            .map_err(not_found_as_domain)
    }
}
