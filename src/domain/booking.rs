//! Booking entity and its status machine.

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::pricing::{BookingType, PriceQuote};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Completed)
    }

    /// Edges of the lifecycle graph.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Completed)
                | (Confirmed, Cancelled)
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "completed" => Ok(BookingStatus::Completed),
            other => Err(format!("unknown booking status: {}", other)),
        }
    }
}

/// A user's stay request against a room. Amounts are fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub room_id: Uuid,
    pub booking_type: BookingType,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub guests: i32,
    pub special_requests: String,
    pub base_amount: BigDecimal,
    pub security_deposit: BigDecimal,
    pub total_amount: BigDecimal,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: Uuid,
        room_id: Uuid,
        booking_type: BookingType,
        check_in_date: NaiveDate,
        check_out_date: NaiveDate,
        guests: i32,
        special_requests: String,
        quote: PriceQuote,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            room_id,
            booking_type,
            check_in_date,
            check_out_date,
            guests,
            special_requests,
            base_amount: quote.base,
            security_deposit: quote.deposit,
            total_amount: quote.total,
            status: BookingStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Gateway receipt reference for this booking's order.
    pub fn receipt(&self) -> String {
        format!("booking_{}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BookingStatus::*;

    #[test]
    fn test_lifecycle_edges() {
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Completed));
        assert!(Confirmed.can_transition_to(Cancelled));

        assert!(!Pending.can_transition_to(Completed));
        assert!(!Confirmed.can_transition_to(Pending));
        for terminal in [Cancelled, Completed] {
            assert!(terminal.is_terminal());
            for next in [Pending, Confirmed, Cancelled, Completed] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_new_booking_is_pending_with_quoted_amounts() {
        let quote = PriceQuote {
            base: BigDecimal::from(2400),
            deposit: BigDecimal::from(5000),
            total: BigDecimal::from(7400),
        };
        let booking = Booking::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            BookingType::Daily,
            "2024-06-01".parse().unwrap(),
            "2024-06-04".parse().unwrap(),
            2,
            String::new(),
            quote,
        );

        assert_eq!(booking.status, Pending);
        assert_eq!(
            booking.total_amount,
            &booking.base_amount + &booking.security_deposit
        );
        assert!(booking.receipt().starts_with("booking_"));
    }
}
