//! Pricing engine.
//! Pure functions computing what a stay in a room costs. All money is `BigDecimal`.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::Room;

/// Scale money is stored at (NUMERIC(10,2)).
pub const MONEY_SCALE: i64 = 2;
pub const DEFAULT_DAYS_PER_MONTH: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("check-out date {check_out} must be after check-in date {check_in}")]
    InvalidDateRange {
        check_in: NaiveDate,
        check_out: NaiveDate,
    },

    #[error("unsupported booking type: {0}")]
    UnsupportedBookingType(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingType {
    Daily,
    Monthly,
}

impl BookingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingType::Daily => "daily",
            BookingType::Monthly => "monthly",
        }
    }
}

impl fmt::Display for BookingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingType {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(BookingType::Daily),
            "monthly" => Ok(BookingType::Monthly),
            other => Err(PricingError::UnsupportedBookingType(other.to_string())),
        }
    }
}

/// How monthly stays are pro-rated. A stay of `d` days costs
/// `monthly_rate * d / days_per_month`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingPolicy {
    pub days_per_month: u32,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            days_per_month: DEFAULT_DAYS_PER_MONTH,
        }
    }
}

/// Amounts frozen into a booking at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub base: BigDecimal,
    pub deposit: BigDecimal,
    pub total: BigDecimal,
}

/// Whole days between check-in and check-out. Errors unless at least one night.
pub fn stay_days(check_in: NaiveDate, check_out: NaiveDate) -> Result<i64, PricingError> {
    let days = (check_out - check_in).num_days();
    if days < 1 {
        return Err(PricingError::InvalidDateRange {
            check_in,
            check_out,
        });
    }
    Ok(days)
}

pub fn compute_price(
    policy: &PricingPolicy,
    room: &Room,
    booking_type: BookingType,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> Result<PriceQuote, PricingError> {
    let days = BigDecimal::from(stay_days(check_in, check_out)?);

    // Multiply before dividing so the only rounding happens once, at the end.
    let base = match booking_type {
        BookingType::Daily => &room.daily_rate * &days,
        BookingType::Monthly => {
            let days_per_month = BigDecimal::from(policy.days_per_month.max(1));
            (&room.monthly_rate * &days) / days_per_month
        }
    };

    let base = base.round(MONEY_SCALE).with_scale(MONEY_SCALE);
    let deposit = room.security_deposit.round(MONEY_SCALE).with_scale(MONEY_SCALE);
    let total = &base + &deposit;

    Ok(PriceQuote {
        base,
        deposit,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RoomType;
    use uuid::Uuid;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn room() -> Room {
        Room::new(
            Uuid::new_v4(),
            "A1".to_string(),
            RoomType::Shared,
            4,
            BigDecimal::from(800),
            BigDecimal::from(15000),
            BigDecimal::from(5000),
        )
    }

    #[test]
    fn test_daily_three_nights() {
        let quote = compute_price(
            &PricingPolicy::default(),
            &room(),
            BookingType::Daily,
            date("2024-06-01"),
            date("2024-06-04"),
        )
        .unwrap();

        assert_eq!(quote.base, BigDecimal::from(2400));
        assert_eq!(quote.deposit, BigDecimal::from(5000));
        assert_eq!(quote.total, BigDecimal::from(7400));
    }

    #[test]
    fn test_monthly_half_month_is_prorated() {
        let quote = compute_price(
            &PricingPolicy::default(),
            &room(),
            BookingType::Monthly,
            date("2024-06-01"),
            date("2024-06-16"),
        )
        .unwrap();

        assert_eq!(quote.base, BigDecimal::from(7500));
        assert_eq!(quote.total, BigDecimal::from(12500));
    }

    #[test]
    fn test_monthly_rounds_to_paise() {
        let mut r = room();
        r.monthly_rate = BigDecimal::from(1000);
        let quote = compute_price(
            &PricingPolicy::default(),
            &r,
            BookingType::Monthly,
            date("2024-06-01"),
            date("2024-06-02"),
        )
        .unwrap();

        assert_eq!(quote.base, "33.33".parse::<BigDecimal>().unwrap());
        assert_eq!(quote.total, &quote.base + &quote.deposit);
    }

    #[test]
    fn test_custom_days_per_month() {
        let policy = PricingPolicy { days_per_month: 15 };
        let quote = compute_price(
            &policy,
            &room(),
            BookingType::Monthly,
            date("2024-06-01"),
            date("2024-06-16"),
        )
        .unwrap();

        assert_eq!(quote.base, BigDecimal::from(15000));
    }

    #[test]
    fn test_rejects_empty_and_inverted_ranges() {
        for (check_in, check_out) in [("2024-06-01", "2024-06-01"), ("2024-06-05", "2024-06-01")] {
            let err = compute_price(
                &PricingPolicy::default(),
                &room(),
                BookingType::Daily,
                date(check_in),
                date(check_out),
            )
            .unwrap_err();
            assert!(matches!(err, PricingError::InvalidDateRange { .. }));
        }
    }

    #[test]
    fn test_pricing_is_deterministic() {
        let r = room();
        let policy = PricingPolicy::default();
        let a = compute_price(&policy, &r, BookingType::Monthly, date("2024-01-10"), date("2024-03-03"));
        let b = compute_price(&policy, &r, BookingType::Monthly, date("2024-01-10"), date("2024-03-03"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_deposit_is_frozen_from_room() {
        let mut r = room();
        let quote = compute_price(
            &PricingPolicy::default(),
            &r,
            BookingType::Daily,
            date("2024-06-01"),
            date("2024-06-02"),
        )
        .unwrap();
        r.security_deposit = BigDecimal::from(9999);
        assert_eq!(quote.deposit, BigDecimal::from(5000));
    }

    #[test]
    fn test_deposit_is_rounded_not_truncated() {
        let mut r = room();
        r.security_deposit = "1000.006".parse().unwrap();
        let quote = compute_price(
            &PricingPolicy::default(),
            &r,
            BookingType::Daily,
            date("2024-06-01"),
            date("2024-06-02"),
        )
        .unwrap();

        assert_eq!(quote.deposit, "1000.01".parse::<BigDecimal>().unwrap());
        assert_eq!(quote.total, "1800.01".parse::<BigDecimal>().unwrap());
    }

    #[test]
    fn test_unsupported_booking_type() {
        let err = "weekly".parse::<BookingType>().unwrap_err();
        assert_eq!(err, PricingError::UnsupportedBookingType("weekly".to_string()));
        assert_eq!("monthly".parse::<BookingType>().unwrap(), BookingType::Monthly);
    }
}
