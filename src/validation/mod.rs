use sqlx::types::BigDecimal;
use std::fmt;

pub const SPECIAL_REQUESTS_MAX_LEN: usize = 1000;
pub const GATEWAY_REFERENCE_MAX_LEN: usize = 255;
pub const FAILURE_REASON_MAX_LEN: usize = 500;
/// Decimal places stored for money columns.
pub const MONEY_DECIMAL_PLACES: i64 = 2;
/// Exclusive upper bound of a NUMERIC(10, 2) money column.
pub const MONEY_UPPER_BOUND: i64 = 100_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

pub fn sanitize_string(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_control() || ch.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn validate_required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }

    Ok(())
}

pub fn validate_max_len(field: &'static str, value: &str, max_len: usize) -> ValidationResult {
    if value.chars().count() > max_len {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }

    Ok(())
}

pub fn validate_guests(guests: i32) -> ValidationResult {
    if guests < 1 {
        return Err(ValidationError::new("guests", "must be at least 1"));
    }

    Ok(())
}

/// Normalises free-text special requests and bounds their length.
pub fn clean_special_requests(value: Option<&str>) -> Result<String, ValidationError> {
    let cleaned = value.map(sanitize_string).unwrap_or_default();
    validate_max_len("special_requests", &cleaned, SPECIAL_REQUESTS_MAX_LEN)?;
    Ok(cleaned)
}

/// Gateway identifiers (order ids, payment ids) are opaque ASCII tokens.
pub fn validate_gateway_reference(field: &'static str, value: &str) -> ValidationResult {
    validate_required(field, value)?;
    validate_max_len(field, value, GATEWAY_REFERENCE_MAX_LEN)?;

    if !value
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
    {
        return Err(ValidationError::new(
            field,
            "must contain only letters, digits, '_' or '-'",
        ));
    }

    Ok(())
}

pub fn validate_non_negative_amount(field: &'static str, amount: &BigDecimal) -> ValidationResult {
    if amount < &BigDecimal::from(0) {
        return Err(ValidationError::new(field, "must not be negative"));
    }

    Ok(())
}

/// Money must fit the stored NUMERIC(10, 2) columns exactly.
pub fn validate_money_amount(field: &'static str, amount: &BigDecimal) -> ValidationResult {
    validate_non_negative_amount(field, amount)?;
    if amount.with_scale(MONEY_DECIMAL_PLACES) != *amount {
        return Err(ValidationError::new(
            field,
            format!("must have at most {} decimal places", MONEY_DECIMAL_PLACES),
        ));
    }
    if amount >= &BigDecimal::from(MONEY_UPPER_BOUND) {
        return Err(ValidationError::new(
            field,
            format!("must be less than {}", MONEY_UPPER_BOUND),
        ));
    }

    Ok(())
}
