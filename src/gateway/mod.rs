//! Payment gateway integration.

pub mod client;

pub use client::HttpPaymentGateway;

use bigdecimal::{BigDecimal, ToPrimitive};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::ports::GatewayError;

type HmacSha256 = Hmac<Sha256>;

/// Smallest currency denominations per major unit (paise per rupee).
pub const MINOR_UNITS_PER_MAJOR: i64 = 100;

/// Converts a decimal amount to the gateway's minor unit. Refuses sub-minor fractions.
pub fn to_minor_units(amount: &BigDecimal) -> Result<i64, GatewayError> {
    let minor = amount.clone() * BigDecimal::from(MINOR_UNITS_PER_MAJOR);
    if minor.with_scale(0) != minor {
        return Err(GatewayError::InvalidAmount(amount.clone()));
    }
    minor
        .to_i64()
        .ok_or_else(|| GatewayError::InvalidAmount(amount.clone()))
}

fn signed_payload(order_id: &str, detail: &str) -> String {
    format!("{}|{}", order_id, detail)
}

/// Hex HMAC-SHA256 the gateway attaches to a successful payment.
pub fn sign_payment(order_id: &str, payment_id: &str, secret: &str) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        // HMAC accepts keys of any length.
        Err(_) => return String::new(),
    };
    mac.update(signed_payload(order_id, payment_id).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Checks a payment signature using constant-time comparison.
pub fn verify_signature(order_id: &str, payment_id: &str, signature: &str, secret: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(signed_payload(order_id, payment_id).as_bytes());
    mac.verify_slice(&expected).is_ok()
}

/// Signature the gateway attaches to a failure callback.
pub fn sign_failure(order_id: &str, reason: &str, secret: &str) -> String {
    sign_payment(order_id, reason, secret)
}

pub fn verify_failure_signature(order_id: &str, reason: &str, signature: &str, secret: &str) -> bool {
    verify_signature(order_id, reason, signature, secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_round_trip() {
        let signature = sign_payment("order_1", "pay_1", "secret");
        assert_eq!(signature.len(), 64);
        assert!(verify_signature("order_1", "pay_1", &signature, "secret"));
    }

    #[test]
    fn test_signature_bound_to_order_and_payment() {
        let signature = sign_payment("order_1", "pay_1", "secret");
        assert!(!verify_signature("order_1", "pay_2", &signature, "secret"));
        assert!(!verify_signature("order_2", "pay_1", &signature, "secret"));
        assert!(!verify_signature("order_1", "pay_1", &signature, "other-secret"));
    }

    #[test]
    fn test_malformed_signature_is_rejected() {
        assert!(!verify_signature("order_1", "pay_1", "not-hex", "secret"));
        assert!(!verify_signature("order_1", "pay_1", "", "secret"));
    }

    #[test]
    fn test_failure_signature_bound_to_reason() {
        let signature = sign_failure("order_1", "card declined", "secret");
        assert!(verify_failure_signature("order_1", "card declined", &signature, "secret"));
        assert!(!verify_failure_signature("order_1", "", &signature, "secret"));
        assert!(!verify_failure_signature("order_2", "card declined", &signature, "secret"));
    }

    #[test]
    fn test_minor_units() {
        assert_eq!(to_minor_units(&BigDecimal::from(7400)).unwrap(), 740_000);
        assert_eq!(to_minor_units(&"33.33".parse().unwrap()).unwrap(), 3333);
        assert!(to_minor_units(&"0.001".parse().unwrap()).is_err());
    }
}
