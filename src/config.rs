use anyhow::Context;
use dotenvy::dotenv;
use std::env;
use url::Url;

use crate::domain::pricing::{PricingPolicy, DEFAULT_DAYS_PER_MONTH};

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub payment_gateway_url: String,
    pub payment_gateway_key_id: String,
    pub payment_gateway_key_secret: String,
    pub payment_currency: String,
    pub monthly_proration_days: u32,
    pub gateway_failure_threshold: u32,
    pub gateway_reset_timeout_secs: u64,
    pub cors_allowed_origins: Option<Vec<String>>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup. Unset keys fall back to their defaults;
    /// required keys without a value are an error.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{} must be set", key))
        };

        Ok(Config {
            server_port: parse_or(&lookup, "SERVER_PORT", 3000)?,
            database_url: required("DATABASE_URL")?,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            payment_gateway_url: required("PAYMENT_GATEWAY_URL")?,
            payment_gateway_key_id: required("PAYMENT_GATEWAY_KEY_ID")?,
            payment_gateway_key_secret: required("PAYMENT_GATEWAY_KEY_SECRET")?,
            payment_currency: lookup("PAYMENT_CURRENCY")
                .map(|c| c.trim().to_ascii_uppercase())
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| "INR".to_string()),
            monthly_proration_days: parse_or(
                &lookup,
                "MONTHLY_PRORATION_DAYS",
                DEFAULT_DAYS_PER_MONTH,
            )?,
            gateway_failure_threshold: parse_or(&lookup, "GATEWAY_FAILURE_THRESHOLD", 3)?,
            gateway_reset_timeout_secs: parse_or(&lookup, "GATEWAY_RESET_TIMEOUT_SECS", 60)?,
            cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS").and_then(|raw| {
                let origins: Vec<String> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect();
                (!origins.is_empty()).then_some(origins)
            }),
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server_port == 0 {
            anyhow::bail!("SERVER_PORT must be greater than 0");
        }
        if self.database_max_connections == 0 {
            anyhow::bail!("DATABASE_MAX_CONNECTIONS must be greater than 0");
        }
        Url::parse(&self.database_url).context("DATABASE_URL is not a valid URL")?;
        let gateway = Url::parse(&self.payment_gateway_url)
            .context("PAYMENT_GATEWAY_URL is not a valid URL")?;
        if !matches!(gateway.scheme(), "http" | "https") {
            anyhow::bail!("PAYMENT_GATEWAY_URL must use http or https");
        }
        if self.payment_gateway_key_secret.trim().is_empty() {
            anyhow::bail!("PAYMENT_GATEWAY_KEY_SECRET must not be empty");
        }
        if self.payment_currency.len() != 3
            || !self.payment_currency.chars().all(|c| c.is_ascii_alphabetic())
        {
            anyhow::bail!("PAYMENT_CURRENCY must be a three letter currency code");
        }
        if self.monthly_proration_days == 0 {
            anyhow::bail!("MONTHLY_PRORATION_DAYS must be greater than 0");
        }
        if self.gateway_failure_threshold == 0 {
            anyhow::bail!("GATEWAY_FAILURE_THRESHOLD must be greater than 0");
        }
        Ok(())
    }

    pub fn pricing_policy(&self) -> PricingPolicy {
        PricingPolicy {
            days_per_month: self.monthly_proration_days,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        _ => Ok(default),
    }
}

/// Replaces the password in a connection URL with `****`.
pub fn mask_password(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) if parsed.password().is_some() => {
            if parsed.set_password(Some("****")).is_ok() {
                parsed.to_string()
            } else {
                url.to_string()
            }
        }
        _ => url.to_string(),
    }
}

/// Keeps the first four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    format!("{}****", visible)
}
