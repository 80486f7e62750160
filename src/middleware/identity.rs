//! Caller identity.
//!
//! Authentication happens upstream; the gateway in front of this service forwards the
//! authenticated user as `X-User-Id` and `X-User-Role`. Handlers take a [`Caller`]
//! argument and reject the request with 401 when either header is missing or malformed.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::domain::{Caller, Role};
use crate::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header_str(parts, USER_ID_HEADER)?;
        let user_id = Uuid::parse_str(user_id)
            .map_err(|_| AppError::Unauthorized(format!("{} is not a valid id", USER_ID_HEADER)))?;

        let role: Role = header_str(parts, USER_ROLE_HEADER)?
            .parse()
            .map_err(|e: crate::domain::role::UnknownRole| AppError::Unauthorized(e.to_string()))?;

        Ok(Caller::new(user_id, role))
    }
}

fn header_str<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, AppError> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Unauthorized(format!("missing {} header", name)))
}
