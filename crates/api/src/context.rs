use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::Response,
};

use piggybank_core::UserId;

use crate::app::errors;

/// Header that carries the acting user.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The user a request acts for, taken from the `X-User-Id` header.
///
/// Authentication happens upstream; this only identifies which user's
/// accounts to list.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct UserContext {
    user_id: UserId,
}

impl UserContext {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for UserContext
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts.headers.get(USER_ID_HEADER).ok_or_else(|| {
            errors::json_error(StatusCode::BAD_REQUEST, "missing_user", "X-User-Id header is required")
        })?;

        let user_id = header
            .to_str()
            .ok()
            .and_then(|v| v.parse::<UserId>().ok())
            .ok_or_else(|| {
                errors::json_error(StatusCode::BAD_REQUEST, "invalid_user", "X-User-Id must be an integer")
            })?;

        Ok(Self::new(user_id))
    }
}
