/**
 * Principal Extraction
 *
 * Session issuance lives in front of this service. The session layer
 * authenticates the caller and forwards the user id in the `x-user-id`
 * header; handlers take a [`Principal`] argument to require it.
 *
 * A missing header, a non UTF-8 value or a value that is not a UUID is
 * rejected with `401 Unauthorized`.
 */

use std::fmt;

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::backend::error::BackendError;

/// Header carrying the authenticated user id
pub const PRINCIPAL_HEADER: &str = "x-user-id";

/// Authenticated user making the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Principal(pub Uuid);

impl Principal {
    pub fn user_id(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user {}", self.0)
    }
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = BackendError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(PRINCIPAL_HEADER)
            .ok_or_else(|| {
                tracing::warn!("Missing {} header", PRINCIPAL_HEADER);
                BackendError::unauthorized("Missing x-user-id header")
            })?
            .to_str()
            .map_err(|_| BackendError::unauthorized("Malformed x-user-id header"))?;

        let user_id = Uuid::parse_str(value.trim()).map_err(|e| {
            tracing::warn!("Invalid {} header: {:?}", PRINCIPAL_HEADER, e);
            BackendError::unauthorized("Malformed x-user-id header")
        })?;

        Ok(Principal(user_id))
    }
}
