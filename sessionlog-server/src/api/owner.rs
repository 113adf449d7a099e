//! Caller identity
//!
//! Authentication is handled upstream; the gateway forwards the
//! authenticated user id in the `X-Owner-Id` header. Every log and
//! trackable object is scoped to that id.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;

/// Header carrying the authenticated owner id
pub const OWNER_HEADER: &str = "x-owner-id";

/// Owner id extracted from [`OWNER_HEADER`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner(pub String);

impl Owner {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Owner
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(OWNER_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {} header", OWNER_HEADER)))?;

        let owner = value
            .to_str()
            .map_err(|_| ApiError::BadRequest(format!("{} header is not valid text", OWNER_HEADER)))?
            .trim();

        if owner.is_empty() {
            return Err(ApiError::Unauthorized(format!("empty {} header", OWNER_HEADER)));
        }

        Ok(Owner(owner.to_string()))
    }
}
