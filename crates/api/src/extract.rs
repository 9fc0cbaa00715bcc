//! Request extractors.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::OwnerId;

use crate::error::ApiError;

/// Header carrying the caller's identity, set by the upstream identity layer.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated owner of the request.
///
/// Rejects with `401` when the header is missing, blank or not valid UTF-8.
#[derive(Debug, Clone)]
pub struct Owner(pub OwnerId);

impl<S: Send + Sync> FromRequestParts<S> for Owner {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| Owner(OwnerId::new(value)))
            .ok_or(ApiError::Unauthorized)
    }
}
