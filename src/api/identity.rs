use axum::{extract::FromRequestParts, http::request::Parts};

use super::ApiError;

/// The ambient authenticated user identity, supplied explicitly by the
/// fronting proxy/auth layer in the `X-User-Id` header. The core never talks
/// to an authentication collaborator itself.
#[derive(Debug, Clone)]
pub struct UserId(pub String);

impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .headers
            .get("X-User-Id")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        match user {
            Some(user) => Ok(Self(user.to_string())),
            None => Err(ApiError::unauthorized("Missing user identity")),
        }
    }
}
