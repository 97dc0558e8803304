use axum::{extract::FromRequestParts, http::request::Parts};
use shared_types::AppError;

use super::jwt::Claims;

/// Extractor that requires authentication. Returns 401 if no valid token.
pub struct AuthRequired(pub Claims);

impl<S: Send + Sync> FromRequestParts<S> for AuthRequired {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthRequired)
            .ok_or_else(|| AppError::unauthorized("Authentication required"))
    }
}

/// Requires a super-admin token. 401 if unauthenticated, 403 otherwise.
///
/// Trusts the flag in the token; it is refreshed whenever a token is issued.
pub struct SuperAdminRequired(pub Claims);

impl<S: Send + Sync> FromRequestParts<S> for SuperAdminRequired {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthRequired(claims) = AuthRequired::from_request_parts(parts, state).await?;
        if !claims.super_admin {
            return Err(AppError::forbidden("Super-admin access required"));
        }
        Ok(SuperAdminRequired(claims))
    }
}
