use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

use super::cookies;
use super::jwt::validate_access_token;

/// Permissive auth middleware.
///
/// Validates the access token from the cookie (or Bearer header) and inserts
/// the verified `Claims` into request extensions. Never rejects a request;
/// extractors and the route guard decide what an anonymous caller may do.
pub async fn auth_middleware(mut req: Request, next: Next) -> Response {
    if let Some(token) = cookies::extract_access_token(req.headers()) {
        match validate_access_token(&token) {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
            }
            Err(e) => {
                tracing::debug!(error = %e, "Rejected access token");
            }
        }
    }

    next.run(req).await
}
