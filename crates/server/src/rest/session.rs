use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    Json,
};
use shared_types::{AppError, SessionDefaults, SessionPayload, SetDefaultsRequest};

use crate::access::{self, AccessBackend};
use crate::auth::cookies;
use crate::auth::extractors::AuthRequired;
use crate::auth::jwt::Claims;

/// Re-resolve the session and mirror its role into response cookies.
async fn refreshed_cookies(
    store: &AccessBackend,
    claims: &Claims,
    request_headers: &HeaderMap,
) -> Result<(HeaderMap, SessionPayload), AppError> {
    let payload = access::assemble_session(store, claims.sub).await?;
    let token = cookies::extract_access_token(request_headers);

    let mut headers = HeaderMap::new();
    cookies::set_session_cookies(&mut headers, token.as_deref(), claims, payload.role)?;
    Ok((headers, payload))
}

/// Cookies to send after a successful write. The write already happened,
/// so a failed refresh must not fail the request: the role cookie is
/// expired instead and the next session read re-resolves it.
fn cookies_after_write(
    user_id: i64,
    refreshed: Result<(HeaderMap, SessionPayload), AppError>,
) -> HeaderMap {
    match refreshed {
        Ok((headers, _)) => headers,
        Err(e) => {
            tracing::warn!(user_id, error = %e, "Role cookie refresh failed after write");
            let mut headers = HeaderMap::new();
            if let Ok(clear) = cookies::build_clear_cookie(cookies::ROLE_COOKIE) {
                headers.append(header::SET_COOKIE, clear);
            }
            headers
        }
    }
}

/// GET /api/session
///
/// Profile, active role and accessible clients of the caller. Also sets the
/// role cookie read by the page guard.
#[utoipa::path(
    get,
    path = "/api/session",
    responses(
        (status = 200, description = "Current session", body = SessionPayload),
        (status = 401, description = "Not authenticated", body = AppError)
    ),
    tag = "session"
)]
pub async fn get_session(
    State(store): State<AccessBackend>,
    auth: AuthRequired,
    headers: HeaderMap,
) -> Result<(HeaderMap, Json<SessionPayload>), AppError> {
    let (cookie_headers, payload) = refreshed_cookies(&store, &auth.0, &headers).await?;
    Ok((cookie_headers, Json(payload)))
}

/// PUT /api/session/defaults
///
/// Store the caller's default client and workspace.
#[utoipa::path(
    put,
    path = "/api/session/defaults",
    request_body = SetDefaultsRequest,
    responses(
        (status = 200, description = "Defaults stored", body = SessionDefaults),
        (status = 400, description = "Workspace does not belong to client", body = AppError),
        (status = 401, description = "Not authenticated", body = AppError),
        (status = 403, description = "No grant for client or workspace", body = AppError),
        (status = 404, description = "Workspace not found", body = AppError)
    ),
    tag = "session"
)]
pub async fn set_defaults(
    State(store): State<AccessBackend>,
    auth: AuthRequired,
    headers: HeaderMap,
    Json(body): Json<SetDefaultsRequest>,
) -> Result<(HeaderMap, Json<SessionDefaults>), AppError> {
    let user_id = auth.0.sub;
    let defaults = access::set_defaults(&store, user_id, body.client_id, body.workspace_id).await?;

    let refreshed = refreshed_cookies(&store, &auth.0, &headers).await;
    Ok((cookies_after_write(user_id, refreshed), Json(defaults)))
}

/// DELETE /api/session/defaults
#[utoipa::path(
    delete,
    path = "/api/session/defaults",
    responses(
        (status = 204, description = "Defaults cleared"),
        (status = 401, description = "Not authenticated", body = AppError)
    ),
    tag = "session"
)]
pub async fn clear_defaults(
    State(store): State<AccessBackend>,
    auth: AuthRequired,
    headers: HeaderMap,
) -> Result<(StatusCode, HeaderMap), AppError> {
    access::clear_defaults(&store, auth.0.sub).await?;

    let refreshed = refreshed_cookies(&store, &auth.0, &headers).await;
    Ok((StatusCode::NO_CONTENT, cookies_after_write(auth.0.sub, refreshed)))
}

/// POST /api/session/logout
///
/// Expires the access and role cookies. Works without a valid token.
#[utoipa::path(
    post,
    path = "/api/session/logout",
    responses(
        (status = 204, description = "Cookies cleared")
    ),
    tag = "session"
)]
pub async fn logout() -> Result<(StatusCode, HeaderMap), AppError> {
    let mut headers = HeaderMap::new();
    cookies::clear_session_cookies(&mut headers)?;
    Ok((StatusCode::NO_CONTENT, headers))
}
