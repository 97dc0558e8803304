pub mod access_admin;
pub mod session;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::db::AppState;

/// Build the REST API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        // Session
        .route("/api/session", get(session::get_session))
        .route(
            "/api/session/defaults",
            put(session::set_defaults).delete(session::clear_defaults),
        )
        .route("/api/session/logout", post(session::logout))
        // Grant administration (super-admin)
        .route(
            "/api/admin/access/users/{user_id}",
            get(access_admin::get_user_access),
        )
        .route("/api/admin/access/clients", put(access_admin::set_client_access))
        .route(
            "/api/admin/access/clients/{user_id}/{client_id}",
            delete(access_admin::remove_client_access),
        )
        .route(
            "/api/admin/access/workspaces",
            put(access_admin::set_workspace_access),
        )
        .route(
            "/api/admin/access/workspaces/{user_id}/{workspace_id}",
            delete(access_admin::remove_workspace_access),
        )
}

/// Build the REST API router with rate limiting applied.
pub fn api_router_with_rate_limit(
    rate_limit: crate::rate_limit::RateLimitState,
) -> Router<AppState> {
    api_router().layer(axum::middleware::from_fn_with_state(
        rate_limit,
        crate::rate_limit::rate_limit_middleware,
    ))
}
