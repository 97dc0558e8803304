use axum::Router;
use shared_types::{
    AccessibleClient, AccessibleWorkspace, AppError, AppErrorKind, ClientAccessEntry, Role,
    SessionDefaults, SessionPayload, SessionUser, SetClientAccessRequest, SetDefaultsRequest,
    SetWorkspaceAccessRequest, UserAccessResponse, WorkspaceAccessEntry,
};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::auth::middleware::auth_middleware;
use crate::db::AppState;
use crate::health;
use crate::pages;
use crate::rate_limit::RateLimitState;
use crate::rest;
use crate::telemetry::OtelTraceLayer;

#[derive(OpenApi)]
#[openapi(
    paths(
        // Session
        rest::session::get_session,
        rest::session::set_defaults,
        rest::session::clear_defaults,
        rest::session::logout,
        // Grant administration
        rest::access_admin::get_user_access,
        rest::access_admin::set_client_access,
        rest::access_admin::remove_client_access,
        rest::access_admin::set_workspace_access,
        rest::access_admin::remove_workspace_access,
        // Health
        health::health_check,
    ),
    components(schemas(
        AppError, AppErrorKind,
        // Session schemas
        SessionPayload, SessionUser, AccessibleClient, AccessibleWorkspace, Role,
        SetDefaultsRequest, SessionDefaults,
        // Admin schemas
        SetClientAccessRequest, SetWorkspaceAccessRequest, ClientAccessEntry,
        WorkspaceAccessEntry, UserAccessResponse,
        health::HealthResponse,
    )),
    tags(
        (name = "session", description = "Session, active role and default selection"),
        (name = "admin", description = "Client and workspace grant administration"),
        (name = "health", description = "Health check endpoint")
    ),
    info(
        title = "DesignOps Access API",
        description = "Tenant-scoped access resolution for the design operations dashboard",
        version = "1.0.0"
    )
)]
pub struct ApiDoc;

/// Build an Axum router that serves the API docs at `/docs`, the REST API
/// at `/api/*` and the health check.
pub fn api_router(state: AppState, rate_limit: Option<RateLimitState>) -> Router {
    let rest = match rate_limit {
        Some(limiter) => rest::api_router_with_rate_limit(limiter),
        None => rest::api_router(),
    };

    Router::new()
        .merge(rest)
        .route("/health", axum::routing::get(health::health_check))
        .with_state(state)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
}

/// API plus guarded pages, behind the auth middleware. Transport layers
/// (request ids, tracing, body limits) are added by the binary.
pub fn app_router(state: AppState, rate_limit: Option<RateLimitState>, telemetry: bool) -> Router {
    let pages = pages::page_router(state.guard.clone());

    let mut router = api_router(state, rate_limit).fallback_service(pages);
    // Inside the auth layer so spans see the caller's claims
    if telemetry {
        router = router.layer(OtelTraceLayer);
    }
    router.layer(axum::middleware::from_fn(auth_middleware))
}
