use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use serde_json::Value;
use sqlx::{Pool, Postgres};
use tokio::sync::{Mutex, MutexGuard};
use server::access::{MemoryAccessStore, PgAccessStore};
use server::auth::cookies::RoleCookie;
use server::auth::jwt::Claims;
use server::db::AppState;
use server::guard::GuardTable;
use server::rate_limit::RateLimitState;
use shared_types::{ActiveRole, Role};
use tower::ServiceExt;
use uuid::Uuid;

/// Secrets are process-wide; every test sets the same values.
fn setup_secrets() {
    std::env::set_var("JWT_SECRET", "integration-test-jwt-secret");
    std::env::set_var("ROLE_COOKIE_SECRET", "integration-test-role-secret");
}

/// Build the full application router over a fresh in-memory store.
/// The returned store handle is used to seed users, clients and grants.
pub fn test_app() -> (Router, Arc<MemoryAccessStore>) {
    build_app(None)
}

/// Same as [`test_app`] with the API rate limited to `max_requests` per minute.
pub fn test_app_rate_limited(max_requests: u32) -> (Router, Arc<MemoryAccessStore>) {
    build_app(Some(RateLimitState::new(
        max_requests,
        std::time::Duration::from_secs(60),
    )))
}

fn build_app(rate_limit: Option<RateLimitState>) -> (Router, Arc<MemoryAccessStore>) {
    setup_secrets();
    let store = Arc::new(MemoryAccessStore::new());
    let state = AppState::new(store.clone(), GuardTable::default());
    let router = server::openapi::app_router(state, rate_limit, false);
    (router, store)
}

/// Serializes tests that share the Postgres database. Each one truncates
/// and re-seeds while holding the lock.
static TEST_MUTEX: std::sync::LazyLock<Mutex<()>> = std::sync::LazyLock::new(|| Mutex::new(()));

/// A migrated, truncated Postgres store, or `None` when no test database is
/// configured. Hold the returned guard for the whole test.
pub async fn pg_store() -> Option<(PgAccessStore, Pool<Postgres>, MutexGuard<'static, ()>)> {
    let guard = TEST_MUTEX.lock().await;
    setup_secrets();
    let _ = dotenvy::dotenv();

    let Ok(database_url) =
        std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL"))
    else {
        println!("TEST_DATABASE_URL not set; skipping Postgres test");
        return None;
    };

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(8)
        .connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    sqlx::query(
        "TRUNCATE default_selections, workspace_access, client_access, workspaces, clients, users RESTART IDENTITY CASCADE",
    )
    .execute(&pool)
    .await
    .expect("Failed to truncate");

    Some((PgAccessStore::new(pool.clone()), pool, guard))
}

/// Full router over a Postgres store.
pub fn pg_app(store: PgAccessStore) -> Router {
    setup_secrets();
    let state = AppState::new(store, GuardTable::default());
    server::openapi::app_router(state, None, false)
}

pub async fn pg_user(pool: &Pool<Postgres>, email: &str, super_admin: bool) -> i64 {
    sqlx::query_scalar("INSERT INTO users (email, display_name, super_admin) VALUES ($1, $1, $2) RETURNING id")
        .bind(email)
        .bind(super_admin)
        .fetch_one(pool)
        .await
        .expect("Failed to seed user")
}

pub async fn pg_client(pool: &Pool<Postgres>, name: &str) -> Uuid {
    sqlx::query_scalar("INSERT INTO clients (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .expect("Failed to seed client")
}

pub async fn pg_workspace(pool: &Pool<Postgres>, client_id: Uuid, name: &str) -> Uuid {
    sqlx::query_scalar("INSERT INTO workspaces (client_id, name) VALUES ($1, $2) RETURNING id")
        .bind(client_id)
        .bind(name)
        .fetch_one(pool)
        .await
        .expect("Failed to seed workspace")
}

/// [`seed_tenants`] against Postgres.
pub async fn pg_tenants(pool: &Pool<Postgres>) -> Tenants {
    let client_a = pg_client(pool, "Acme").await;
    let ws_a1 = pg_workspace(pool, client_a, "Acme Web").await;
    let client_b = pg_client(pool, "Bolt").await;
    let ws_b1 = pg_workspace(pool, client_b, "Bolt Mobile").await;
    Tenants {
        client_a,
        ws_a1,
        client_b,
        ws_b1,
    }
}

/// Two clients with one workspace each, matching the usual fixture:
/// A owns A1, B owns B1.
pub struct Tenants {
    pub client_a: Uuid,
    pub ws_a1: Uuid,
    pub client_b: Uuid,
    pub ws_b1: Uuid,
}

pub fn seed_tenants(store: &MemoryAccessStore) -> Tenants {
    let client_a = store.insert_client("Acme");
    let ws_a1 = store.insert_workspace(client_a, "Acme Web");
    let client_b = store.insert_client("Bolt");
    let ws_b1 = store.insert_workspace(client_b, "Bolt Mobile");
    Tenants {
        client_a,
        ws_a1,
        client_b,
        ws_b1,
    }
}

/// Mint an access token for a seeded user.
pub fn token_for(user_id: i64, super_admin: bool) -> String {
    setup_secrets();
    server::auth::jwt::create_access_token(user_id, &format!("user{user_id}@example.com"), super_admin)
        .expect("Failed to create test token")
}

fn claims_of(token: &str) -> Claims {
    setup_secrets();
    server::auth::jwt::validate_access_token(token).expect("Failed to decode test token")
}

/// Signed role cookie value bound to `token`, as the session endpoint would write it.
pub fn role_cookie_for(token: &str, role: ActiveRole) -> String {
    server::auth::cookies::sign_role(&claims_of(token), Some(role)).expect("Failed to sign role")
}

/// What the guard would read from `value` when presented alongside `token`.
pub fn cookie_role(value: &str, token: &str) -> RoleCookie {
    server::auth::cookies::verify_role(value, &claims_of(token), chrono::Utc::now().timestamp())
}

pub fn scoped(role: Role) -> ActiveRole {
    ActiveRole::Scoped(role)
}

/// Build a request carrying the access token as a cookie, plus an optional
/// raw role cookie value.
pub fn request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    role_cookie: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut cookies = Vec::new();
    if let Some(token) = token {
        cookies.push(format!("{}={}", server::auth::cookies::ACCESS_COOKIE, token));
    }
    if let Some(role) = role_cookie {
        cookies.push(format!("{}={}", server::auth::cookies::ROLE_COOKIE, role));
    }

    let mut builder = Request::builder().method(method).uri(uri);
    if !cookies.is_empty() {
        builder = builder.header(header::COOKIE, cookies.join("; "));
    }

    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Send a request through the router; non-JSON bodies parse as `Null`.
pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app
        .clone()
        .oneshot(req)
        .await
        .expect("Failed to send request");

    let status = response.status();
    let headers = response.headers().clone();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");

    let body = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);
    (status, headers, body)
}

pub async fn get(app: &Router, uri: &str, token: Option<&str>) -> (StatusCode, HeaderMap, Value) {
    send(app, request("GET", uri, token, None, None)).await
}

pub async fn put_json(
    app: &Router,
    uri: &str,
    token: &str,
    body: Value,
) -> (StatusCode, HeaderMap, Value) {
    send(app, request("PUT", uri, Some(token), None, Some(body))).await
}

pub async fn delete(app: &Router, uri: &str, token: &str) -> (StatusCode, HeaderMap, Value) {
    send(app, request("DELETE", uri, Some(token), None, None)).await
}

/// Navigate to a page with the given credentials; returns status and Location.
pub async fn navigate(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    role_cookie: Option<&str>,
) -> (StatusCode, Option<String>) {
    let (status, headers, _) = send(app, request("GET", uri, token, role_cookie, None)).await;
    let location = headers
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    (status, location)
}

/// The value a response sets for a cookie; `Some("")` means cleared.
pub fn set_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| {
            let pair = v.split(';').next()?;
            let (key, value) = pair.split_once('=')?;
            (key.trim() == name).then(|| value.trim().to_string())
        })
}

/// True if the response expires the named cookie.
pub fn clears_cookie(headers: &HeaderMap, name: &str) -> bool {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with(&format!("{name}=;")) && v.contains("Max-Age=0"))
}
