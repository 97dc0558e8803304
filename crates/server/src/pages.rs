//! Minimal HTML shell for the dashboard pages. The real UI is rendered
//! client-side; the server only decides whether a navigation may load it.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::Query,
    http::Uri,
    middleware,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use shared_types::AppError;

use crate::guard::{route_guard, GuardTable};

/// Page routes behind the route guard. Mounted as the fallback of the API
/// router so unknown paths reach the shell.
pub fn page_router(guard: Arc<GuardTable>) -> Router {
    Router::new()
        .route("/login", get(login_page))
        .route("/forbidden", get(forbidden_page))
        .route("/", get(app_shell))
        .route("/{*path}", get(app_shell))
        .layer(middleware::from_fn_with_state(guard, route_guard))
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn document(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        escape_html(title),
        body
    ))
}

async fn login_page(Query(params): Query<HashMap<String, String>>) -> Html<String> {
    let next = params.get("next").map(String::as_str).unwrap_or("/");
    document(
        "Sign in",
        &format!(
            "<main id=\"login\" data-next=\"{}\"><h1>Sign in</h1></main>",
            escape_html(next)
        ),
    )
}

async fn forbidden_page(Query(params): Query<HashMap<String, String>>) -> Html<String> {
    let field = |key: &str| escape_html(params.get(key).map(String::as_str).unwrap_or(""));
    document(
        "Access denied",
        &format!(
            "<main id=\"forbidden\" data-reason=\"{}\" data-route=\"{}\" data-role=\"{}\"><h1>Access denied</h1></main>",
            field("reason"),
            field("route"),
            field("role")
        ),
    )
}

async fn app_shell(uri: Uri) -> Response {
    // Unknown API paths fall through to here; answer them as API errors.
    if uri.path().starts_with("/api/") {
        return AppError::not_found(format!("No route for {}", uri.path())).into_response();
    }

    document(
        "DesignOps",
        &format!(
            "<div id=\"app\" data-route=\"{}\"></div>\n<script type=\"module\" src=\"/assets/app.js\"></script>",
            escape_html(uri.path())
        ),
    )
    .into_response()
}
