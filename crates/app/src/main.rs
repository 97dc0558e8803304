use std::process::ExitCode;

use server::access::PgAccessStore;
use server::db::AppState;
use server::guard::GuardTable;
use server::rate_limit::RateLimitState;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

/// Max request body; the API only takes small JSON bodies.
const MAX_BODY_BYTES: usize = 64 * 1024;

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,server=debug")),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Server exited with error");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = server::config::load_config();
    let flags = &config.features;

    if flags.telemetry {
        server::telemetry::init_telemetry();
    }
    server::health::record_start_time();

    let pool = server::db::create_pool()?;
    server::db::run_migrations(&pool).await?;

    let guard = match &config.guard {
        Some(guard) => GuardTable::from_config(guard),
        None => GuardTable::default(),
    };
    let state = AppState::new(PgAccessStore::new(pool), guard);

    let rate_limit = flags
        .rate_limit
        .then(|| RateLimitState::from_config(&config.rate_limit));

    let router = server::openapi::app_router(state, rate_limit, flags.telemetry)
        .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        // Without a signal handler, keep serving until killed.
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
