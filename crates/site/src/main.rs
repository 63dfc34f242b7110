//! Chapter site - public content API.
//!
//! Serves the read-only content API and the public forms on port 3000.
//!
//! # Backends
//!
//! With `SITE_DATABASE_URL` set, every collection lives in `PostgreSQL`
//! (`site.document`). Without it the site runs entirely in memory and all
//! content is lost on exit.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use axum::http::{Method, header};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use chapter_site::config::SiteConfig;
use chapter_site::state::AppState;
use chapter_site::{db, routes, telemetry};

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration from environment (needed for Sentry init)
    let config = match SiteConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            // No subscriber yet
            #[allow(clippy::print_stderr)]
            {
                eprintln!("Failed to load configuration: {e}");
            }
            return ExitCode::FAILURE;
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = telemetry::init_sentry(&config);
    telemetry::init_tracing("chapter_site=info,tower_http=debug");

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Site server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: SiteConfig) -> Result<(), Box<dyn std::error::Error>> {
    // NOTE: Migrations are NOT run automatically on startup.
    // Run them explicitly via: cargo run -p chapter-cli -- migrate
    let pool = match &config.database_url {
        Some(url) => {
            let pool = db::create_pool(url).await?;
            tracing::info!("Database pool created, using remote document store");
            Some(pool)
        }
        None => {
            tracing::warn!("No database configured, content is held in memory only");
            None
        }
    };

    let addr = config.socket_addr();
    let state = AppState::new(config, pool);

    // Public API, callable from any origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let app = routes::routes()
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("site listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
