//! Server initialization and routing
//!
//! This module handles the Axum server setup including:
//! - Router configuration with all API endpoints
//! - Middleware stack (auth, logging, compression, etc.)
//! - Graceful shutdown handling

use crate::config::ServerConfig;
use crate::middleware::{authenticate, log_requests, request_id};
use crate::routes::{api_info, not_found};
use crate::routes::{claims, donations, health, matching, recipients};
use crate::state::ServerState;
use crate::telemetry::{init_tracing, install_metrics};
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post, put};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Build the Axum router with all routes and middleware
///
/// Routes are divided into:
/// - Public routes: /, /health, /ready, /metrics
/// - API routes: all /api/v1/* endpoints. The bearer token is resolved to
///   an identity here; role checks happen in the engine.
///
/// Middleware stack (applied in reverse order):
/// 1. Request ID tracking
/// 2. Request logging
/// 3. Timeout handling
/// 4. Compression
/// 5. CORS
/// 6. Bearer token resolution (API routes only)
pub fn build_router(state: Arc<ServerState>) -> Router {
    let cors = if state.config.enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    let public_routes = Router::new()
        .route("/", get(api_info))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics));

    let api_routes = Router::new()
        // Donations
        .route("/api/v1/donations", post(donations::submit_donation))
        .route("/api/v1/donations/mine", get(donations::my_donations))
        .route("/api/v1/donations/pending", get(donations::pending_donations))
        .route("/api/v1/donations/inventory", get(donations::inventory))
        .route("/api/v1/donations/{id}", get(donations::get_donation))
        .route(
            "/api/v1/donations/{id}/approve",
            post(donations::approve_donation),
        )
        .route(
            "/api/v1/donations/{id}/reject",
            post(donations::reject_donation),
        )
        // Matching
        .route("/api/v1/map-donation", post(matching::map_donation))
        .route(
            "/api/v1/donations/{id}/mappings",
            get(matching::donation_mappings),
        )
        // Claims
        .route("/api/v1/donations/{id}/claim", post(claims::claim_donation))
        // Recipients
        .route(
            "/api/v1/recipients/me",
            get(recipients::my_profile).patch(recipients::update_profile),
        )
        .route(
            "/api/v1/recipients/me/requirements",
            post(recipients::add_requirement),
        )
        .route(
            "/api/v1/recipients/me/requirements/{entry_id}",
            put(recipients::edit_requirement).delete(recipients::delete_requirement),
        )
        .route(
            "/api/v1/recipients/me/available",
            get(recipients::available_donations),
        )
        .route("/api/v1/recipients/me/claims", get(recipients::my_claims))
        .layer(DefaultBodyLimit::max(state.config.max_body_size()))
        .layer(from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .fallback(not_found)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.config.timeout(),
        ))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(from_fn(log_requests))
        .layer(from_fn(request_id))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the MedBridge HTTP server
///
/// Blocks until the server is shut down via SIGTERM or Ctrl+C.
///
/// # Example
///
/// ```rust,no_run
/// use server::ServerConfig;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = ServerConfig::load()?;
///     server::start_server(config).await?;
///     Ok(())
/// }
/// ```
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    init_tracing(&config.log_level);

    let mut state = ServerState::new(config.clone())?;
    if config.metrics_enabled {
        state = state.with_metrics(install_metrics()?);
    }

    let app = build_router(Arc::new(state));
    let addr: SocketAddr = config.socket_addr()?;

    tracing::info!(
        "Starting MedBridge server on {} with {} bearer tokens",
        addr,
        config.tokens.len()
    );
    tracing::info!(
        "Timeout: {}s, Max body: {}MB",
        config.timeout_secs,
        config.max_body_size_mb
    );
    tracing::info!(
        "CORS: {}, Metrics: {}",
        config.enable_cors,
        config.metrics_enabled
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Shutdown signal handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
