// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Axum server wiring: routes, middleware, shared state.

use std::sync::Arc;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use confab_core::ConfabError;
use confab_runner::Orchestrator;
use confab_store::Database;

use crate::handlers;

/// State handed to every request handler.
#[derive(Clone)]
pub struct GatewayState {
    /// The run/queue orchestrator all thread traffic goes through.
    pub orchestrator: Arc<Orchestrator>,
    /// Store handle for plain transcript reads.
    pub db: Database,
}

/// Gateway server configuration.
///
/// Mirrors the `[server]` section from `confab-config` to avoid a dependency
/// on the config crate from the gateway crate.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to listen on.
    pub bind_address: String,
    /// TCP port to listen on.
    pub port: u16,
    /// Allowed CORS origins; `"*"` anywhere in the list means permissive.
    pub allowed_origins: Vec<String>,
}

/// Build the gateway router over the given state.
///
/// Routes:
/// - GET /health
/// - GET /v1/threads/{id}/messages
/// - POST /v1/threads/{id}/messages
/// - POST /v1/threads/{id}/drain
pub fn build_router(state: GatewayState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route(
            "/v1/threads/{id}/messages",
            get(handlers::get_thread_messages).post(handlers::post_thread_message),
        )
        .route("/v1/threads/{id}/drain", post(handlers::post_thread_drain))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Start the gateway HTTP server and serve until the process exits.
pub async fn start_server(config: &ServerConfig, state: GatewayState) -> Result<(), ConfabError> {
    let app = build_router(state, &config.allowed_origins);

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ConfabError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| ConfabError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}
