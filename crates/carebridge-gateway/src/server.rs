// SPDX-FileCopyrightText: 2026 CareBridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! `/health` is public; everything under `/v1` sits behind the bearer-token
//! middleware. Patient session routes and staff routes share one router and
//! one orchestrator.

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use carebridge_core::CareError;
use carebridge_orchestrator::Orchestrator;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{auth_middleware, AuthConfig};
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub orchestrator: Arc<Orchestrator>,
    pub auth: AuthConfig,
}

/// Gateway server configuration (mirrors `GatewayConfig` from
/// carebridge-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub bearer_token: Option<String>,
}

/// Build the full application router.
pub fn build_router(state: GatewayState) -> Router {
    let public_routes = Router::new().route("/health", get(handlers::get_health));

    let api_routes = Router::new()
        .route("/v1/sessions", post(handlers::create_session))
        .route("/v1/sessions/{token}/messages", post(handlers::send_message))
        .route("/v1/sessions/{token}/cancel", post(handlers::cancel_generation))
        .route("/v1/sessions/{token}/history", get(handlers::get_history))
        .route("/v1/sessions/{token}/close", post(handlers::close_session))
        .route("/v1/staff/conversations", get(handlers::list_active))
        .route("/v1/staff/handoffs", get(handlers::list_handoffs))
        .route(
            "/v1/staff/conversations/{token}/takeover",
            post(handlers::takeover),
        )
        .route(
            "/v1/staff/conversations/{token}/release",
            post(handlers::release),
        )
        .route(
            "/v1/staff/conversations/{token}/messages",
            post(handlers::staff_send_message),
        )
        .route(
            "/v1/staff/conversations/{token}/transcript",
            get(handlers::get_transcript),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Start the gateway and serve until the shutdown signal resolves.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<(), CareError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CareError::Config(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| CareError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}
