// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router, middleware as axum_middleware,
    routing::{any, delete, get, post},
};
use galaxy_core::GalaxyError;
use galaxy_plugin::{PluginManager, PluginRegistry};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::dispatch;
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub manager: Arc<PluginManager>,
    pub registry: Arc<PluginRegistry>,
    /// Process start time for uptime.
    pub started: Instant,
}

impl GatewayState {
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self {
            manager: Arc::clone(registry.manager()),
            registry,
            started: Instant::now(),
        }
    }
}

/// Gateway bind address.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Build the gateway router.
///
/// - `GET /health`
/// - `GET /api/plugins`, `GET /api/plugins/discover`
/// - `POST /api/plugins/{id}/enable|disable|reload`, `DELETE /api/plugins/{id}`
/// - `ANY /api/plugins/{id}/{*path}` into the plugin's handlers
pub fn router(state: GatewayState) -> Router {
    let admin_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .route("/api/plugins", get(handlers::list_plugins))
        .route("/api/plugins/discover", get(handlers::discover_plugins))
        .route("/api/plugins/{id}", delete(handlers::unload_plugin))
        .route("/api/plugins/{id}/enable", post(handlers::enable_plugin))
        .route("/api/plugins/{id}/disable", post(handlers::disable_plugin))
        .route("/api/plugins/{id}/reload", post(handlers::reload_plugin))
        .with_state(state.clone());

    let plugin_routes = Router::new()
        .route("/api/plugins/{id}/{*path}", any(dispatch::plugin_request))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            dispatch::require_active,
        ))
        .with_state(state);

    Router::new()
        .merge(admin_routes)
        .merge(plugin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve the gateway until `shutdown` is cancelled.
pub async fn serve(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), GalaxyError> {
    let app = router(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| GalaxyError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("Gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| GalaxyError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("Gateway stopped");
    Ok(())
}
