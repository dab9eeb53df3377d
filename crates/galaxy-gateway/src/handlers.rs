// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admin and health endpoints.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use galaxy_core::{PluginId, PluginStatus};
use galaxy_plugin::{DiscoveryRecord, PluginSummary};
use serde::Serialize;

use crate::dispatch::parse_plugin_id;
use crate::error::ApiError;
use crate::server::GatewayState;

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub plugins: usize,
    pub uptime_secs: u64,
}

/// Response body for status changes.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub id: PluginId,
    pub status: PluginStatus,
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Result<Json<HealthResponse>, ApiError> {
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        plugins: state.manager.list()?.len(),
        uptime_secs: state.started.elapsed().as_secs(),
    }))
}

/// GET /api/plugins
pub async fn list_plugins(
    State(state): State<GatewayState>,
) -> Result<Json<Vec<PluginSummary>>, ApiError> {
    Ok(Json(state.manager.summaries()?))
}

/// GET /api/plugins/discover
pub async fn discover_plugins(
    State(state): State<GatewayState>,
) -> Result<Json<Vec<DiscoveryRecord>>, ApiError> {
    Ok(Json(state.registry.discover_all().await?))
}

/// POST /api/plugins/{id}/enable
pub async fn enable_plugin(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let id = parse_plugin_id(&id)?;
    state.manager.enable(id).await?;
    Ok(Json(StatusResponse {
        id,
        status: PluginStatus::Active,
    }))
}

/// POST /api/plugins/{id}/disable
pub async fn disable_plugin(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let id = parse_plugin_id(&id)?;
    state.manager.disable(id).await?;
    Ok(Json(StatusResponse {
        id,
        status: PluginStatus::Inactive,
    }))
}

/// POST /api/plugins/{id}/reload
pub async fn reload_plugin(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let id = parse_plugin_id(&id)?;
    let plugin = state.registry.reload(id).await?;
    Ok(Json(StatusResponse {
        id,
        status: plugin.status(),
    }))
}

/// DELETE /api/plugins/{id}
///
/// Unloads the plugin. The installation record is left alone.
pub async fn unload_plugin(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_plugin_id(&id)?;
    if state.registry.unload(id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("plugin {id} is not loaded")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_response_serializes() {
        let json = serde_json::to_string(&StatusResponse {
            id: PluginId(4),
            status: PluginStatus::Inactive,
        })
        .unwrap();
        assert_eq!(json, r#"{"id":4,"status":"inactive"}"#);
    }

    #[test]
    fn health_response_serializes() {
        let json = serde_json::to_value(HealthResponse {
            status: "ok".to_string(),
            version: "0.1.0".to_string(),
            plugins: 2,
            uptime_secs: 42,
        })
        .unwrap();
        assert_eq!(json["plugins"], 2);
        assert_eq!(json["uptime_secs"], 42);
    }
}
