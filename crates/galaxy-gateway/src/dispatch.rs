// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dispatch of `/api/plugins/{id}/{*path}` into plugin handlers.
//!
//! The active check runs as route middleware so that no guest code executes
//! for a disabled plugin. Handlers run on the blocking pool since a guest may
//! block on host calls.

use std::str::FromStr;

use axum::{
    body::Bytes,
    extract::{Path, Request, State},
    http::{Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use galaxy_core::{HttpMethod, PluginId};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::server::GatewayState;

/// Handler input used when the request has no body.
pub const EMPTY_INPUT: &[u8] = b"{}";

pub(crate) fn parse_plugin_id(raw: &str) -> Result<PluginId, ApiError> {
    PluginId::from_str(raw).map_err(|_| ApiError::not_found(format!("plugin '{raw}' not found")))
}

/// Reject requests to loaded plugins whose status is inactive.
pub async fn require_active(
    State(state): State<GatewayState>,
    Path((id, _path)): Path<(String, String)>,
    request: Request,
    next: Next,
) -> Response {
    let id = match parse_plugin_id(&id) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };
    match state.manager.get(id) {
        Ok(Some(plugin)) if !plugin.is_active() => {
            debug!(plugin_id = %id, "request rejected, plugin is disabled");
            ApiError::new(StatusCode::FORBIDDEN, format!("plugin {id} is disabled")).into_response()
        }
        Ok(_) => next.run(request).await,
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// `ANY /api/plugins/{id}/{*path}`
pub async fn plugin_request(
    State(state): State<GatewayState>,
    Path((id, path)): Path<(String, String)>,
    method: Method,
    body: Bytes,
) -> Result<Response, ApiError> {
    let id = parse_plugin_id(&id)?;
    let method = HttpMethod::from_str(method.as_str()).map_err(|_| {
        ApiError::new(
            StatusCode::METHOD_NOT_ALLOWED,
            format!("method {method} is not supported"),
        )
    })?;
    let route_path = format!("/{path}");

    let Some(resolved) = state.manager.resolve(id, method, &route_path)? else {
        if state.manager.is_loaded(id)? {
            return Err(ApiError::not_found(format!(
                "plugin {id} has no route {method} {route_path}"
            )));
        }
        return Err(ApiError::not_found(format!("plugin {id} is not loaded")));
    };
    // Status may have flipped since the middleware ran.
    if !resolved.plugin.is_active() {
        return Err(ApiError::new(
            StatusCode::FORBIDDEN,
            format!("plugin {id} is disabled"),
        ));
    }

    let input = if body.is_empty() {
        EMPTY_INPUT.to_vec()
    } else {
        body.to_vec()
    };
    let handler = resolved.handler;
    let plugin = resolved.plugin;
    debug!(plugin_id = %id, %method, path = %route_path, handler = %handler, "dispatching plugin request");

    let output = tokio::task::spawn_blocking(move || plugin.invoke(&handler, &input))
        .await
        .map_err(|e| {
            warn!(plugin_id = %id, error = %e, "plugin handler task failed");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "plugin handler task failed")
        })??;

    Ok(([(header::CONTENT_TYPE, "application/json")], output).into_response())
}
