// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for loaded plugins.
//!
//! Requests under `/api/plugins/{id}/...` are matched against the plugin's
//! declared routes and handed to its WASM handler. Admin endpoints expose
//! discovery and lifecycle control.

pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod server;

pub use error::{ApiError, ErrorResponse};
pub use server::{GatewayState, ServerConfig, router, serve};
