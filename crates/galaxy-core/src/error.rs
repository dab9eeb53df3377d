// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Galaxy plugin runtime.

use thiserror::Error;

use crate::types::PluginId;

/// Boxed cause attached to errors that wrap a lower-level failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A failed access to a guest's linear memory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryFault {
    /// The guest's `allocate` export is missing or failed.
    #[error("guest allocation failed: {0}")]
    Allocation(String),

    /// A write fell outside the guest's current memory size.
    #[error("out-of-range guest memory write at {ptr} ({len} bytes)")]
    Write { ptr: u32, len: u32 },

    /// A read fell outside the guest's current memory size.
    #[error("out-of-range guest memory read at {ptr} ({len} bytes)")]
    Read { ptr: u32, len: u32 },
}

/// The primary error type used across the runtime, bridge, scanner, and gateway.
#[derive(Debug, Error)]
pub enum GalaxyError {
    /// Malformed manifest YAML or missing/invalid identity fields.
    #[error("manifest error: {message}")]
    Manifest {
        message: String,
        source: Option<BoxError>,
    },

    /// WASM binary missing, unreadable, or failed to compile/instantiate.
    #[error("binary error: {message}")]
    Binary {
        message: String,
        source: Option<BoxError>,
    },

    /// Guest memory allocation or out-of-range access.
    #[error("memory error: {0}")]
    Memory(MemoryFault),

    /// Handler or `allocate` export not present on the guest.
    #[error("function `{function}` not exported by plugin {plugin_id}")]
    FunctionNotFound {
        plugin_id: PluginId,
        function: String,
    },

    /// Host API call outside the manifest's declared permission set.
    #[error("plugin {plugin_id} is not permitted to access `{resource}`")]
    PermissionDenied {
        plugin_id: PluginId,
        resource: String,
    },

    /// Identity/status lookup or update failure against the plugin store.
    #[error("persistence error: {message}")]
    Persistence {
        message: String,
        source: Option<BoxError>,
    },

    /// Archive extraction or parse failure during a security scan.
    #[error("scan error: {message}")]
    Scan {
        message: String,
        source: Option<BoxError>,
    },

    /// The addressed plugin is not loaded.
    #[error("plugin {0} is not loaded")]
    PluginNotFound(PluginId),

    /// The guest trapped while executing a handler.
    #[error("plugin execution failed: {message}")]
    Execution { message: String },

    /// Configuration errors.
    #[error("configuration error: {0}")]
    Config(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GalaxyError {
    /// Shorthand for a persistence error without an underlying cause.
    pub fn persistence(message: impl Into<String>) -> Self {
        GalaxyError::Persistence {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a manifest error without an underlying cause.
    pub fn manifest(message: impl Into<String>) -> Self {
        GalaxyError::Manifest {
            message: message.into(),
            source: None,
        }
    }

    /// HTTP status code used when this error crosses the API boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            GalaxyError::Manifest { .. } => 422,
            GalaxyError::Binary { .. } => 422,
            GalaxyError::Memory(_) => 500,
            GalaxyError::FunctionNotFound { .. } => 404,
            GalaxyError::PermissionDenied { .. } => 403,
            GalaxyError::Persistence { .. } => 500,
            GalaxyError::Scan { .. } => 400,
            GalaxyError::PluginNotFound(_) => 404,
            GalaxyError::Execution { .. } => 502,
            GalaxyError::Config(_) => 500,
            GalaxyError::Timeout { .. } => 504,
            GalaxyError::Internal(_) => 500,
        }
    }
}
