// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Galaxy plugin runtime.
//!
//! This crate provides the error taxonomy, the identifiers and enums shared
//! by every other crate, and the [`PluginStore`] trait through which the
//! runtime talks to its persistence backend.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{GalaxyError, MemoryFault};
pub use traits::PluginStore;
pub use types::{
    HttpMethod, PluginId, PluginIdentity, PluginStatus, RouteRecord, parse_folder_id,
};
