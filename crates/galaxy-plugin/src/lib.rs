// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin lifecycle for the Galaxy runtime.
//!
//! - [`manifest`]: `plugin.yml` parsing and validation.
//! - [`manager`]: the live instance table, route table, and handler invocation.
//! - [`registry`]: discovery of installed plugin folders and load/unload/reload by ID.
//! - [`watcher`]: filesystem events reconciled into registry actions.

pub mod manager;
pub mod manifest;
pub mod registry;
pub mod routes;
pub mod watcher;

pub use manager::{Plugin, PluginManager, PluginSummary, ResolvedRoute};
pub use manifest::{
    MANIFEST_FILE, PluginManifest, RESERVED_ROUTE_PATHS, load_manifest, parse_manifest,
};
pub use registry::{DiscoveryRecord, PluginRegistry};
pub use routes::RegisteredRoute;
pub use watcher::{PluginActions, Reconciler, WatchEvent, WatchKind, WatcherSettings};
