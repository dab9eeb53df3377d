// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-plugin route tracking.

use std::collections::HashMap;

use galaxy_core::{HttpMethod, PluginId, RouteRecord};
use serde::Serialize;

use crate::manifest::PluginManifest;

/// A mounted backend route and the guest function that serves it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisteredRoute {
    #[serde(flatten)]
    pub record: RouteRecord,
    pub handler: String,
}

impl RegisteredRoute {
    /// Every `(method, path)` pair a manifest's backend declares.
    pub fn from_manifest(manifest: &PluginManifest) -> Vec<Self> {
        manifest
            .spec
            .backend
            .routes
            .iter()
            .flat_map(|route| {
                route.http_methods().map(move |method| RegisteredRoute {
                    record: RouteRecord {
                        method,
                        path: route.path.clone(),
                    },
                    handler: route.handler.clone(),
                })
            })
            .collect()
    }
}

/// Route sets keyed by plugin ID. A plugin with an entry is registered.
#[derive(Debug, Default)]
pub(crate) struct RouteTable {
    by_plugin: HashMap<PluginId, Vec<RegisteredRoute>>,
}

impl RouteTable {
    /// Track `routes` for `id` unless a set is already tracked.
    ///
    /// Returns `false` when the plugin was already registered.
    pub(crate) fn register(&mut self, id: PluginId, routes: Vec<RegisteredRoute>) -> bool {
        if self.by_plugin.contains_key(&id) {
            return false;
        }
        self.by_plugin.insert(id, routes);
        true
    }

    pub(crate) fn remove(&mut self, id: PluginId) -> Option<Vec<RegisteredRoute>> {
        self.by_plugin.remove(&id)
    }

    pub(crate) fn routes(&self, id: PluginId) -> Vec<RegisteredRoute> {
        self.by_plugin.get(&id).cloned().unwrap_or_default()
    }

    /// Handler for `method path` on plugin `id`. A single trailing slash is ignored.
    pub(crate) fn resolve(&self, id: PluginId, method: HttpMethod, path: &str) -> Option<&str> {
        let wanted = normalize(path);
        self.by_plugin
            .get(&id)?
            .iter()
            .find(|r| r.record.method == method && normalize(&r.record.path) == wanted)
            .map(|r| r.handler.as_str())
    }
}

fn normalize(path: &str) -> &str {
    match path.strip_suffix('/') {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => path,
    }
}
