// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence trait for plugin identity, installation, and status records.

use async_trait::async_trait;

use crate::error::GalaxyError;
use crate::types::{PluginId, PluginIdentity, PluginStatus};

/// Durable store of installed plugins.
///
/// The store is the source of truth for plugin status across restarts; the
/// in-memory status held by the manager is a cache of it.
#[async_trait]
pub trait PluginStore: Send + Sync {
    /// Look up the ID persisted for an identity, if it has been installed.
    async fn find_plugin_id(
        &self,
        identity: &PluginIdentity,
    ) -> Result<Option<PluginId>, GalaxyError>;

    /// Whether an installation record exists for `id`.
    async fn is_installed(&self, id: PluginId) -> Result<bool, GalaxyError>;

    /// Persisted status of `id`, or `None` if no installation record exists.
    async fn plugin_status(&self, id: PluginId) -> Result<Option<PluginStatus>, GalaxyError>;

    /// Persist a new status for `id`.
    async fn set_plugin_status(
        &self,
        id: PluginId,
        status: PluginStatus,
    ) -> Result<(), GalaxyError>;

    /// Record an installation and return the plugin's ID.
    ///
    /// Installing an identity that already exists returns the existing ID.
    async fn create_installation(
        &self,
        identity: &PluginIdentity,
        status: PluginStatus,
    ) -> Result<PluginId, GalaxyError>;

    /// Remove the installation record for `id`. Removing a missing record is not an error.
    async fn delete_installation(&self, id: PluginId) -> Result<(), GalaxyError>;
}
