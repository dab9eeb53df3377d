// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discovery of installed plugin folders under the plugins root.
//!
//! A plugin folder is a direct child of the root named `<name>-<id>` that
//! contains a `plugin.yml`. The persisted installation store decides which
//! folders count: a folder whose ID is not installed is skipped.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use galaxy_core::{GalaxyError, PluginId, PluginStatus, PluginStore, parse_folder_id};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::manager::{Plugin, PluginManager};
use crate::manifest::{MANIFEST_FILE, load_manifest};
use crate::watcher::PluginActions;

/// Error recorded when a discovered plugin has no binary.
pub const WASM_NOT_FOUND: &str = "WASM file not found";

/// What a directory scan found for one plugin folder.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryRecord {
    pub id: PluginId,
    pub name: String,
    pub version: String,
    pub author: String,
    pub description: String,
    pub path: PathBuf,
    pub manifest_path: PathBuf,
    pub wasm_path: PathBuf,
    pub status: PluginStatus,
    pub discovered_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DiscoveryRecord {
    pub fn is_loadable(&self) -> bool {
        self.error.is_none()
    }
}

pub struct PluginRegistry {
    root: PathBuf,
    manager: Arc<PluginManager>,
    store: Arc<dyn PluginStore>,
}

impl PluginRegistry {
    pub fn new(root: impl Into<PathBuf>, manager: Arc<PluginManager>) -> Self {
        let store = Arc::clone(manager.store());
        Self {
            root: root.into(),
            manager,
            store,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manager(&self) -> &Arc<PluginManager> {
        &self.manager
    }

    /// Create the plugins root if it does not exist.
    pub fn ensure_root(&self) -> Result<(), GalaxyError> {
        std::fs::create_dir_all(&self.root).map_err(|e| {
            GalaxyError::Internal(format!(
                "failed to create plugins directory {}: {e}",
                self.root.display()
            ))
        })
    }

    /// Scan every plugin folder under the root, ordered by ID.
    ///
    /// Folders that are not plugins, fail to parse, or are not installed are
    /// skipped; a missing root yields an empty list.
    pub async fn discover_all(&self) -> Result<Vec<DiscoveryRecord>, GalaxyError> {
        let mut records = Vec::new();
        for folder in self.plugin_folders()? {
            match self.discover_folder(&folder).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => {
                    warn!(path = %folder.display(), error = %e, "skipping plugin folder");
                }
            }
        }
        records.sort_by_key(|r| r.id);
        Ok(records)
    }

    /// Describe the plugin in `folder`, or `None` if it is not an installed plugin.
    pub async fn discover_folder(
        &self,
        folder: &Path,
    ) -> Result<Option<DiscoveryRecord>, GalaxyError> {
        let manifest_path = folder.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            return Ok(None);
        }
        let Some(id) = folder_id(folder) else {
            debug!(path = %folder.display(), "folder name has no plugin ID suffix");
            return Ok(None);
        };

        let manifest = load_manifest(&manifest_path)?;
        if !self.store.is_installed(id).await? {
            debug!(plugin_id = %id, path = %folder.display(), "plugin folder is not installed");
            return Ok(None);
        }

        let wasm_path = folder.join(manifest.wasm_file_name());
        let meta = &manifest.metadata;
        let mut record = DiscoveryRecord {
            id,
            name: meta.name.clone(),
            version: meta.version.clone(),
            author: meta.author.clone(),
            description: meta.description.clone(),
            path: folder.to_path_buf(),
            manifest_path,
            wasm_path: wasm_path.clone(),
            status: PluginStatus::Inactive,
            discovered_at: Utc::now(),
            last_modified: None,
            error: None,
        };

        match std::fs::metadata(&wasm_path) {
            Ok(info) => {
                record.last_modified = info.modified().ok().map(DateTime::<Utc>::from);
                record.status = self
                    .store
                    .plugin_status(id)
                    .await?
                    .unwrap_or(PluginStatus::Inactive);
            }
            Err(_) => {
                record.error = Some(WASM_NOT_FOUND.to_string());
            }
        }

        Ok(Some(record))
    }

    /// Load every discovered plugin whose binary is present.
    ///
    /// Failures are logged and skipped.
    pub async fn load_all(&self) -> Result<Vec<Arc<Plugin>>, GalaxyError> {
        let mut loaded = Vec::new();
        for record in self.discover_all().await? {
            if !record.is_loadable() {
                warn!(plugin_id = %record.id, name = %record.name, error = ?record.error, "plugin not loadable");
                continue;
            }
            match self.manager.load(&record.path).await {
                Ok(plugin) => loaded.push(plugin),
                Err(e) => warn!(plugin_id = %record.id, name = %record.name, error = %e, "failed to load plugin"),
            }
        }
        info!(count = loaded.len(), root = %self.root.display(), "plugins loaded");
        Ok(loaded)
    }

    /// Load the plugin in the folder called `folder_name` under the root.
    pub async fn load(&self, folder_name: &str) -> Result<Arc<Plugin>, GalaxyError> {
        let folder = self.root.join(folder_name);
        if !folder.is_dir() {
            return Err(GalaxyError::manifest(format!(
                "plugin directory not found: {}",
                folder.display()
            )));
        }
        self.manager.load(&folder).await
    }

    pub async fn load_by_id(&self, id: PluginId) -> Result<Arc<Plugin>, GalaxyError> {
        let folder = self.find_folder(id)?.ok_or(GalaxyError::PluginNotFound(id))?;
        self.manager.load(&folder).await
    }

    pub fn unload(&self, id: PluginId) -> Result<bool, GalaxyError> {
        self.manager.unload(id)
    }

    /// Unload then load `id` from its folder. Not atomic.
    pub async fn reload(&self, id: PluginId) -> Result<Arc<Plugin>, GalaxyError> {
        let folder = match self.manager.get(id)? {
            Some(plugin) => plugin.path().to_path_buf(),
            None => self.find_folder(id)?.ok_or(GalaxyError::PluginNotFound(id))?,
        };
        self.manager.unload(id)?;
        self.manager.load(&folder).await
    }

    /// The plugin folder for `id`, if one exists under the root.
    pub fn find_folder(&self, id: PluginId) -> Result<Option<PathBuf>, GalaxyError> {
        Ok(self
            .plugin_folders()?
            .into_iter()
            .find(|folder| folder_id(folder) == Some(id) && folder.join(MANIFEST_FILE).is_file()))
    }

    fn plugin_folders(&self) -> Result<Vec<PathBuf>, GalaxyError> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(GalaxyError::Internal(format!(
                    "failed to read plugins directory {}: {e}",
                    self.root.display()
                )));
            }
        };

        let mut folders: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        folders.sort();
        Ok(folders)
    }
}

fn folder_id(folder: &Path) -> Option<PluginId> {
    folder
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(parse_folder_id)
}

#[async_trait]
impl PluginActions for PluginRegistry {
    async fn reload(&self, id: PluginId) -> Result<(), GalaxyError> {
        PluginRegistry::reload(self, id).await.map(|_| ())
    }

    async fn load_folder(&self, folder: &Path) -> Result<(), GalaxyError> {
        self.manager.load(folder).await.map(|_| ())
    }

    async fn unload(&self, id: PluginId) -> Result<(), GalaxyError> {
        PluginRegistry::unload(self, id).map(|_| ())
    }
}
