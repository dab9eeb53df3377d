// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The plugin manager: live instances, their routes, and handler calls.
//!
//! The instance table and the route table sit behind independent locks.
//! Neither lock is held while guest code runs: callers take an
//! `Arc<Plugin>` out of the table, release the lock, and then invoke.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError};

use chrono::{DateTime, Utc};
use galaxy_bridge::{HostState, KubeApi, PluginInstance, PluginRuntime};
use galaxy_core::{
    GalaxyError, HttpMethod, PluginId, PluginStatus, PluginStore, RouteRecord, parse_folder_id,
};
use serde::Serialize;
use tracing::{debug, info, warn};
use wasmtime::Module;

use crate::manifest::{MANIFEST_FILE, PluginManifest, load_manifest};
use crate::routes::{RegisteredRoute, RouteTable};

/// A loaded plugin.
pub struct Plugin {
    id: PluginId,
    manifest: PluginManifest,
    path: PathBuf,
    module: Module,
    instance: Mutex<Option<PluginInstance>>,
    closed: AtomicBool,
    active: AtomicBool,
    loaded_at: DateTime<Utc>,
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin")
            .field("id", &self.id)
            .field("name", &self.manifest.metadata.name)
            .field("path", &self.path)
            .field("status", &self.status())
            .field("loaded_at", &self.loaded_at)
            .finish()
    }
}

impl Plugin {
    pub fn id(&self) -> PluginId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.manifest.metadata.name
    }

    pub fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    /// The folder the plugin was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn status(&self) -> PluginStatus {
        if self.active.load(Ordering::Acquire) {
            PluginStatus::Active
        } else {
            PluginStatus::Inactive
        }
    }

    pub fn is_active(&self) -> bool {
        self.status().is_active()
    }

    fn set_status(&self, status: PluginStatus) {
        self.active.store(status.is_active(), Ordering::Release);
    }

    /// Whether the plugin has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Close the plugin. Closing an already closed plugin is a no-op.
    ///
    /// Never waits for a handler call in flight: the instance is dropped here
    /// if it is idle, otherwise by that call once it returns. Returns `true`
    /// if this call closed the plugin.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        match self.instance.try_lock() {
            Ok(mut guard) => drop(guard.take()),
            Err(TryLockError::Poisoned(poisoned)) => drop(poisoned.into_inner().take()),
            Err(TryLockError::WouldBlock) => {
                debug!(plugin_id = %self.id, plugin = %self.name(), "plugin busy, instance released after current call");
            }
        }
        debug!(plugin_id = %self.id, plugin = %self.name(), "plugin closed");
        true
    }

    /// Call the exported `function` with `input`.
    ///
    /// Calls on the same plugin are serialized on its instance, so this blocks
    /// while another call runs. Use from a blocking context only.
    pub fn invoke(&self, function: &str, input: &[u8]) -> Result<Vec<u8>, GalaxyError> {
        if self.is_closed() {
            return Err(GalaxyError::PluginNotFound(self.id));
        }
        let mut guard = self.instance.lock().map_err(|e| {
            GalaxyError::Internal(format!("plugin {} instance lock poisoned: {e}", self.id))
        })?;
        let instance = guard.as_mut().ok_or(GalaxyError::PluginNotFound(self.id))?;
        let result = instance.invoke(function, input);
        if self.is_closed() {
            guard.take();
            debug!(plugin_id = %self.id, plugin = %self.name(), "plugin instance released after close");
        }
        result
    }

    /// Value stored by the guest through `host_storage_set`.
    ///
    /// `None` while a handler call is in flight.
    pub fn storage_value(&self, key: &str) -> Option<String> {
        let guard = self.instance.try_lock().ok()?;
        guard
            .as_ref()?
            .state()
            .storage_value(key)
            .map(str::to_string)
    }

    /// Whether the guest instance is still held.
    pub fn holds_instance(&self) -> bool {
        match self.instance.try_lock() {
            Ok(guard) => guard.is_some(),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().is_some(),
            Err(TryLockError::WouldBlock) => true,
        }
    }
}

/// Serializable view of a loaded plugin.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginSummary {
    pub id: PluginId,
    pub name: String,
    pub version: String,
    pub author: String,
    pub description: String,
    pub status: PluginStatus,
    pub path: PathBuf,
    pub loaded_at: DateTime<Utc>,
    pub routes: Vec<RegisteredRoute>,
}

/// A route lookup hit: the plugin and the handler to call.
#[derive(Debug, Clone)]
pub struct ResolvedRoute {
    pub plugin: Arc<Plugin>,
    pub handler: String,
}

/// Owns every loaded plugin.
pub struct PluginManager {
    runtime: PluginRuntime,
    store: Arc<dyn PluginStore>,
    kube: Arc<dyn KubeApi>,
    plugins: RwLock<HashMap<PluginId, Arc<Plugin>>>,
    routes: RwLock<RouteTable>,
}

impl PluginManager {
    pub fn new(
        runtime: PluginRuntime,
        store: Arc<dyn PluginStore>,
        kube: Arc<dyn KubeApi>,
    ) -> Self {
        Self {
            runtime,
            store,
            kube,
            plugins: RwLock::new(HashMap::new()),
            routes: RwLock::new(RouteTable::default()),
        }
    }

    pub fn store(&self) -> &Arc<dyn PluginStore> {
        &self.store
    }

    /// Load the plugin in `folder`, replacing any live instance with the same ID.
    ///
    /// The replacement is compiled and instantiated before the previous
    /// instance is closed, so a failed reload leaves the old one running.
    pub async fn load(&self, folder: &Path) -> Result<Arc<Plugin>, GalaxyError> {
        let manifest = load_manifest(&folder.join(MANIFEST_FILE))?;
        let identity = manifest.identity();

        let id = self
            .store
            .find_plugin_id(&identity)
            .await?
            .ok_or_else(|| {
                GalaxyError::persistence(format!("plugin {identity} is not installed"))
            })?;
        let folder_id = folder
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(parse_folder_id);
        if let Some(folder_id) = folder_id.filter(|folder_id| *folder_id != id) {
            return Err(GalaxyError::persistence(format!(
                "plugin folder {} names ID {folder_id} but the installation record is {id}",
                folder.display()
            )));
        }

        let wasm_path = folder.join(manifest.wasm_file_name());
        let wasm = std::fs::read(&wasm_path).map_err(|e| GalaxyError::Binary {
            message: format!("failed to read WASM binary '{}'", wasm_path.display()),
            source: Some(Box::new(e)),
        })?;

        let status = self
            .store
            .plugin_status(id)
            .await?
            .unwrap_or(PluginStatus::Active);

        let state = HostState::new(
            id,
            manifest.metadata.name.clone(),
            manifest.permissions(),
            manifest.config_values(),
            Arc::clone(&self.kube),
        )
        .with_memory_limit(manifest.memory_limit_bytes()?);

        // Entry points may call blocking host functions, so compile and
        // instantiate off the async worker threads.
        let runtime = self.runtime.clone();
        let entrypoint = manifest.entrypoint().map(str::to_string);
        let (module, instance) = tokio::task::spawn_blocking(move || {
            let module = runtime.compile(&wasm)?;
            let instance = runtime.instantiate(&module, state, entrypoint.as_deref())?;
            Ok::<_, GalaxyError>((module, instance))
        })
        .await
        .map_err(|e| GalaxyError::Internal(format!("plugin load task failed: {e}")))??;

        let plugin = Arc::new(Plugin {
            id,
            manifest,
            path: folder.to_path_buf(),
            module,
            instance: Mutex::new(Some(instance)),
            closed: AtomicBool::new(false),
            active: AtomicBool::new(status.is_active()),
            loaded_at: Utc::now(),
        });

        let previous = self.plugins_write()?.insert(id, Arc::clone(&plugin));
        if let Some(previous) = previous {
            previous.close();
            self.routes_write()?.remove(id);
            debug!(plugin_id = %id, "replaced previous plugin instance");
        }

        if plugin.manifest.backend_enabled() {
            self.register_routes(&plugin)?;
        }

        info!(
            plugin_id = %id,
            plugin = %plugin.name(),
            version = %plugin.manifest.metadata.version,
            status = %status,
            "plugin loaded"
        );
        Ok(plugin)
    }

    /// Track the manifest's backend routes for `plugin`.
    ///
    /// Returns `false` without changes if the plugin already has a route set.
    pub fn register_routes(&self, plugin: &Plugin) -> Result<bool, GalaxyError> {
        let routes = RegisteredRoute::from_manifest(&plugin.manifest);
        let count = routes.len();
        let registered = self.routes_write()?.register(plugin.id, routes);
        if registered {
            debug!(plugin_id = %plugin.id, routes = count, "plugin routes registered");
        }
        Ok(registered)
    }

    /// Call `function` on the plugin with `id`.
    pub fn invoke(
        &self,
        id: PluginId,
        function: &str,
        input: &[u8],
    ) -> Result<Vec<u8>, GalaxyError> {
        let plugin = self.get(id)?.ok_or(GalaxyError::PluginNotFound(id))?;
        plugin.invoke(function, input)
    }

    /// Find the handler serving `method path` on plugin `id`.
    pub fn resolve(
        &self,
        id: PluginId,
        method: HttpMethod,
        path: &str,
    ) -> Result<Option<ResolvedRoute>, GalaxyError> {
        let handler = match self.routes_read()?.resolve(id, method, path) {
            Some(handler) => handler.to_string(),
            None => return Ok(None),
        };
        Ok(self
            .get(id)?
            .map(|plugin| ResolvedRoute { plugin, handler }))
    }

    pub async fn enable(&self, id: PluginId) -> Result<(), GalaxyError> {
        self.set_status(id, PluginStatus::Active).await
    }

    pub async fn disable(&self, id: PluginId) -> Result<(), GalaxyError> {
        self.set_status(id, PluginStatus::Inactive).await
    }

    async fn set_status(&self, id: PluginId, status: PluginStatus) -> Result<(), GalaxyError> {
        let plugin = self.get(id)?.ok_or(GalaxyError::PluginNotFound(id))?;
        self.store.set_plugin_status(id, status).await?;
        plugin.set_status(status);
        info!(plugin_id = %id, status = %status, "plugin status changed");
        Ok(())
    }

    /// Close and forget the plugin with `id`. Returns `false` if it was not loaded.
    pub fn unload(&self, id: PluginId) -> Result<bool, GalaxyError> {
        let removed = self.plugins_write()?.remove(&id);
        self.routes_write()?.remove(id);
        match removed {
            Some(plugin) => {
                plugin.close();
                info!(plugin_id = %id, plugin = %plugin.name(), "plugin unloaded");
                Ok(true)
            }
            None => {
                debug!(plugin_id = %id, "unload requested for plugin that is not loaded");
                Ok(false)
            }
        }
    }

    /// Unload every plugin and delete its installation record.
    ///
    /// Every plugin is attempted; the first error is returned.
    pub async fn uninstall_all(&self) -> Result<(), GalaxyError> {
        let ids: Vec<PluginId> = self.plugins_read()?.keys().copied().collect();
        let mut first_error = None;

        for id in ids {
            let result = match self.unload(id) {
                Ok(_) => self.store.delete_installation(id).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                warn!(plugin_id = %id, error = %e, "failed to uninstall plugin");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn get(&self, id: PluginId) -> Result<Option<Arc<Plugin>>, GalaxyError> {
        Ok(self.plugins_read()?.get(&id).cloned())
    }

    /// Loaded plugins ordered by ID.
    pub fn list(&self) -> Result<Vec<Arc<Plugin>>, GalaxyError> {
        let mut plugins: Vec<_> = self.plugins_read()?.values().cloned().collect();
        plugins.sort_by_key(|p| p.id);
        Ok(plugins)
    }

    pub fn summaries(&self) -> Result<Vec<PluginSummary>, GalaxyError> {
        self.list()?
            .into_iter()
            .map(|plugin| {
                let routes = self.routes_read()?.routes(plugin.id);
                let meta = &plugin.manifest.metadata;
                Ok(PluginSummary {
                    id: plugin.id,
                    name: meta.name.clone(),
                    version: meta.version.clone(),
                    author: meta.author.clone(),
                    description: meta.description.clone(),
                    status: plugin.status(),
                    path: plugin.path.clone(),
                    loaded_at: plugin.loaded_at,
                    routes,
                })
            })
            .collect()
    }

    /// The `(method, path)` pairs tracked for `id`.
    pub fn routes(&self, id: PluginId) -> Result<Vec<RouteRecord>, GalaxyError> {
        Ok(self
            .routes_read()?
            .routes(id)
            .into_iter()
            .map(|r| r.record)
            .collect())
    }

    pub fn is_loaded(&self, id: PluginId) -> Result<bool, GalaxyError> {
        Ok(self.plugins_read()?.contains_key(&id))
    }

    fn plugins_read(&self) -> Result<RwLockReadGuard<'_, HashMap<PluginId, Arc<Plugin>>>, GalaxyError> {
        self.plugins
            .read()
            .map_err(|e| GalaxyError::Internal(format!("plugin table lock poisoned: {e}")))
    }

    fn plugins_write(
        &self,
    ) -> Result<RwLockWriteGuard<'_, HashMap<PluginId, Arc<Plugin>>>, GalaxyError> {
        self.plugins
            .write()
            .map_err(|e| GalaxyError::Internal(format!("plugin table lock poisoned: {e}")))
    }

    fn routes_read(&self) -> Result<RwLockReadGuard<'_, RouteTable>, GalaxyError> {
        self.routes
            .read()
            .map_err(|e| GalaxyError::Internal(format!("route table lock poisoned: {e}")))
    }

    fn routes_write(&self) -> Result<RwLockWriteGuard<'_, RouteTable>, GalaxyError> {
        self.routes
            .write()
            .map_err(|e| GalaxyError::Internal(format!("route table lock poisoned: {e}")))
    }
}
