// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `galaxy serve`: load installed plugins, watch for changes, serve routes.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use galaxy_bridge::{HttpKubeApi, PluginRuntime};
use galaxy_config::GalaxyConfig;
use galaxy_core::GalaxyError;
use galaxy_gateway::{GatewayState, ServerConfig};
use galaxy_plugin::watcher::{Reconciler, WatcherSettings, watch_plugins};
use galaxy_plugin::{PluginManager, PluginRegistry};
use galaxy_storage::SqlitePluginStore;
use notify::RecommendedWatcher;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Open the store and build the manager and registry described by `config`.
pub async fn build_registry(config: &GalaxyConfig) -> Result<Arc<PluginRegistry>, GalaxyError> {
    let store = Arc::new(SqlitePluginStore::open(&config.storage.database_path).await?);
    let kube = Arc::new(HttpKubeApi::with_token_file(
        config.kubernetes.api_url.clone(),
        Path::new(&config.kubernetes.token_path),
        Duration::from_secs(config.kubernetes.timeout_secs),
    )?);
    let manager = Arc::new(PluginManager::new(PluginRuntime::new()?, store, kube));
    let registry = Arc::new(PluginRegistry::new(&config.plugins.directory, manager));
    registry.ensure_root()?;
    Ok(registry)
}

/// Runs the `galaxy serve` command until SIGINT or SIGTERM.
pub async fn run_serve(config: GalaxyConfig) -> Result<(), GalaxyError> {
    init_tracing(&config.server.log_level);

    info!("starting galaxy serve");

    let registry = build_registry(&config).await?;
    if config.plugins.load_on_startup {
        registry.load_all().await?;
    }

    let cancel = install_signal_handler();

    let watch = if config.plugins.watch {
        Some(start_watcher(&config, Arc::clone(&registry), cancel.clone())?)
    } else {
        debug!("plugin hot reload disabled");
        None
    };

    let server = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
    };
    let state = GatewayState::new(Arc::clone(&registry));
    let served = galaxy_gateway::serve(&server, state, cancel.clone()).await;

    cancel.cancel();
    if let Some(watch) = watch {
        watch.stop().await;
    }

    let manager = registry.manager();
    for plugin in manager.list()? {
        manager.unload(plugin.id())?;
    }
    info!("galaxy stopped");
    served
}

fn start_watcher(
    config: &GalaxyConfig,
    registry: Arc<PluginRegistry>,
    cancel: CancellationToken,
) -> Result<WatchHandle, GalaxyError> {
    let settings = WatcherSettings {
        write_debounce: Duration::from_millis(config.watcher.write_debounce_ms),
        create_settle: Duration::from_millis(config.watcher.create_settle_ms),
        queue_capacity: config.watcher.queue_capacity,
    };
    // Some platforms report canonical paths in events.
    let root = canonical_root(registry.root());
    let (tx, rx) = mpsc::channel(settings.queue_capacity);
    let watcher = watch_plugins(&root, tx)?;
    let reconciler = Reconciler::new(root.clone(), registry, settings, rx, cancel);
    let task = tokio::spawn(reconciler.run());
    info!(root = %root.display(), "watching plugins directory");
    Ok(WatchHandle { watcher, task })
}

fn canonical_root(root: &Path) -> PathBuf {
    std::fs::canonicalize(root).unwrap_or_else(|e| {
        warn!(path = %root.display(), error = %e, "cannot canonicalize plugins directory");
        root.to_path_buf()
    })
}

/// Keeps the filesystem watcher alive alongside its reconciler task.
struct WatchHandle {
    watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl WatchHandle {
    async fn stop(self) {
        drop(self.watcher);
        if let Err(e) = self.task.await {
            warn!(error = %e, "plugin reconciler task failed");
        }
    }
}

/// Cancel the returned token on SIGINT or SIGTERM.
fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating shutdown"),
                        _ = sigterm.recv() => info!("received SIGTERM, initiating shutdown"),
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to install SIGTERM handler");
                    let _ = ctrl_c.await;
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
    });

    token
}

/// Initializes the tracing subscriber with the given log level.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("galaxy={log_level},warn")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn signal_handler_returns_live_token() {
        let token = install_signal_handler();
        assert!(!token.is_cancelled());
        token.cancel();
    }

    #[test]
    fn canonical_root_falls_back_to_input() {
        let missing = Path::new("/nonexistent/galaxy/plugins");
        assert_eq!(canonical_root(missing), missing.to_path_buf());
    }

    #[tokio::test]
    async fn registry_is_built_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = galaxy_config::load_and_validate_str(&format!(
            "[plugins]\ndirectory = \"{}\"\n\n[storage]\ndatabase_path = \"{}\"\n",
            dir.path().join("plugins").display(),
            dir.path().join("galaxy.db").display(),
        ))
        .unwrap();

        let registry = build_registry(&config).await.unwrap();
        assert!(registry.root().is_dir());
        assert!(registry.discover_all().await.unwrap().is_empty());
    }
}
