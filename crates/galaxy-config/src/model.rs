// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Galaxy plugin runtime.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a mistyped key is
//! reported at startup instead of silently ignored.

use serde::{Deserialize, Serialize};

/// Top-level Galaxy configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GalaxyConfig {
    /// Process-wide settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Plugin directory and startup behavior.
    #[serde(default)]
    pub plugins: PluginsConfig,

    /// Hot-reload debounce windows.
    #[serde(default)]
    pub watcher: WatcherConfig,

    /// Plugin store location.
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP listener settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Kubernetes API access for `host_k8s_api_call`.
    #[serde(default)]
    pub kubernetes: KubernetesConfig,

    /// Security scanner limits.
    #[serde(default)]
    pub scanner: ScannerConfig,
}

/// Process-wide settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Plugin directory configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PluginsConfig {
    /// Root directory holding one `<name>-<id>` folder per installed plugin.
    #[serde(default = "default_plugins_dir")]
    pub directory: String,

    /// Start the hot-reload watcher.
    #[serde(default = "default_true")]
    pub watch: bool,

    /// Load every installed plugin found in `directory` at startup.
    #[serde(default = "default_true")]
    pub load_on_startup: bool,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            directory: default_plugins_dir(),
            watch: true,
            load_on_startup: true,
        }
    }
}

fn default_plugins_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("galaxy").join("plugins"))
        .unwrap_or_else(|| std::path::PathBuf::from("plugins"))
        .to_string_lossy()
        .into_owned()
}

fn default_true() -> bool {
    true
}

/// Hot-reload watcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WatcherConfig {
    /// Delay after a write event before reloading.
    #[serde(default = "default_write_debounce_ms")]
    pub write_debounce_ms: u64,

    /// Delay after a create event before checking the folder is complete.
    #[serde(default = "default_create_settle_ms")]
    pub create_settle_ms: u64,

    /// Capacity of the event queue between the OS watcher and the reconciler.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            write_debounce_ms: default_write_debounce_ms(),
            create_settle_ms: default_create_settle_ms(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_write_debounce_ms() -> u64 {
    100
}

fn default_create_settle_ms() -> u64 {
    500
}

fn default_queue_capacity() -> usize {
    256
}

/// Plugin store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("galaxy").join("galaxy.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("galaxy.db"))
        .to_string_lossy()
        .into_owned()
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Kubernetes API access configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KubernetesConfig {
    /// Base URL of the API server.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Service-account token file. Requests are sent without a bearer token
    /// when the file does not exist.
    #[serde(default = "default_token_path")]
    pub token_path: String,

    /// Per-request timeout in seconds (1..=300).
    #[serde(default = "default_k8s_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for KubernetesConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token_path: default_token_path(),
            timeout_secs: default_k8s_timeout_secs(),
        }
    }
}

fn default_api_url() -> String {
    "https://kubernetes.default.svc".to_string()
}

fn default_token_path() -> String {
    "/var/run/secrets/kubernetes.io/serviceaccount/token".to_string()
}

fn default_k8s_timeout_secs() -> u64 {
    30
}

/// Security scanner configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScannerConfig {
    /// Files above this size are reported as warnings.
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: default_max_file_size(),
        }
    }
}

fn default_max_file_size() -> u64 {
    50 * 1024 * 1024
}
