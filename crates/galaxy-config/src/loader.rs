// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `./galaxy.toml` > `~/.config/galaxy/galaxy.toml` > `/etc/galaxy/galaxy.toml`,
//! with `GALAXY_*` environment variables overriding all files.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::GalaxyConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/galaxy/galaxy.toml`
/// 3. `~/.config/galaxy/galaxy.toml`
/// 4. `./galaxy.toml`
/// 5. `GALAXY_*` environment variables
pub fn load_config() -> Result<GalaxyConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<GalaxyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GalaxyConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<GalaxyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GalaxyConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

const CONFIG_FILE: &str = "galaxy.toml";
const SYSTEM_CONFIG: &str = "/etc/galaxy/galaxy.toml";

/// Config files read by [`load_config`], lowest precedence first.
pub fn config_file_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(SYSTEM_CONFIG)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("galaxy").join(CONFIG_FILE));
    }
    paths.push(PathBuf::from(CONFIG_FILE));
    paths
}

/// Build the Figment used for the XDG lookup, before extraction.
pub fn build_figment() -> Figment {
    config_file_paths()
        .into_iter()
        .fold(
            Figment::new().merge(Serialized::defaults(GalaxyConfig::default())),
            |figment, path| figment.merge(Toml::file(path)),
        )
        .merge(env_provider())
}

/// Environment provider with explicit section mapping.
///
/// `Env::split("_")` would turn `GALAXY_GATEWAY_PORT` into the right key but
/// break keys that contain underscores, e.g. `GALAXY_STORAGE_DATABASE_PATH`
/// must become `storage.database_path`.
fn env_provider() -> Env {
    Env::prefixed("GALAXY_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("server_", "server.", 1)
            .replacen("plugins_", "plugins.", 1)
            .replacen("watcher_", "watcher.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("gateway_", "gateway.", 1)
            .replacen("kubernetes_", "kubernetes.", 1)
            .replacen("scanner_", "scanner.", 1);
        mapped.into()
    })
}
