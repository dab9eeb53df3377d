// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin manifest parsing from YAML.
//!
//! Every plugin folder carries a `plugin.yml` describing the plugin's
//! identity, its WASM binary, the backend routes it serves, the Kubernetes
//! API paths it may reach, and its configuration defaults. A manifest is
//! immutable once loaded; edits take effect on reload.

use std::collections::HashSet;
use std::path::{Component, Path};

use galaxy_bridge::{Permissions, PluginConfigValues};
use galaxy_core::{GalaxyError, HttpMethod, PluginIdentity};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// File name of the manifest inside a plugin folder.
pub const MANIFEST_FILE: &str = "plugin.yml";

/// Route paths taken by the gateway's per-plugin admin endpoints.
pub const RESERVED_ROUTE_PATHS: &[&str] = &["/enable", "/disable", "/reload"];

const MAX_NAME_LEN: usize = 50;
const MAX_VERSION_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginManifest {
    #[serde(rename = "apiVersion", default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    pub metadata: ManifestMetadata,
    #[serde(default)]
    pub spec: PluginSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginSpec {
    #[serde(default)]
    pub wasm: Option<WasmSpec>,
    #[serde(default)]
    pub backend: BackendSpec,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub frontend: Option<FrontendSpec>,
    #[serde(default)]
    pub configuration: Vec<ConfigurationItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WasmSpec {
    /// Binary file name relative to the plugin folder.
    #[serde(default)]
    pub file: Option<String>,
    /// Exported `() -> ()` function run once after instantiation.
    #[serde(default)]
    pub entrypoint: Option<String>,
    /// Linear memory cap such as `"64Mi"`, `"16MB"` or a byte count.
    #[serde(default)]
    pub memory_limit: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendSpec {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSpec {
    pub path: String,
    #[serde(default)]
    pub methods: Vec<String>,
    pub handler: String,
}

impl RouteSpec {
    /// Declared methods that name a known HTTP method.
    pub fn http_methods(&self) -> impl Iterator<Item = HttpMethod> + '_ {
        self.methods.iter().filter_map(|m| m.trim().parse().ok())
    }
}

/// Frontend section. Only `enabled` is interpreted; other keys are kept as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrontendSpec {
    #[serde(default)]
    pub enabled: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationItem {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
}

impl PluginManifest {
    /// Name, version, author and description, which together identify an installation.
    pub fn identity(&self) -> PluginIdentity {
        PluginIdentity {
            name: self.metadata.name.clone(),
            version: self.metadata.version.clone(),
            author: self.metadata.author.clone(),
            description: self.metadata.description.clone(),
        }
    }

    /// The binary file name: the manifest override, else `<name>.wasm`.
    pub fn wasm_file_name(&self) -> String {
        self.spec
            .wasm
            .as_ref()
            .and_then(|w| w.file.as_deref())
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}.wasm", self.metadata.name))
    }

    pub fn entrypoint(&self) -> Option<&str> {
        self.spec
            .wasm
            .as_ref()
            .and_then(|w| w.entrypoint.as_deref())
            .filter(|e| !e.is_empty())
    }

    /// Parsed `memory_limit` in bytes.
    pub fn memory_limit_bytes(&self) -> Result<Option<usize>, GalaxyError> {
        match self.spec.wasm.as_ref().and_then(|w| w.memory_limit.as_deref()) {
            Some(limit) => parse_memory_limit(limit).map(Some),
            None => Ok(None),
        }
    }

    pub fn permissions(&self) -> Permissions {
        Permissions::new(self.spec.permissions.iter().cloned())
    }

    /// Configuration defaults keyed by item name, as seen by `host_get_config`.
    pub fn config_values(&self) -> PluginConfigValues {
        self.spec
            .configuration
            .iter()
            .map(|item| (item.name.clone(), item.default.clone().unwrap_or(Value::Null)))
            .collect()
    }

    pub fn backend_enabled(&self) -> bool {
        self.spec.backend.enabled
    }

    pub fn validate(&self) -> Result<(), GalaxyError> {
        let name = &self.metadata.name;
        if name.is_empty() {
            return Err(GalaxyError::manifest("plugin name must not be empty"));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(GalaxyError::manifest(format!(
                "plugin name '{name}' is longer than {MAX_NAME_LEN} characters"
            )));
        }
        if !name.starts_with(|c: char| c.is_ascii_lowercase())
            || !name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(GalaxyError::manifest(format!(
                "plugin name '{name}' must start with a lowercase letter and contain only lowercase letters, digits and hyphens"
            )));
        }

        let version = &self.metadata.version;
        if version.is_empty() {
            return Err(GalaxyError::manifest("plugin version must not be empty"));
        }
        if version.len() > MAX_VERSION_LEN
            || !version
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        {
            return Err(GalaxyError::manifest(format!(
                "plugin version '{version}' is invalid"
            )));
        }

        if self.metadata.author.trim().is_empty() {
            return Err(GalaxyError::manifest("plugin author must not be empty"));
        }

        if let Some(file) = self.spec.wasm.as_ref().and_then(|w| w.file.as_deref()) {
            validate_wasm_file(file)?;
        }

        let mut seen = HashSet::new();
        for route in &self.spec.backend.routes {
            if !route.path.starts_with('/') {
                return Err(GalaxyError::manifest(format!(
                    "route path '{}' must start with '/'",
                    route.path
                )));
            }
            if RESERVED_ROUTE_PATHS.contains(&route.path.as_str()) {
                return Err(GalaxyError::manifest(format!(
                    "route path '{}' is reserved",
                    route.path
                )));
            }
            if route.handler.trim().is_empty() {
                return Err(GalaxyError::manifest(format!(
                    "route '{}' has no handler",
                    route.path
                )));
            }
            if route.methods.is_empty() {
                return Err(GalaxyError::manifest(format!(
                    "route '{}' declares no methods",
                    route.path
                )));
            }
            for raw in &route.methods {
                let method: HttpMethod = raw.trim().parse().map_err(|_| {
                    GalaxyError::manifest(format!(
                        "route '{}' has unsupported method '{raw}'",
                        route.path
                    ))
                })?;
                if !seen.insert((method, route.path.as_str())) {
                    return Err(GalaxyError::manifest(format!(
                        "route {method} {} is declared more than once",
                        route.path
                    )));
                }
            }
        }

        self.memory_limit_bytes()?;
        Ok(())
    }
}

/// `spec.wasm.file` must name a file directly inside the plugin folder.
fn validate_wasm_file(file: &str) -> Result<(), GalaxyError> {
    let file = file.trim();
    if file.is_empty() {
        return Ok(());
    }
    let mut components = Path::new(file).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !file.contains('\\') => Ok(()),
        _ => Err(GalaxyError::manifest(format!(
            "wasm file '{file}' must be a plain file name inside the plugin folder"
        ))),
    }
}

/// Parse a size string: bare bytes, decimal (`K`, `M`, `G`, optionally with
/// `B`) or binary (`Ki`, `Mi`, `Gi`) suffixes.
pub fn parse_memory_limit(raw: &str) -> Result<usize, GalaxyError> {
    let invalid = || GalaxyError::manifest(format!("invalid memory_limit '{raw}'"));

    let trimmed = raw.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, suffix) = trimmed.split_at(split);
    let value: u64 = digits.parse().map_err(|_| invalid())?;

    let multiplier: u64 = match suffix.trim() {
        "" | "B" => 1,
        "K" | "KB" => 1_000,
        "M" | "MB" => 1_000_000,
        "G" | "GB" => 1_000_000_000,
        "Ki" | "KiB" => 1 << 10,
        "Mi" | "MiB" => 1 << 20,
        "Gi" | "GiB" => 1 << 30,
        _ => return Err(invalid()),
    };

    let bytes = value.checked_mul(multiplier).ok_or_else(invalid)?;
    if bytes == 0 {
        return Err(invalid());
    }
    usize::try_from(bytes).map_err(|_| invalid())
}

/// Parse and validate a manifest from YAML.
pub fn parse_manifest(yaml: &str) -> Result<PluginManifest, GalaxyError> {
    let manifest: PluginManifest = serde_yaml::from_str(yaml).map_err(|e| GalaxyError::Manifest {
        message: format!("failed to parse plugin manifest: {e}"),
        source: Some(Box::new(e)),
    })?;
    manifest.validate()?;
    Ok(manifest)
}

/// Read, parse and validate the manifest at `path`.
pub fn load_manifest(path: &Path) -> Result<PluginManifest, GalaxyError> {
    let content = std::fs::read_to_string(path).map_err(|e| GalaxyError::Manifest {
        message: format!("failed to read manifest file '{}': {e}", path.display()),
        source: Some(Box::new(e)),
    })?;
    parse_manifest(&content)
}
