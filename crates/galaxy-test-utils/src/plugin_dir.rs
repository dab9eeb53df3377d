// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builder for on-disk plugin folders.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use galaxy_core::{PluginId, PluginIdentity};
use serde_json::Value;

use crate::fixtures;

const TEST_VERSION: &str = "1.0.0";
const TEST_AUTHOR: &str = "Galaxy Tests";

/// The identity [`PluginDirBuilder`] writes for `name` by default.
pub fn test_identity(name: &str) -> PluginIdentity {
    PluginIdentity {
        name: name.to_string(),
        version: TEST_VERSION.to_string(),
        author: TEST_AUTHOR.to_string(),
        description: format!("{name} test plugin"),
    }
}

/// Writes `<root>/<name>-<id>/plugin.yml` and the plugin binary.
///
/// Defaults to the demo guest with no routes and no permissions.
#[derive(Debug, Clone)]
pub struct PluginDirBuilder {
    root: PathBuf,
    name: String,
    id: PluginId,
    version: String,
    backend_enabled: bool,
    routes: Vec<(String, String, String)>,
    permissions: Vec<String>,
    configuration: Vec<(String, Value)>,
    entrypoint: Option<String>,
    memory_limit: Option<String>,
    wasm_file: Option<String>,
    wasm: Option<Vec<u8>>,
}

impl PluginDirBuilder {
    pub fn new(root: &Path, name: &str, id: PluginId) -> Self {
        Self {
            root: root.to_path_buf(),
            name: name.to_string(),
            id,
            version: TEST_VERSION.to_string(),
            backend_enabled: false,
            routes: Vec::new(),
            permissions: Vec::new(),
            configuration: Vec::new(),
            entrypoint: None,
            memory_limit: None,
            wasm_file: None,
            wasm: Some(fixtures::demo_guest()),
        }
    }

    pub fn identity(&self) -> PluginIdentity {
        PluginIdentity {
            version: self.version.clone(),
            ..test_identity(&self.name)
        }
    }

    pub fn id(&self) -> PluginId {
        self.id
    }

    pub fn folder(&self) -> PathBuf {
        self.root.join(format!("{}-{}", self.name, self.id))
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    /// Add a backend route and enable the backend.
    pub fn route(mut self, method: &str, path: &str, handler: &str) -> Self {
        self.backend_enabled = true;
        self.routes
            .push((method.to_string(), path.to_string(), handler.to_string()));
        self
    }

    pub fn backend_enabled(mut self, enabled: bool) -> Self {
        self.backend_enabled = enabled;
        self
    }

    pub fn permission(mut self, entry: &str) -> Self {
        self.permissions.push(entry.to_string());
        self
    }

    pub fn config(mut self, name: &str, default: Value) -> Self {
        self.configuration.push((name.to_string(), default));
        self
    }

    pub fn entrypoint(mut self, name: &str) -> Self {
        self.entrypoint = Some(name.to_string());
        self
    }

    pub fn memory_limit(mut self, limit: &str) -> Self {
        self.memory_limit = Some(limit.to_string());
        self
    }

    /// Override the binary file name recorded in the manifest.
    pub fn wasm_file(mut self, file: &str) -> Self {
        self.wasm_file = Some(file.to_string());
        self
    }

    pub fn wasm(mut self, bytes: Vec<u8>) -> Self {
        self.wasm = Some(bytes);
        self
    }

    /// Write only the manifest.
    pub fn without_wasm(mut self) -> Self {
        self.wasm = None;
        self
    }

    pub fn manifest_yaml(&self) -> String {
        let identity = self.identity();
        let mut yaml = String::new();
        let _ = writeln!(yaml, "apiVersion: galaxy/v1");
        let _ = writeln!(yaml, "kind: Plugin");
        let _ = writeln!(yaml, "metadata:");
        let _ = writeln!(yaml, "  name: {}", identity.name);
        let _ = writeln!(yaml, "  version: \"{}\"", identity.version);
        let _ = writeln!(yaml, "  author: {}", identity.author);
        let _ = writeln!(yaml, "  description: {}", identity.description);
        let _ = writeln!(yaml, "spec:");

        let _ = writeln!(yaml, "  wasm:");
        if let Some(file) = &self.wasm_file {
            let _ = writeln!(yaml, "    file: {file}");
        }
        if let Some(entrypoint) = &self.entrypoint {
            let _ = writeln!(yaml, "    entrypoint: {entrypoint}");
        }
        if let Some(limit) = &self.memory_limit {
            let _ = writeln!(yaml, "    memory_limit: \"{limit}\"");
        }

        let _ = writeln!(yaml, "  backend:");
        let _ = writeln!(yaml, "    enabled: {}", self.backend_enabled);
        if self.routes.is_empty() {
            let _ = writeln!(yaml, "    routes: []");
        } else {
            let _ = writeln!(yaml, "    routes:");
        }
        for (method, path, handler) in &self.routes {
            let _ = writeln!(
                yaml,
                "      - {{path: \"{path}\", methods: [{method}], handler: {handler}}}"
            );
        }

        if self.permissions.is_empty() {
            let _ = writeln!(yaml, "  permissions: []");
        } else {
            let _ = writeln!(yaml, "  permissions:");
        }
        for entry in &self.permissions {
            let _ = writeln!(yaml, "    - \"{entry}\"");
        }

        if self.configuration.is_empty() {
            let _ = writeln!(yaml, "  configuration: []");
        } else {
            let _ = writeln!(yaml, "  configuration:");
        }
        for (name, default) in &self.configuration {
            // JSON is valid YAML flow syntax.
            let _ = writeln!(yaml, "    - {{name: {name}, default: {default}}}");
        }
        yaml
    }

    /// Write the folder and return its path.
    pub fn build(self) -> PathBuf {
        let folder = self.folder();
        std::fs::create_dir_all(&folder).expect("create plugin folder");
        std::fs::write(folder.join("plugin.yml"), self.manifest_yaml()).expect("write manifest");
        if let Some(bytes) = &self.wasm {
            let file = self
                .wasm_file
                .clone()
                .unwrap_or_else(|| format!("{}.wasm", self.name));
            std::fs::write(folder.join(file), bytes).expect("write wasm");
        }
        folder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_named_folder_with_manifest_and_binary() {
        let dir = tempfile::tempdir().unwrap();
        let folder = PluginDirBuilder::new(dir.path(), "hello", PluginId(7))
            .route("GET", "/status", "status_handler")
            .permission("/api/v1/pods")
            .config("interval", serde_json::json!(30))
            .build();
        assert_eq!(folder, dir.path().join("hello-7"));
        assert!(folder.join("plugin.yml").is_file());
        assert!(folder.join("hello.wasm").is_file());

        let yaml = std::fs::read_to_string(folder.join("plugin.yml")).unwrap();
        assert!(yaml.contains("methods: [GET]"));
        assert!(yaml.contains("default: 30"));
    }

    #[test]
    fn without_wasm_skips_binary() {
        let dir = tempfile::tempdir().unwrap();
        let folder = PluginDirBuilder::new(dir.path(), "bare", PluginId(1))
            .without_wasm()
            .build();
        assert!(!folder.join("bare.wasm").exists());
    }
}
