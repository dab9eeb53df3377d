// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Galaxy plugin runtime.
//!
//! TOML configuration with strict key checking (`deny_unknown_fields`), an XDG
//! file hierarchy, `GALAXY_*` environment overrides, and miette diagnostics
//! with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use galaxy_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("plugins dir: {}", config.plugins.directory);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::{Path, PathBuf};

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::GalaxyConfig;

/// Load configuration from the XDG hierarchy and validate it.
///
/// Figment errors become diagnostics with source spans taken from whichever
/// config file contributed the bad key.
pub fn load_and_validate() -> Result<GalaxyConfig, Vec<ConfigError>> {
    validated(loader::load_config(), || {
        read_sources(&loader::config_file_paths())
    })
}

/// Load configuration from an explicit file (plus env overrides) and validate it.
pub fn load_and_validate_path(path: &Path) -> Result<GalaxyConfig, Vec<ConfigError>> {
    validated(loader::load_config_from_path(path), || {
        read_sources(&[path.to_path_buf()])
    })
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<GalaxyConfig, Vec<ConfigError>> {
    validated(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

fn validated(
    loaded: Result<GalaxyConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<GalaxyConfig, Vec<ConfigError>> {
    let config =
        loaded.map_err(|err| diagnostic::figment_to_config_errors(err, &sources()))?;
    validation::validate_config(&config)?;
    Ok(config)
}

/// `(path, contents)` for every readable file in `paths`.
fn read_sources(paths: &[PathBuf]) -> Vec<(String, String)> {
    paths
        .iter()
        .filter_map(|path| {
            let content = std::fs::read_to_string(path).ok()?;
            Some((path.display().to_string(), content))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_sources_skips_missing_files() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("galaxy.toml", "[gateway]\nport = 1\n")?;
            let sources = read_sources(&[
                PathBuf::from("missing.toml"),
                PathBuf::from("galaxy.toml"),
            ]);
            assert_eq!(sources.len(), 1);
            assert_eq!(sources[0].0, "galaxy.toml");
            assert!(sources[0].1.contains("port = 1"));
            Ok(())
        });
    }

    #[test]
    fn unknown_key_error_points_at_inline_source() {
        let errors = load_and_validate_str("[gateway]\nprot = 8080\n").unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("prot"));
    }
}
