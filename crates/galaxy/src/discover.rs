// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `galaxy discover`: list installed plugins without loading them.

use std::fmt::Write as _;

use colored::Colorize;
use galaxy_config::GalaxyConfig;
use galaxy_core::GalaxyError;
use galaxy_plugin::DiscoveryRecord;

use crate::serve::{build_registry, init_tracing};

pub async fn run_discover(config: &GalaxyConfig, json: bool) -> Result<(), GalaxyError> {
    init_tracing("warn");
    let registry = build_registry(config).await?;
    let records = registry.discover_all().await?;

    if json {
        let rendered = serde_json::to_string_pretty(&records)
            .map_err(|e| GalaxyError::Internal(format!("failed to render discovery: {e}")))?;
        println!("{rendered}");
    } else {
        print!("{}", render_records(&records));
    }
    Ok(())
}

fn render_records(records: &[DiscoveryRecord]) -> String {
    let mut out = String::new();
    if records.is_empty() {
        let _ = writeln!(out, "no installed plugins found");
        return out;
    }
    for record in records {
        let status = match &record.error {
            Some(error) => error.red().to_string(),
            None if record.status.is_active() => record.status.to_string().green().to_string(),
            None => record.status.to_string().yellow().to_string(),
        };
        let _ = writeln!(
            out,
            "{:>6}  {:<24} {:<12} {}",
            record.id.to_string(),
            record.name,
            record.version,
            status
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use galaxy_core::{PluginId, PluginStatus};

    use super::*;

    fn record(id: i64, error: Option<&str>) -> DiscoveryRecord {
        DiscoveryRecord {
            id: PluginId(id),
            name: format!("plugin{id}"),
            version: "1.0.0".to_string(),
            author: "Ops".to_string(),
            description: String::new(),
            path: PathBuf::from(format!("/plugins/plugin{id}-{id}")),
            manifest_path: PathBuf::from("plugin.yml"),
            wasm_path: PathBuf::from("plugin.wasm"),
            status: PluginStatus::Active,
            discovered_at: chrono::Utc::now(),
            last_modified: None,
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn records_render_one_line_each() {
        colored::control::set_override(false);
        let text = render_records(&[record(1, None), record(2, Some("WASM file not found"))]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("plugin1") && lines[0].ends_with("active"));
        assert!(lines[1].ends_with("WASM file not found"));
    }

    #[test]
    fn empty_discovery_says_so() {
        assert_eq!(render_records(&[]), "no installed plugins found\n");
    }
}
