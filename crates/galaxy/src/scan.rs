// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `galaxy scan`: security-scan a plugin archive and print the report.

use std::fmt::Write as _;
use std::path::Path;

use colored::Colorize;
use galaxy_core::GalaxyError;
use galaxy_scanner::{RiskLevel, SecurityScanResult, SecurityScanner};

/// Scan `archive` and print the report. Returns whether the plugin is safe.
pub fn run_scan(archive: &Path, json: bool, max_file_size: u64) -> Result<bool, GalaxyError> {
    let result = SecurityScanner::new(max_file_size).scan(archive)?;
    if json {
        let rendered = serde_json::to_string_pretty(&result)
            .map_err(|e| GalaxyError::Internal(format!("failed to render scan report: {e}")))?;
        println!("{rendered}");
    } else {
        print!("{}", render_report(archive, &result));
    }
    Ok(result.safe)
}

fn risk_label(risk: RiskLevel) -> String {
    let label = risk.to_string().to_uppercase();
    match risk {
        RiskLevel::Low => label.green().to_string(),
        RiskLevel::Medium => label.yellow().to_string(),
        RiskLevel::High | RiskLevel::Critical => label.red().to_string(),
    }
}

/// Human-readable report.
pub fn render_report(archive: &Path, result: &SecurityScanResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out);
    let _ = writeln!(out, "  galaxy scan: {}", archive.display());
    let _ = writeln!(out, "  {}", "-".repeat(50));
    let _ = writeln!(out, "    score        {}/100", result.score);
    let _ = writeln!(out, "    risk         {}", risk_label(result.overall_risk));
    let _ = writeln!(out, "    safe         {}", result.safe);
    let _ = writeln!(out, "    galaxy safe  {}", result.galaxy_safe);
    let _ = writeln!(out, "    files        {}", result.file_analysis.len());
    let _ = writeln!(out, "    checksum     {}", result.checksum);

    if !result.issues.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "  issues ({})", result.issues.len());
        for issue in &result.issues {
            let _ = writeln!(
                out,
                "    [{}] {} at {}:{} - {}",
                issue.severity.to_string().to_uppercase(),
                issue.kind,
                issue.file,
                issue.line,
                issue.description
            );
        }
    }

    if !result.warnings.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "  warnings ({})", result.warnings.len());
        for warning in &result.warnings {
            let location = match warning.line {
                Some(line) => format!("{}:{line}", warning.file),
                None => warning.file.clone(),
            };
            let _ = writeln!(
                out,
                "    {} at {location} - {}",
                warning.kind, warning.description
            );
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "  {}", result.recommendation);
    out
}
