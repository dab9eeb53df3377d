// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scan report types, serialized as the camelCase JSON report.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Severity of a malicious-pattern match.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Points subtracted from the score per issue of this severity.
    pub fn penalty(self) -> i64 {
        match self {
            Severity::Critical => 30,
            Severity::High => 20,
            Severity::Medium => 10,
            Severity::Low => 5,
        }
    }

    /// High and critical issues count towards the two-strikes override.
    pub fn is_severe(self) -> bool {
        matches!(self, Severity::High | Severity::Critical)
    }
}

/// Overall risk tier derived from the final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            80.. => RiskLevel::Low,
            60..=79 => RiskLevel::Medium,
            40..=59 => RiskLevel::High,
            _ => RiskLevel::Critical,
        }
    }

    pub fn recommendation(self) -> &'static str {
        match self {
            RiskLevel::Low => "Plugin appears safe for installation",
            RiskLevel::Medium => "Plugin has some security concerns, review recommended",
            RiskLevel::High => "Plugin has significant security concerns, manual review required",
            RiskLevel::Critical => {
                "Plugin has critical security issues, installation not recommended"
            }
        }
    }
}

/// A malicious-pattern match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityIssue {
    /// Name of the pattern that matched.
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: Severity,
    pub description: String,
    pub file: String,
    pub line: usize,
}

/// A heuristic finding that lowers the score without a severity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityWarning {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

/// Per-file summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAnalysis {
    /// Lower-cased extension including the dot, or empty.
    pub file_type: String,
    pub size: u64,
    /// Hex SHA-256 of the file contents.
    pub checksum: String,
    /// 1-based line numbers that matched a malicious pattern.
    pub flagged_lines: Vec<usize>,
    pub issue_count: usize,
    pub warning_count: usize,
}

/// The complete result of scanning one archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityScanResult {
    pub safe: bool,
    pub score: u8,
    pub issues: Vec<SecurityIssue>,
    pub warnings: Vec<SecurityWarning>,
    /// Keyed by path relative to the archive root.
    pub file_analysis: BTreeMap<String, FileAnalysis>,
    /// Hex SHA-256 of the archive itself.
    pub checksum: String,
    pub scan_time: DateTime<Utc>,
    /// Wall-clock scan time in milliseconds.
    #[serde(rename = "scanDuration")]
    pub scan_duration_ms: u64,
    pub overall_risk: RiskLevel,
    pub recommendation: String,
    pub galaxy_safe: bool,
}
