// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Static security scanning for Galaxy plugin archives.
//!
//! An archive is unpacked into a scratch directory, every file is hashed and
//! matched line by line against a table of malicious patterns, and the
//! findings are reduced to a score, a risk tier and a Galaxy-safe badge.

pub mod patterns;
pub mod report;
pub mod scanner;
pub mod scoring;

pub use report::{
    FileAnalysis, RiskLevel, SecurityIssue, SecurityScanResult, SecurityWarning, Severity,
};
pub use scanner::{DEFAULT_MAX_FILE_SIZE, SecurityScanner};
pub use scoring::{Verdict, evaluate};
