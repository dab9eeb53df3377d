// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Archive extraction and per-file analysis.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use std::time::Instant;

use chrono::Utc;
use flate2::bufread::GzDecoder;
use galaxy_core::GalaxyError;
use sha2::{Digest, Sha256};
use tar::Archive;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::patterns::{
    EXTERNAL_URL, MALICIOUS_PATTERNS, MINIFIED_LINE_LENGTH, is_allowed_extension,
    is_text_extension,
};
use crate::report::{FileAnalysis, SecurityIssue, SecurityScanResult, SecurityWarning};
use crate::scoring;

/// Files larger than this draw a warning.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

const TEMP_PREFIX: &str = "galaxy-scan-";

/// Static analyzer for plugin archives (`.tar.gz`).
#[derive(Debug, Clone)]
pub struct SecurityScanner {
    max_file_size: u64,
}

impl Default for SecurityScanner {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_SIZE)
    }
}

#[derive(Debug, Default)]
struct Findings {
    issues: Vec<SecurityIssue>,
    warnings: Vec<SecurityWarning>,
    files: BTreeMap<String, FileAnalysis>,
}

impl SecurityScanner {
    pub fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Extract `archive` into a scratch directory and score its contents.
    ///
    /// The scratch directory is removed on every return path.
    pub fn scan(&self, archive: &Path) -> Result<SecurityScanResult, GalaxyError> {
        let started = Instant::now();
        let scan_time = Utc::now();

        let checksum = sha256_file(archive).map_err(|e| GalaxyError::Scan {
            message: format!("failed to read archive {}", archive.display()),
            source: Some(Box::new(e)),
        })?;

        let scratch = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempdir()
            .map_err(|e| GalaxyError::Scan {
                message: "failed to create scratch directory".into(),
                source: Some(Box::new(e)),
            })?;

        extract(archive, scratch.path())?;
        let findings = self.analyze_tree(scratch.path())?;

        let verdict = scoring::evaluate_issues(&findings.issues, findings.warnings.len());
        let result = SecurityScanResult {
            safe: verdict.safe,
            score: verdict.score,
            issues: findings.issues,
            warnings: findings.warnings,
            file_analysis: findings.files,
            checksum,
            scan_time,
            scan_duration_ms: started.elapsed().as_millis() as u64,
            overall_risk: verdict.risk,
            recommendation: verdict.risk.recommendation().to_string(),
            galaxy_safe: verdict.galaxy_safe,
        };

        info!(
            archive = %archive.display(),
            score = result.score,
            safe = result.safe,
            issues = result.issues.len(),
            warnings = result.warnings.len(),
            risk = %result.overall_risk,
            "plugin archive scanned"
        );
        Ok(result)
    }

    fn analyze_tree(&self, root: &Path) -> Result<Findings, GalaxyError> {
        let mut findings = Findings::default();

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|e| GalaxyError::Scan {
                message: "failed to walk extracted archive".into(),
                source: Some(Box::new(e)),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .replace('\\', "/");

            let analysis = self.analyze_file(entry.path(), &relative, &mut findings)?;
            debug!(file = %relative, size = analysis.size, issues = analysis.issue_count, "analyzed file");
            findings.files.insert(relative, analysis);
        }

        Ok(findings)
    }

    fn analyze_file(
        &self,
        path: &Path,
        relative: &str,
        findings: &mut Findings,
    ) -> Result<FileAnalysis, GalaxyError> {
        let scan_err = |e: io::Error| GalaxyError::Scan {
            message: format!("failed to read {relative}"),
            source: Some(Box::new(e)),
        };

        let size = path.metadata().map_err(scan_err)?.len();
        let file_type = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
            .unwrap_or_default();
        let mut analysis = FileAnalysis {
            file_type,
            size,
            checksum: sha256_file(path).map_err(scan_err)?,
            ..FileAnalysis::default()
        };

        let issues_before = findings.issues.len();
        let warnings_before = findings.warnings.len();
        let mut warn = |kind: &str, description: String, line: Option<usize>| {
            findings.warnings.push(SecurityWarning {
                kind: kind.to_string(),
                description,
                file: relative.to_string(),
                line,
            });
        };

        if size > self.max_file_size {
            warn(
                "Large File Size",
                format!(
                    "File size {size} bytes exceeds the recommended limit of {} bytes",
                    self.max_file_size
                ),
                None,
            );
        }
        if !is_allowed_extension(&analysis.file_type) {
            warn(
                "Unusual File Extension",
                "File extension not commonly used in plugins".to_string(),
                None,
            );
        }

        if is_text_extension(&analysis.file_type) {
            let bytes = std::fs::read(path).map_err(scan_err)?;
            let content = String::from_utf8_lossy(&bytes);
            self.analyze_content(&content, relative, &mut analysis, findings);
        }

        analysis.issue_count = findings.issues.len() - issues_before;
        analysis.warning_count = findings.warnings.len() - warnings_before;
        Ok(analysis)
    }

    fn analyze_content(
        &self,
        content: &str,
        relative: &str,
        analysis: &mut FileAnalysis,
        findings: &mut Findings,
    ) {
        let lines: Vec<&str> = content.split('\n').collect();

        for (index, line) in lines.iter().enumerate() {
            let line_no = index + 1;
            for pattern in MALICIOUS_PATTERNS.iter() {
                if !pattern.regex.is_match(line) {
                    continue;
                }
                findings.issues.push(SecurityIssue {
                    kind: pattern.name.to_string(),
                    severity: pattern.severity,
                    description: pattern.description.to_string(),
                    file: relative.to_string(),
                    line: line_no,
                });
                if analysis.flagged_lines.last() != Some(&line_no) {
                    analysis.flagged_lines.push(line_no);
                }
            }
        }

        let mut warn = |kind: &str, description: String| {
            findings.warnings.push(SecurityWarning {
                kind: kind.to_string(),
                description,
                file: relative.to_string(),
                line: None,
            });
        };

        let long_lines = lines
            .iter()
            .filter(|line| line.len() > MINIFIED_LINE_LENGTH)
            .count();
        if long_lines > lines.len() / 2 {
            warn(
                "Minified Code",
                "Code appears to be minified or obfuscated".to_string(),
            );
        }

        let urls = EXTERNAL_URL.find_iter(content).count();
        if urls > 0 {
            warn(
                "External URLs",
                format!("External URLs detected: {urls} found"),
            );
        }

        if content.contains('\0') {
            warn(
                "Binary Content",
                "Binary content detected in text file".to_string(),
            );
        }
    }
}

fn extract(archive: &Path, dest: &Path) -> Result<(), GalaxyError> {
    let file = File::open(archive).map_err(|e| GalaxyError::Scan {
        message: format!("failed to open archive {}", archive.display()),
        source: Some(Box::new(e)),
    })?;
    let mut tar = Archive::new(GzDecoder::new(BufReader::new(file)));
    tar.unpack(dest).map_err(|e| GalaxyError::Scan {
        message: format!("failed to extract archive {}", archive.display()),
        source: Some(Box::new(e)),
    })
}

fn sha256_file(path: &Path) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut file = File::open(path)?;
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}
