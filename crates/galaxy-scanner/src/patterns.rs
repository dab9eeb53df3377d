// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Static pattern tables used by the scanner.

use std::sync::LazyLock;

use regex::Regex;

use crate::report::Severity;

/// A named regular expression that flags a suspicious line.
#[derive(Debug)]
pub struct MaliciousPattern {
    pub name: &'static str,
    pub severity: Severity,
    pub description: &'static str,
    pub regex: Regex,
}

impl MaliciousPattern {
    fn new(
        name: &'static str,
        pattern: &str,
        severity: Severity,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            severity,
            description,
            regex: Regex::new(pattern).unwrap(),
        }
    }
}

pub static MALICIOUS_PATTERNS: LazyLock<Vec<MaliciousPattern>> = LazyLock::new(|| {
    vec![
        MaliciousPattern::new(
            "System Command Execution",
            r"(?i)(system|exec|eval|shell_exec|passthru|popen|proc_open|pcntl_exec)",
            Severity::Critical,
            "Potential system command execution detected",
        ),
        MaliciousPattern::new(
            "File System Access",
            r"(?i)(file_get_contents|file_put_contents|fopen|unlink|rmdir|mkdir|chmod|chown)",
            Severity::High,
            "File system access operations detected",
        ),
        MaliciousPattern::new(
            "Network Access",
            r"(?i)(curl|wget|http_get|file_get_contents.*http|fsockopen|pfsockopen)",
            Severity::High,
            "Network access operations detected",
        ),
        MaliciousPattern::new(
            "Database Access",
            r"(?i)(mysql_|mysqli_|pdo_|sqlite_|postgres_|mongo_)",
            Severity::High,
            "Direct database access detected",
        ),
        MaliciousPattern::new(
            "Encoded/Encrypted Code",
            r"(?i)(base64_decode|gzinflate|gzuncompress|gzdecode|str_rot13)",
            Severity::High,
            "Encoded or obfuscated code detected",
        ),
        MaliciousPattern::new(
            "Dynamic Code Execution",
            r"(?i)(create_function|call_user_func|call_user_func_array|assert|include|require)",
            Severity::Critical,
            "Dynamic code execution detected",
        ),
        MaliciousPattern::new(
            "Process Control",
            r"(?i)(pcntl_|posix_|getmypid|getmyuid|getmygid)",
            Severity::High,
            "Process control functions detected",
        ),
        MaliciousPattern::new(
            "Environment Access",
            r"(?i)(getenv|putenv|\$_ENV|\$_SERVER)",
            Severity::Medium,
            "Environment variable access detected",
        ),
        MaliciousPattern::new(
            "Suspicious WASM Imports",
            r"(?i)(wasi_snapshot_preview1|env\.|import\.)",
            Severity::Medium,
            "Suspicious WebAssembly imports detected",
        ),
        MaliciousPattern::new(
            "Hardcoded Credentials",
            r"(?i)(password|secret|key|token|credential).*[=:].*[a-zA-Z0-9]{8,}",
            Severity::High,
            "Potential hardcoded credentials detected",
        ),
    ]
});

pub static EXTERNAL_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>"{}|\\^`\[\]]+"#).unwrap());

/// Extensions a plugin archive may contain without a warning.
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    ".wasm", ".yml", ".yaml", ".json", ".md", ".txt", ".js", ".css", ".html",
];

/// Extensions whose contents are scanned line by line.
pub const TEXT_EXTENSIONS: &[&str] = &[
    ".yml", ".yaml", ".json", ".md", ".txt", ".js", ".css", ".html", ".go", ".py", ".sh", ".bat",
    ".ps1", ".php",
];

/// Lines longer than this count towards the minified-code heuristic.
pub const MINIFIED_LINE_LENGTH: usize = 200;

pub fn is_allowed_extension(ext: &str) -> bool {
    ALLOWED_EXTENSIONS.contains(&ext)
}

pub fn is_text_extension(ext: &str) -> bool {
    TEXT_EXTENSIONS.contains(&ext)
}
