// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::GalaxyConfig;

/// Longest per-request timeout accepted for Kubernetes API calls.
pub const MAX_KUBERNETES_TIMEOUT_SECS: u64 = 300;

/// Validate a deserialized configuration, collecting every failure.
pub fn validate_config(config: &GalaxyConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.plugins.directory.trim().is_empty() {
        fail("plugins.directory must not be empty".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let host = config.gateway.host.trim();
    if host.is_empty() {
        fail("gateway.host must not be empty".to_string());
    } else {
        let is_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_ip && !is_hostname {
            fail(format!(
                "gateway.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }

    if config.gateway.port == 0 {
        fail("gateway.port must be non-zero".to_string());
    }

    let timeout = config.kubernetes.timeout_secs;
    if timeout == 0 || timeout > MAX_KUBERNETES_TIMEOUT_SECS {
        fail(format!(
            "kubernetes.timeout_secs must be between 1 and {MAX_KUBERNETES_TIMEOUT_SECS}, got {timeout}"
        ));
    }

    if !config.kubernetes.api_url.starts_with("http://")
        && !config.kubernetes.api_url.starts_with("https://")
    {
        fail(format!(
            "kubernetes.api_url `{}` must start with http:// or https://",
            config.kubernetes.api_url
        ));
    }

    if config.watcher.queue_capacity == 0 {
        fail("watcher.queue_capacity must be at least 1".to_string());
    }

    if config.scanner.max_file_size_bytes == 0 {
        fail("scanner.max_file_size_bytes must be non-zero".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
