// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Manifest-declared permissions gating `host_k8s_api_call`.

use percent_encoding::percent_decode_str;

/// Permission entry that grants access to every API path.
pub const WILDCARD: &str = "*";

/// The API path prefixes a plugin declared in its manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Permissions {
    prefixes: Vec<String>,
}

impl Permissions {
    pub fn new(entries: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            prefixes: entries
                .into_iter()
                .map(Into::into)
                .map(|entry: String| entry.trim().to_string())
                .filter(|entry| !entry.is_empty())
                .collect(),
        }
    }

    /// Whether `path` falls under one of the declared prefixes.
    ///
    /// A prefix only matches on a segment boundary, so `/api/v1/pods` does not
    /// grant `/api/v1/podsecuritypolicies`. Paths that are not canonical (see
    /// [`canonical_api_path`]) are always denied.
    pub fn allows(&self, path: &str) -> bool {
        let Some(path) = canonical_api_path(path) else {
            return false;
        };
        self.prefixes.iter().any(|prefix| {
            if prefix == WILDCARD {
                return true;
            }
            let prefix = prefix.trim_end_matches('/');
            match path.strip_prefix(prefix) {
                Some(rest) => rest.is_empty() || rest.starts_with('/'),
                None => false,
            }
        })
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

/// The percent-decoded path component of an API path, without its query.
///
/// Returns `None` unless the decoded path is absolute and free of `.` and
/// `..` segments, backslashes, NUL bytes and leftover `%` escapes. URL parsers
/// resolve dot segments, encoded or not, before a request is sent.
pub fn canonical_api_path(path: &str) -> Option<String> {
    let raw = path.split_once('?').map_or(path, |(path, _)| path);
    if !raw.starts_with('/') {
        return None;
    }
    let decoded = percent_decode_str(raw).decode_utf8().ok()?;
    if decoded.contains(['\\', '\0', '%']) {
        return None;
    }
    if decoded
        .split('/')
        .any(|segment| segment == "." || segment == "..")
    {
        return None;
    }
    Some(decoded.into_owned())
}
