// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the runtime, registry, and HTTP surface.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Persisted numeric identifier of an installed plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginId(pub i64);

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PluginId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>().map(PluginId)
    }
}

/// Runtime status of a plugin. The persisted value is authoritative.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PluginStatus {
    /// Routes are served.
    Active,
    /// Routes stay mounted but requests are rejected.
    Inactive,
}

impl PluginStatus {
    pub fn is_active(self) -> bool {
        matches!(self, PluginStatus::Active)
    }
}

/// HTTP methods a plugin backend route may declare.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    /// Every method, in declaration order.
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
        HttpMethod::Head,
        HttpMethod::Options,
    ];
}

/// The four manifest fields that together identify an installed plugin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PluginIdentity {
    pub name: String,
    pub version: String,
    pub author: String,
    pub description: String,
}

impl fmt::Display for PluginIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} ({})", self.name, self.version, self.author)
    }
}

/// A `(method, path)` pair registered for a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouteRecord {
    pub method: HttpMethod,
    pub path: String,
}

impl RouteRecord {
    /// The externally visible path for this route under `/api/plugins/{id}`.
    pub fn mounted_path(&self, id: PluginId) -> String {
        format!("/api/plugins/{id}{}", self.path)
    }
}

/// Parse the numeric ID out of a `<name>-<id>` plugin folder name.
///
/// Returns `None` when the name has no `-` or the suffix is not an integer.
pub fn parse_folder_id(folder: &str) -> Option<PluginId> {
    let (_, suffix) = folder.rsplit_once('-')?;
    suffix.parse::<i64>().ok().map(PluginId)
}
