// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Galaxy integration tests.
//!
//! # Components
//!
//! - [`MemoryPluginStore`] - in-memory installation store
//! - [`StubKube`] - Kubernetes API stand-in that records requests
//! - [`fixtures`] - guest modules written in WebAssembly text
//! - [`PluginDirBuilder`] - writes a `<name>-<id>` plugin folder

pub mod fixtures;
pub mod plugin_dir;
pub mod store;
pub mod stub_kube;

pub use plugin_dir::{PluginDirBuilder, test_identity};
pub use store::MemoryPluginStore;
pub use stub_kube::StubKube;
