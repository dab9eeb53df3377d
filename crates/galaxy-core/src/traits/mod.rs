// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the runtime and its external collaborators.

pub mod store;

pub use store::PluginStore;
