// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for plugin identities and installations.
//!
//! The schema is embedded with refinery and migrated on open. All access goes
//! through a single `tokio-rusqlite` connection thread.

pub mod migrations;
pub mod store;

pub use store::SqlitePluginStore;
