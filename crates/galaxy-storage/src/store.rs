// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`PluginStore`] over SQLite.
//!
//! Identities live in `plugins` and are never deleted, so reinstalling the
//! same identity yields the same ID. An identity counts as installed only
//! while it has a row in `plugin_installations`.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use galaxy_core::{GalaxyError, PluginId, PluginIdentity, PluginStatus, PluginStore};
use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;
use tracing::{debug, info};

use crate::migrations::run_migrations;

const PRAGMAS: &str = "PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;";

fn map_tr_err(action: &str) -> impl FnOnce(tokio_rusqlite::Error<rusqlite::Error>) -> GalaxyError {
    let message = format!("failed to {action}");
    move |e| GalaxyError::Persistence {
        message,
        source: Some(Box::new(e)),
    }
}

fn parse_status(raw: &str) -> Result<PluginStatus, GalaxyError> {
    PluginStatus::from_str(raw)
        .map_err(|_| GalaxyError::persistence(format!("unknown plugin status '{raw}' in database")))
}

/// SQLite-backed plugin store.
pub struct SqlitePluginStore {
    conn: Connection,
}

impl SqlitePluginStore {
    /// Open (creating if needed) the database at `path` and migrate it.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, GalaxyError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| GalaxyError::Persistence {
                message: format!("failed to create database directory {}", parent.display()),
                source: Some(Box::new(e)),
            })?;
        }
        let conn = Connection::open(path)
            .await
            .map_err(|e| GalaxyError::Persistence {
                message: format!("failed to open database {}", path.display()),
                source: Some(Box::new(e)),
            })?;
        let store = Self::with_connection(conn).await?;
        info!(path = %path.display(), "plugin database opened");
        Ok(store)
    }

    /// An empty, migrated in-memory database.
    pub async fn open_in_memory() -> Result<Self, GalaxyError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| GalaxyError::Persistence {
                message: "failed to open in-memory database".to_string(),
                source: Some(Box::new(e)),
            })?;
        Self::with_connection(conn).await
    }

    async fn with_connection(conn: Connection) -> Result<Self, GalaxyError> {
        conn.call(|conn| {
            conn.execute_batch(PRAGMAS)?;
            Ok(run_migrations(conn))
        })
        .await
        .map_err(map_tr_err("prepare plugin database"))??;
        Ok(Self { conn })
    }

    /// Installed plugins as `(id, identity, status)`, ordered by ID.
    pub async fn list_installations(
        &self,
    ) -> Result<Vec<(PluginId, PluginIdentity, PluginStatus)>, GalaxyError> {
        let rows = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT p.id, p.name, p.version, p.author, p.description, i.status \
                     FROM plugins p JOIN plugin_installations i ON i.plugin_id = p.id \
                     ORDER BY p.id",
                )?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok((
                            PluginId(row.get(0)?),
                            PluginIdentity {
                                name: row.get(1)?,
                                version: row.get(2)?,
                                author: row.get(3)?,
                                description: row.get(4)?,
                            },
                            row.get::<_, String>(5)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(map_tr_err("list plugin installations"))?;

        rows.into_iter()
            .map(|(id, identity, status)| Ok((id, identity, parse_status(&status)?)))
            .collect()
    }
}

#[async_trait]
impl PluginStore for SqlitePluginStore {
    async fn find_plugin_id(
        &self,
        identity: &PluginIdentity,
    ) -> Result<Option<PluginId>, GalaxyError> {
        let identity = identity.clone();
        let id = self
            .conn
            .call(move |conn| {
                conn.query_row(
                    "SELECT p.id FROM plugins p \
                     JOIN plugin_installations i ON i.plugin_id = p.id \
                     WHERE p.name = ?1 AND p.version = ?2 AND p.author = ?3 AND p.description = ?4",
                    rusqlite::params![
                        identity.name,
                        identity.version,
                        identity.author,
                        identity.description,
                    ],
                    |row| row.get::<_, i64>(0),
                )
                .optional()
            })
            .await
            .map_err(map_tr_err("look up plugin identity"))?;
        Ok(id.map(PluginId))
    }

    async fn is_installed(&self, id: PluginId) -> Result<bool, GalaxyError> {
        Ok(self.plugin_status(id).await?.is_some())
    }

    async fn plugin_status(&self, id: PluginId) -> Result<Option<PluginStatus>, GalaxyError> {
        let status = self
            .conn
            .call(move |conn| {
                conn.query_row(
                    "SELECT status FROM plugin_installations WHERE plugin_id = ?1",
                    rusqlite::params![id.0],
                    |row| row.get::<_, String>(0),
                )
                .optional()
            })
            .await
            .map_err(map_tr_err("read plugin status"))?;
        status.as_deref().map(parse_status).transpose()
    }

    async fn set_plugin_status(
        &self,
        id: PluginId,
        status: PluginStatus,
    ) -> Result<(), GalaxyError> {
        let now = Utc::now().to_rfc3339();
        let value = status.to_string();
        let updated = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE plugin_installations SET status = ?1, updated_at = ?2 \
                     WHERE plugin_id = ?3",
                    rusqlite::params![value, now, id.0],
                )
            })
            .await
            .map_err(map_tr_err("update plugin status"))?;
        if updated == 0 {
            return Err(GalaxyError::persistence(format!(
                "plugin {id} is not installed"
            )));
        }
        debug!(plugin_id = %id, status = %status, "plugin status persisted");
        Ok(())
    }

    async fn create_installation(
        &self,
        identity: &PluginIdentity,
        status: PluginStatus,
    ) -> Result<PluginId, GalaxyError> {
        let identity = identity.clone();
        let now = Utc::now().to_rfc3339();
        let value = status.to_string();
        let id = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO plugins (name, version, author, description, created_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    rusqlite::params![
                        identity.name,
                        identity.version,
                        identity.author,
                        identity.description,
                        now,
                    ],
                )?;
                let id: i64 = tx.query_row(
                    "SELECT id FROM plugins \
                     WHERE name = ?1 AND version = ?2 AND author = ?3 AND description = ?4",
                    rusqlite::params![
                        identity.name,
                        identity.version,
                        identity.author,
                        identity.description,
                    ],
                    |row| row.get(0),
                )?;
                tx.execute(
                    "INSERT OR IGNORE INTO plugin_installations \
                     (plugin_id, status, installed_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
                    rusqlite::params![id, value, now],
                )?;
                tx.commit()?;
                Ok(id)
            })
            .await
            .map_err(map_tr_err("record plugin installation"))?;
        let id = PluginId(id);
        info!(plugin_id = %id, "plugin installation recorded");
        Ok(id)
    }

    async fn delete_installation(&self, id: PluginId) -> Result<(), GalaxyError> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "DELETE FROM plugin_installations WHERE plugin_id = ?1",
                    rusqlite::params![id.0],
                )
            })
            .await
            .map_err(map_tr_err("delete plugin installation"))?;
        debug!(plugin_id = %id, "plugin installation removed");
        Ok(())
    }
}
