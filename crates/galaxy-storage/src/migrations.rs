// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded schema migrations.

use galaxy_core::GalaxyError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Run all pending migrations against the given connection.
///
/// Refinery tracks applied migrations in its own `refinery_schema_history` table.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), GalaxyError> {
    embedded::migrations::runner()
        .run(conn)
        .map_err(|e| GalaxyError::Persistence {
            message: "failed to migrate plugin database".to_string(),
            source: Some(Box::new(e)),
        })?;
    Ok(())
}
