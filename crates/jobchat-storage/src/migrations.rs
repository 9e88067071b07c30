//! Database schema migrations.
//!
//! The session database is intentionally tiny: one key-value table with
//! two fixed keys for the conversation id and the cached message list.

use rusqlite::Connection;
use tracing::info;

use jobchat_core::error::JobChatError;

/// Run all pending database migrations.
///
/// Currently implements the initial schema (version 1). Future migrations
/// can be added by checking the current version and applying incremental
/// changes.
pub fn run_migrations(conn: &Connection) -> Result<(), JobChatError> {
    // Create the migrations tracking table first.
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| JobChatError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| JobChatError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: session_kv");
    }

    Ok(())
}

/// Version 1: session key-value table.
fn apply_v1(conn: &Connection) -> Result<(), JobChatError> {
    conn.execute_batch(
        "
        -- Fixed-key session state (conversation id, cached message list).
        CREATE TABLE IF NOT EXISTS session_kv (
            key         TEXT PRIMARY KEY NOT NULL,
            value       TEXT NOT NULL,
            updated_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        INSERT INTO schema_migrations (version, name) VALUES (1, 'session_kv');
        ",
    )
    .map_err(|e| JobChatError::Storage(format!("Failed to apply v1 schema: {}", e)))
}
