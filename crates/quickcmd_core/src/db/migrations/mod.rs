//! SQLite migration registry and executor.
//!
//! # Responsibility
//! - Register schema migrations in strictly increasing order.
//! - Apply pending migrations atomically on every startup.
//! - Recreate missing tables even when the version is already current.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Applied migration version is mirrored to `PRAGMA user_version`.
//! - Every statement is `IF NOT EXISTS`, so re-running a migration is harmless.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("0001_init.sql"),
}];

/// Tables every repository expects after `ensure_schema`.
pub const REQUIRED_TABLES: &[&str] = &[
    "tags",
    "collections",
    "commands",
    "command_tags",
    "command_collections",
    "tag_os",
    "collection_os",
    "command_os",
];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Creates all tables and indexes that are missing.
///
/// Safe to call on every startup. A failure here means the process cannot
/// use the database at all and should abort.
pub fn ensure_schema(conn: &mut Connection) -> DbResult<()> {
    let current_version = current_user_version(conn)?;
    let latest = latest_version();

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    // Applied migrations are replayed too, restoring any table dropped
    // from a database that is already stamped with the latest version.
    let tx = conn.transaction()?;
    for migration in MIGRATIONS {
        tx.execute_batch(migration.sql)?;
        if migration.version > current_version {
            tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
        }
    }
    tx.commit()?;

    for table in REQUIRED_TABLES.iter().copied() {
        if !table_exists(conn, table)? {
            return Err(DbError::MissingTable(table));
        }
    }

    info!(
        "event=schema_ensure module=db status=ok from_version={} to_version={}",
        current_version, latest
    );
    Ok(())
}

/// Checks `sqlite_master` for a table with the given name.
pub fn table_exists(conn: &Connection, table_name: &str) -> DbResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
        [table_name],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Reads `PRAGMA user_version` from the connection.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
