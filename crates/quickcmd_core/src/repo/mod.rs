//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define per-entity data access contracts and their SQLite implementations.
//! - Isolate SQL details from the storage handle and its callers.
//!
//! # Invariants
//! - Repository writes must run entity `validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `Conflict`,
//!   `Integrity`) in addition to DB transport errors.
//! - Every read excludes rows with `deleted_at IS NOT NULL`.

use crate::db::migrations::{current_user_version, latest_version, table_exists, REQUIRED_TABLES};
use crate::db::DbError;
use crate::model::entity::{EntityId, EntityKind, EntitySummary, ValidationError};
use rusqlite::{params, Connection};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod association;
pub mod collection_repo;
pub mod command_repo;
mod group;
pub mod hydrate;
pub mod query;
pub mod tag_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Error returned by repository, association and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Caller-supplied entity failed field validation.
    Validation(ValidationError),
    /// Another non-deleted entity of the same kind already uses this name.
    Conflict { entity: EntityKind, name: String },
    /// Target row does not exist or is soft-deleted.
    NotFound { entity: EntityKind, id: EntityId },
    /// A referenced entity does not exist (or is soft-deleted) when linking.
    Integrity { entity: EntityKind, id: EntityId },
    /// Underlying SQLite failure.
    Db(DbError),
    /// Connection schema is not at the expected version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Persisted data cannot be converted into a valid record.
    InvalidData(String),
}

impl RepoError {
    /// Returns whether this error reports a missing or deleted target row.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Stable machine-readable error code, safe to log.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Conflict { .. } => "conflict",
            Self::NotFound { .. } => "not_found",
            Self::Integrity { .. } => "integrity",
            Self::Db(_) => "storage",
            Self::UninitializedConnection { .. } => "uninitialized_connection",
            Self::MissingRequiredTable(_) => "missing_required_table",
            Self::InvalidData(_) => "invalid_data",
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Conflict { entity, name } => {
                write!(f, "{entity} name `{name}` is already in use")
            }
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Integrity { entity, id } => {
                write!(f, "referenced {entity} does not exist: {id}")
            }
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::FromSqlConversionFailure(index, _, err) => {
                Self::InvalidData(format!("column {index}: {err}"))
            }
            other => Self::Db(DbError::Sqlite(other)),
        }
    }
}

/// Current wall-clock time in epoch milliseconds.
pub(crate) fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Rejects connections that did not go through `ensure_schema`.
pub(crate) fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in REQUIRED_TABLES.iter().copied() {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    Ok(())
}

/// Checks whether a non-deleted row of `kind` already uses `name`.
///
/// `exclude_id` skips the row being renamed during updates.
pub(crate) fn name_in_use(
    conn: &Connection,
    kind: EntityKind,
    name: &str,
    exclude_id: Option<EntityId>,
) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        &format!(
            "SELECT EXISTS(
                SELECT 1
                FROM {}
                WHERE name = ?1
                  AND deleted_at IS NULL
                  AND id != ?2
            );",
            kind.table()
        ),
        params![name, exclude_id.unwrap_or(0)],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Checks whether a non-deleted row of `kind` has the given id.
pub(crate) fn entity_is_active(
    conn: &Connection,
    kind: EntityKind,
    id: EntityId,
) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        &format!(
            "SELECT EXISTS(
                SELECT 1
                FROM {}
                WHERE id = ?1
                  AND deleted_at IS NULL
            );",
            kind.table()
        ),
        [id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Marks one row deleted. Fails with `NotFound` when nothing changed.
pub(crate) fn soft_delete_row(
    conn: &Connection,
    kind: EntityKind,
    id: EntityId,
    now: i64,
) -> RepoResult<()> {
    let changed = conn.execute(
        &format!(
            "UPDATE {}
             SET
                deleted_at = ?1,
                updated_at = ?1
             WHERE id = ?2
               AND deleted_at IS NULL;",
            kind.table()
        ),
        params![now, id],
    )?;

    if changed == 0 {
        return Err(RepoError::NotFound { entity: kind, id });
    }
    Ok(())
}

/// Counter columns that can be incremented in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Counter {
    Copy,
    Search,
}

impl Counter {
    fn column(self) -> &'static str {
        match self {
            Self::Copy => "copy_count",
            Self::Search => "search_count",
        }
    }
}

/// Adds one to a counter column of a non-deleted row.
pub(crate) fn increment_counter(
    conn: &Connection,
    kind: EntityKind,
    counter: Counter,
    id: EntityId,
) -> RepoResult<()> {
    let column = counter.column();
    let changed = conn.execute(
        &format!(
            "UPDATE {}
             SET {column} = {column} + 1
             WHERE id = ?1
               AND deleted_at IS NULL;",
            kind.table()
        ),
        [id],
    )?;

    if changed == 0 {
        return Err(RepoError::NotFound { entity: kind, id });
    }
    Ok(())
}

/// Lists `{id, name}` of every non-deleted row, ordered by id.
pub(crate) fn list_summaries(conn: &Connection, kind: EntityKind) -> RepoResult<Vec<EntitySummary>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, name
         FROM {}
         WHERE deleted_at IS NULL
         ORDER BY id ASC;",
        kind.table()
    ))?;
    let mut rows = stmt.query([])?;
    let mut summaries = Vec::new();
    while let Some(row) = rows.next()? {
        summaries.push(EntitySummary {
            id: row.get("id")?,
            name: row.get("name")?,
        });
    }
    Ok(summaries)
}
