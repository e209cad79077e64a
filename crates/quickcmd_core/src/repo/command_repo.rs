//! Command repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist commands together with OS scope, tags and collections.
//! - Resolve the commands reachable from a set of tags or collections.
//! - Track copy/search usage counters.
//!
//! # Invariants
//! - Every mutation runs in one `IMMEDIATE` transaction.
//! - Deleting a command only tombstones its row. Link rows stay behind and
//!   every read path filters them by joining on `deleted_at IS NULL`.
//! - Lookup by tag/collection ids never returns the same command twice.

use crate::model::entity::{Command, EntityId, EntityKind, EntitySummary, ValidationError};
use crate::repo::association::{
    Relation, COLLECTION_COMMANDS, COMMAND_COLLECTIONS, COMMAND_OS, COMMAND_TAGS, MAX_BIND_PARAMS,
    TAG_COMMANDS,
};
use crate::repo::hydrate::hydrate_commands;
use crate::repo::query::{
    build_list_query, order_clause, placeholders, select_columns, BuiltQuery, ListOption,
    SortOption,
};
use crate::repo::{
    ensure_connection_ready, entity_is_active, increment_counter, list_summaries, name_in_use,
    now_epoch_ms, soft_delete_row, Counter, RepoError, RepoResult,
};
use rusqlite::{params, params_from_iter, Connection, Row, TransactionBehavior};
use std::collections::HashSet;

/// Repository interface for command persistence.
pub trait CommandRepository {
    /// Inserts a new command and fills in the stored fields.
    fn create_command(&mut self, command: &mut Command) -> RepoResult<EntityId>;
    /// Loads one non-deleted command with associations.
    fn get_command(&self, id: EntityId) -> RepoResult<Command>;
    /// Lists non-deleted commands matching `option`.
    fn list_commands(&self, option: &ListOption) -> RepoResult<Vec<Command>>;
    /// Lists distinct non-deleted commands linked to any of the given tags.
    fn list_commands_by_tag_ids(&self, tag_ids: &[EntityId]) -> RepoResult<Vec<Command>>;
    /// Lists distinct non-deleted commands in any of the given collections.
    fn list_commands_by_collection_ids(
        &self,
        collection_ids: &[EntityId],
    ) -> RepoResult<Vec<Command>>;
    /// Replaces name, content, description, OS scope, tags and collections.
    fn update_command(&mut self, command: &Command) -> RepoResult<()>;
    /// Soft-deletes one command.
    fn delete_command(&mut self, id: EntityId) -> RepoResult<()>;
    /// Returns `{id, name}` of every non-deleted command.
    fn command_summaries(&self) -> RepoResult<Vec<EntitySummary>>;
    /// Increments the copy counter of one non-deleted command.
    fn record_command_copy(&self, id: EntityId) -> RepoResult<()>;
    /// Increments the search counter of one non-deleted command.
    fn record_command_search(&self, id: EntityId) -> RepoResult<()>;
}

/// SQLite-backed command repository.
pub struct SqliteCommandRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteCommandRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl CommandRepository for SqliteCommandRepository<'_> {
    fn create_command(&mut self, command: &mut Command) -> RepoResult<EntityId> {
        command.validate()?;
        let mut record = command.clone();
        record.normalize_associations();
        let now = now_epoch_ms();

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        if name_in_use(&tx, EntityKind::Command, &record.name, None)? {
            return Err(RepoError::Conflict {
                entity: EntityKind::Command,
                name: record.name,
            });
        }

        tx.execute(
            "INSERT INTO commands (
                name,
                content,
                description,
                copy_count,
                search_count,
                created_at,
                updated_at
            )
            VALUES (?1, ?2, ?3, 0, 0, ?4, ?4);",
            params![record.name, record.content, record.description, now],
        )?;
        let id = tx.last_insert_rowid();
        for os in &record.os {
            COMMAND_OS.add(&tx, id, os)?;
        }
        for tag_id in &record.tag_ids {
            COMMAND_TAGS.add(&tx, id, tag_id)?;
        }
        for collection_id in &record.collection_ids {
            COMMAND_COLLECTIONS.add(&tx, id, collection_id)?;
        }
        tx.commit()?;

        record.id = id;
        record.copy_count = 0;
        record.search_count = 0;
        record.created_at = now;
        record.updated_at = now;
        record.deleted_at = None;
        *command = record;
        Ok(id)
    }

    fn get_command(&self, id: EntityId) -> RepoResult<Command> {
        let not_found = RepoError::NotFound {
            entity: EntityKind::Command,
            id,
        };
        if id <= 0 {
            return Err(not_found);
        }

        let option = ListOption {
            id: Some(id),
            ..ListOption::default()
        };
        self.list_commands(&option)?.pop().ok_or(not_found)
    }

    fn list_commands(&self, option: &ListOption) -> RepoResult<Vec<Command>> {
        let query = build_list_query(EntityKind::Command, option);
        let mut commands = query_commands(self.conn, query)?;
        hydrate_commands(self.conn, &mut commands)?;
        Ok(commands)
    }

    fn list_commands_by_tag_ids(&self, tag_ids: &[EntityId]) -> RepoResult<Vec<Command>> {
        list_linked_commands(self.conn, &TAG_COMMANDS, EntityKind::Tag, tag_ids)
    }

    fn list_commands_by_collection_ids(
        &self,
        collection_ids: &[EntityId],
    ) -> RepoResult<Vec<Command>> {
        list_linked_commands(
            self.conn,
            &COLLECTION_COMMANDS,
            EntityKind::Collection,
            collection_ids,
        )
    }

    fn update_command(&mut self, command: &Command) -> RepoResult<()> {
        if command.id <= 0 {
            return Err(ValidationError::MissingId(EntityKind::Command).into());
        }
        command.validate()?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !entity_is_active(&tx, EntityKind::Command, command.id)? {
            return Err(RepoError::NotFound {
                entity: EntityKind::Command,
                id: command.id,
            });
        }
        if name_in_use(&tx, EntityKind::Command, &command.name, Some(command.id))? {
            return Err(RepoError::Conflict {
                entity: EntityKind::Command,
                name: command.name.clone(),
            });
        }

        tx.execute(
            "UPDATE commands
             SET
                name = ?1,
                content = ?2,
                description = ?3,
                updated_at = ?4
             WHERE id = ?5
               AND deleted_at IS NULL;",
            params![
                command.name,
                command.content,
                command.description,
                now_epoch_ms(),
                command.id
            ],
        )?;
        COMMAND_OS.reconcile(&tx, command.id, &command.os)?;
        COMMAND_TAGS.reconcile(&tx, command.id, &command.tag_ids)?;
        COMMAND_COLLECTIONS.reconcile(&tx, command.id, &command.collection_ids)?;
        tx.commit()?;
        Ok(())
    }

    fn delete_command(&mut self, id: EntityId) -> RepoResult<()> {
        soft_delete_row(self.conn, EntityKind::Command, id, now_epoch_ms())
    }

    fn command_summaries(&self) -> RepoResult<Vec<EntitySummary>> {
        list_summaries(self.conn, EntityKind::Command)
    }

    fn record_command_copy(&self, id: EntityId) -> RepoResult<()> {
        increment_counter(self.conn, EntityKind::Command, Counter::Copy, id)
    }

    fn record_command_search(&self, id: EntityId) -> RepoResult<()> {
        increment_counter(self.conn, EntityKind::Command, Counter::Search, id)
    }
}

/// Loads commands reachable through `relation` from any active owner id.
///
/// `relation` must map owner id (parent column) to command id (child column).
fn list_linked_commands(
    conn: &Connection,
    relation: &Relation<EntityId>,
    owner: EntityKind,
    owner_ids: &[EntityId],
) -> RepoResult<Vec<Command>> {
    let owner_ids: Vec<EntityId> = owner_ids
        .iter()
        .copied()
        .filter(|id| *id > 0)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    if owner_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut seen = HashSet::new();
    let mut commands = Vec::new();
    for chunk in owner_ids.chunks(MAX_BIND_PARAMS) {
        let query = BuiltQuery {
            sql: linked_commands_sql(relation, owner, chunk.len()),
            params: chunk.iter().map(|id| (*id).into()).collect(),
        };
        for command in query_commands(conn, query)? {
            if seen.insert(command.id) {
                commands.push(command);
            }
        }
    }

    // Chunks are individually ordered; restore the default list order overall.
    commands.sort_by(|left, right| {
        right
            .created_at
            .cmp(&left.created_at)
            .then(right.id.cmp(&left.id))
    });
    hydrate_commands(conn, &mut commands)?;
    Ok(commands)
}

fn linked_commands_sql(relation: &Relation<EntityId>, owner: EntityKind, count: usize) -> String {
    format!(
        "SELECT DISTINCT {columns}
         FROM commands e
         INNER JOIN {link} l ON l.{command_column} = e.id
         INNER JOIN {owner_table} g ON g.id = l.{owner_column} AND g.deleted_at IS NULL
         WHERE e.deleted_at IS NULL
           AND l.{owner_column} IN ({placeholders})
         ORDER BY {order};",
        columns = select_columns(EntityKind::Command),
        link = relation.table(),
        command_column = relation.child_column(),
        owner_table = owner.table(),
        owner_column = relation.parent_column(),
        placeholders = placeholders(count),
        order = order_clause(EntityKind::Command, &SortOption::default()),
    )
}

fn query_commands(conn: &Connection, query: BuiltQuery) -> RepoResult<Vec<Command>> {
    let mut stmt = conn.prepare(&query.sql)?;
    let mut rows = stmt.query(params_from_iter(query.params))?;
    let mut commands = Vec::new();
    while let Some(row) = rows.next()? {
        commands.push(parse_command_row(row)?);
    }
    Ok(commands)
}

fn parse_command_row(row: &Row<'_>) -> RepoResult<Command> {
    Ok(Command {
        id: row.get("id")?,
        name: row.get("name")?,
        content: row.get("content")?,
        description: row.get("description")?,
        copy_count: row.get("copy_count")?,
        search_count: row.get("search_count")?,
        os: Vec::new(),
        tag_ids: Vec::new(),
        collection_ids: Vec::new(),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        deleted_at: row.get("deleted_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::linked_commands_sql;
    use crate::model::entity::EntityKind;
    use crate::repo::association::{COLLECTION_COMMANDS, TAG_COMMANDS};

    #[test]
    fn tag_lookup_joins_active_tags_and_binds_ids() {
        let sql = linked_commands_sql(&TAG_COMMANDS, EntityKind::Tag, 2);
        assert!(sql.starts_with("SELECT DISTINCT"));
        assert!(sql.contains("INNER JOIN command_tags l ON l.command_id = e.id"));
        assert!(sql.contains("INNER JOIN tags g ON g.id = l.tag_id AND g.deleted_at IS NULL"));
        assert!(sql.contains("l.tag_id IN (?, ?)"));
        assert!(sql.contains("WHERE e.deleted_at IS NULL"));
    }

    #[test]
    fn collection_lookup_uses_membership_table() {
        let sql = linked_commands_sql(&COLLECTION_COMMANDS, EntityKind::Collection, 1);
        assert!(sql.contains("INNER JOIN command_collections l ON l.command_id = e.id"));
        assert!(sql.contains("INNER JOIN collections g ON g.id = l.collection_id"));
        assert!(sql.contains("l.collection_id IN (?)"));
    }
}
