//! Explicit storage handle consumed by the UI layer.
//!
//! # Responsibility
//! - Own the single SQLite connection for the lifetime of the process.
//! - Expose the collaborator interface (create/get/list/update/delete per
//!   entity, lookups by tag/collection, id+name listings, usage counters).
//! - Emit one metadata-only log event per mutation.
//!
//! # Invariants
//! - A `Store` is only constructed over a connection at the latest schema.
//! - Log events carry ids and error codes, never names or command content.

use crate::db::{open_db, open_db_in_memory};
use crate::model::entity::{Collection, Command, EntityId, EntityKind, EntitySummary, Tag};
use crate::repo::collection_repo::{CollectionRepository, SqliteCollectionRepository};
use crate::repo::command_repo::{CommandRepository, SqliteCommandRepository};
use crate::repo::query::ListOption;
use crate::repo::tag_repo::{SqliteTagRepository, TagRepository};
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use log::{debug, error, info};
use rusqlite::Connection;
use std::path::Path;

/// Storage handle wrapping one migrated connection.
///
/// All operations borrow the handle exclusively, matching the single
/// connection underneath.
#[derive(Debug)]
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Opens (or creates) the database file and ensures the schema.
    ///
    /// # Errors
    /// - `Db` when the file cannot be opened or the schema cannot be applied,
    ///   including a database written by a newer schema version.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Ok(Self {
            conn: open_db(path)?,
        })
    }

    /// Opens a private in-memory database with the schema applied.
    pub fn open_in_memory() -> RepoResult<Self> {
        Ok(Self {
            conn: open_db_in_memory()?,
        })
    }

    /// Wraps an externally opened connection that is already migrated.
    ///
    /// # Errors
    /// - `UninitializedConnection` / `MissingRequiredTable` when the schema
    ///   has not been ensured on `conn`.
    pub fn from_connection(conn: Connection) -> RepoResult<Self> {
        ensure_connection_ready(&conn)?;
        Ok(Self { conn })
    }

    /// Read-only access to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Closes the connection, reporting any error SQLite raises on close.
    pub fn close(self) -> RepoResult<()> {
        match self.conn.close() {
            Ok(()) => {
                info!("event=db_close module=store status=ok");
                Ok(())
            }
            Err((_, err)) => {
                error!("event=db_close module=store status=error error={err}");
                Err(err.into())
            }
        }
    }

    pub fn create_tag(&mut self, tag: &mut Tag) -> RepoResult<EntityId> {
        let result = self.tags().and_then(|mut repo| repo.create_tag(tag));
        log_write("tag_create", EntityKind::Tag, tag.id, &result);
        result
    }

    pub fn get_tag(&mut self, id: EntityId) -> RepoResult<Tag> {
        self.tags()?.get_tag(id)
    }

    pub fn list_tags(&mut self, option: &ListOption) -> RepoResult<Vec<Tag>> {
        self.tags()?.list_tags(option)
    }

    pub fn update_tag(&mut self, tag: &Tag) -> RepoResult<()> {
        let result = self.tags().and_then(|mut repo| repo.update_tag(tag));
        log_write("tag_update", EntityKind::Tag, tag.id, &result);
        result
    }

    pub fn delete_tag(&mut self, id: EntityId) -> RepoResult<()> {
        let result = self.tags().and_then(|mut repo| repo.delete_tag(id));
        log_write("tag_delete", EntityKind::Tag, id, &result);
        result
    }

    pub fn get_all_tags_id_and_name(&mut self) -> RepoResult<Vec<EntitySummary>> {
        self.tags()?.tag_summaries()
    }

    pub fn record_tag_search(&mut self, id: EntityId) -> RepoResult<()> {
        let result = self.tags().and_then(|repo| repo.record_tag_search(id));
        log_write("tag_search_record", EntityKind::Tag, id, &result);
        result
    }

    pub fn create_collection(&mut self, collection: &mut Collection) -> RepoResult<EntityId> {
        let result = self
            .collections()
            .and_then(|mut repo| repo.create_collection(collection));
        log_write(
            "collection_create",
            EntityKind::Collection,
            collection.id,
            &result,
        );
        result
    }

    pub fn get_collection(&mut self, id: EntityId) -> RepoResult<Collection> {
        self.collections()?.get_collection(id)
    }

    pub fn list_collections(&mut self, option: &ListOption) -> RepoResult<Vec<Collection>> {
        self.collections()?.list_collections(option)
    }

    pub fn update_collection(&mut self, collection: &Collection) -> RepoResult<()> {
        let result = self
            .collections()
            .and_then(|mut repo| repo.update_collection(collection));
        log_write(
            "collection_update",
            EntityKind::Collection,
            collection.id,
            &result,
        );
        result
    }

    pub fn delete_collection(&mut self, id: EntityId) -> RepoResult<()> {
        let result = self
            .collections()
            .and_then(|mut repo| repo.delete_collection(id));
        log_write("collection_delete", EntityKind::Collection, id, &result);
        result
    }

    pub fn get_all_collections_id_and_name(&mut self) -> RepoResult<Vec<EntitySummary>> {
        self.collections()?.collection_summaries()
    }

    pub fn record_collection_search(&mut self, id: EntityId) -> RepoResult<()> {
        let result = self
            .collections()
            .and_then(|repo| repo.record_collection_search(id));
        log_write(
            "collection_search_record",
            EntityKind::Collection,
            id,
            &result,
        );
        result
    }

    pub fn create_command(&mut self, command: &mut Command) -> RepoResult<EntityId> {
        let result = self
            .commands()
            .and_then(|mut repo| repo.create_command(command));
        log_write("command_create", EntityKind::Command, command.id, &result);
        result
    }

    pub fn get_command(&mut self, id: EntityId) -> RepoResult<Command> {
        self.commands()?.get_command(id)
    }

    pub fn list_commands(&mut self, option: &ListOption) -> RepoResult<Vec<Command>> {
        self.commands()?.list_commands(option)
    }

    /// Commands carrying any of `tag_ids`, each returned once.
    pub fn get_commands_by_tag_ids(&mut self, tag_ids: &[EntityId]) -> RepoResult<Vec<Command>> {
        self.commands()?.list_commands_by_tag_ids(tag_ids)
    }

    /// Commands belonging to any of `collection_ids`, each returned once.
    pub fn get_commands_by_collection_ids(
        &mut self,
        collection_ids: &[EntityId],
    ) -> RepoResult<Vec<Command>> {
        self.commands()?
            .list_commands_by_collection_ids(collection_ids)
    }

    pub fn update_command(&mut self, command: &Command) -> RepoResult<()> {
        let result = self
            .commands()
            .and_then(|mut repo| repo.update_command(command));
        log_write("command_update", EntityKind::Command, command.id, &result);
        result
    }

    pub fn delete_command(&mut self, id: EntityId) -> RepoResult<()> {
        let result = self.commands().and_then(|mut repo| repo.delete_command(id));
        log_write("command_delete", EntityKind::Command, id, &result);
        result
    }

    pub fn get_all_commands_id_and_name(&mut self) -> RepoResult<Vec<EntitySummary>> {
        self.commands()?.command_summaries()
    }

    pub fn record_command_copy(&mut self, id: EntityId) -> RepoResult<()> {
        let result = self
            .commands()
            .and_then(|repo| repo.record_command_copy(id));
        log_write("command_copy_record", EntityKind::Command, id, &result);
        result
    }

    pub fn record_command_search(&mut self, id: EntityId) -> RepoResult<()> {
        let result = self
            .commands()
            .and_then(|repo| repo.record_command_search(id));
        log_write("command_search_record", EntityKind::Command, id, &result);
        result
    }

    fn tags(&mut self) -> RepoResult<SqliteTagRepository<'_>> {
        SqliteTagRepository::try_new(&mut self.conn)
    }

    fn collections(&mut self) -> RepoResult<SqliteCollectionRepository<'_>> {
        SqliteCollectionRepository::try_new(&mut self.conn)
    }

    fn commands(&mut self) -> RepoResult<SqliteCommandRepository<'_>> {
        SqliteCommandRepository::try_new(&mut self.conn)
    }
}

fn log_write<T>(event: &str, entity: EntityKind, id: EntityId, result: &RepoResult<T>) {
    match result {
        Ok(_) => debug!("event={event} module=store status=ok entity={entity} id={id}"),
        Err(err @ (RepoError::Db(_) | RepoError::InvalidData(_))) => error!(
            "event={event} module=store status=error entity={entity} id={id} error_code={} error={err}",
            err.code()
        ),
        Err(err) => error!(
            "event={event} module=store status=error entity={entity} id={id} error_code={}",
            err.code()
        ),
    }
}
