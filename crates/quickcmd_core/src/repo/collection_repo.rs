//! Collection repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist collections together with their OS scope and command members.
//!
//! # Invariants
//! - Every mutation runs in one `IMMEDIATE` transaction (see `repo::group`).
//! - Deleting a collection purges its OS rows and command links in that same
//!   transaction; the collection row itself is only tombstoned.

use crate::model::entity::{Collection, EntityId, EntityKind, EntitySummary, ValidationError};
use crate::repo::group::{GroupFields, COLLECTION_GROUP};
use crate::repo::hydrate::hydrate_collections;
use crate::repo::query::{build_list_query, BuiltQuery, ListOption};
use crate::repo::{
    ensure_connection_ready, increment_counter, list_summaries, now_epoch_ms, Counter,
    RepoError, RepoResult,
};
use rusqlite::{params_from_iter, Connection, Row};

/// Repository interface for collection persistence.
pub trait CollectionRepository {
    /// Inserts a new collection and fills in the stored fields.
    fn create_collection(&mut self, collection: &mut Collection) -> RepoResult<EntityId>;
    /// Loads one non-deleted collection with associations.
    fn get_collection(&self, id: EntityId) -> RepoResult<Collection>;
    /// Lists non-deleted collections matching `option`.
    fn list_collections(&self, option: &ListOption) -> RepoResult<Vec<Collection>>;
    /// Replaces name, description, OS scope and command members.
    fn update_collection(&mut self, collection: &Collection) -> RepoResult<()>;
    /// Soft-deletes one collection.
    fn delete_collection(&mut self, id: EntityId) -> RepoResult<()>;
    /// Returns `{id, name}` of every non-deleted collection.
    fn collection_summaries(&self) -> RepoResult<Vec<EntitySummary>>;
    /// Increments the search counter of one non-deleted collection.
    fn record_collection_search(&self, id: EntityId) -> RepoResult<()>;
}

/// SQLite-backed collection repository.
pub struct SqliteCollectionRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteCollectionRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl CollectionRepository for SqliteCollectionRepository<'_> {
    fn create_collection(&mut self, collection: &mut Collection) -> RepoResult<EntityId> {
        collection.validate()?;
        let mut record = collection.clone();
        record.normalize_associations();
        let now = now_epoch_ms();
        let id = COLLECTION_GROUP.create(self.conn, &GroupFields::from(&record), now)?;

        record.id = id;
        record.search_count = 0;
        record.created_at = now;
        record.updated_at = now;
        record.deleted_at = None;
        *collection = record;
        Ok(id)
    }

    fn get_collection(&self, id: EntityId) -> RepoResult<Collection> {
        let not_found = RepoError::NotFound {
            entity: EntityKind::Collection,
            id,
        };
        if id <= 0 {
            return Err(not_found);
        }

        let option = ListOption {
            id: Some(id),
            ..ListOption::default()
        };
        self.list_collections(&option)?.pop().ok_or(not_found)
    }

    fn list_collections(&self, option: &ListOption) -> RepoResult<Vec<Collection>> {
        let query = build_list_query(EntityKind::Collection, option);
        let mut collections = query_collections(self.conn, query)?;
        hydrate_collections(self.conn, &mut collections)?;
        Ok(collections)
    }

    fn update_collection(&mut self, collection: &Collection) -> RepoResult<()> {
        if collection.id <= 0 {
            return Err(ValidationError::MissingId(EntityKind::Collection).into());
        }
        collection.validate()?;
        COLLECTION_GROUP.update(self.conn, &GroupFields::from(collection))
    }

    fn delete_collection(&mut self, id: EntityId) -> RepoResult<()> {
        COLLECTION_GROUP.delete(self.conn, id)
    }

    fn collection_summaries(&self) -> RepoResult<Vec<EntitySummary>> {
        list_summaries(self.conn, EntityKind::Collection)
    }

    fn record_collection_search(&self, id: EntityId) -> RepoResult<()> {
        increment_counter(self.conn, EntityKind::Collection, Counter::Search, id)
    }
}

fn query_collections(conn: &Connection, query: BuiltQuery) -> RepoResult<Vec<Collection>> {
    let mut stmt = conn.prepare(&query.sql)?;
    let mut rows = stmt.query(params_from_iter(query.params))?;
    let mut collections = Vec::new();
    while let Some(row) = rows.next()? {
        collections.push(parse_collection_row(row)?);
    }
    Ok(collections)
}

fn parse_collection_row(row: &Row<'_>) -> RepoResult<Collection> {
    Ok(Collection {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        search_count: row.get("search_count")?,
        os: Vec::new(),
        command_ids: Vec::new(),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        deleted_at: row.get("deleted_at")?,
    })
}
