//! Tag repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist tags together with their OS scope and command links.
//! - Serve filtered/sorted tag lists through the shared query builder.
//!
//! # Invariants
//! - Every mutation runs in one `IMMEDIATE` transaction (see `repo::group`).
//! - Deleting a tag purges its OS rows and command links in that same
//!   transaction; the tag row itself is only tombstoned.
//! - The caller's record is only updated after a successful commit.

use crate::model::entity::{EntityId, EntityKind, EntitySummary, Tag, ValidationError};
use crate::repo::group::{GroupFields, TAG_GROUP};
use crate::repo::hydrate::hydrate_tags;
use crate::repo::query::{build_list_query, BuiltQuery, ListOption};
use crate::repo::{
    ensure_connection_ready, increment_counter, list_summaries, now_epoch_ms, Counter,
    RepoError, RepoResult,
};
use rusqlite::{params_from_iter, Connection, Row};

/// Repository interface for tag persistence.
pub trait TagRepository {
    /// Inserts a new tag with its associations and fills in the stored fields.
    fn create_tag(&mut self, tag: &mut Tag) -> RepoResult<EntityId>;
    /// Loads one non-deleted tag with associations.
    fn get_tag(&self, id: EntityId) -> RepoResult<Tag>;
    /// Lists non-deleted tags matching `option`.
    fn list_tags(&self, option: &ListOption) -> RepoResult<Vec<Tag>>;
    /// Replaces name, description, OS scope and command links.
    fn update_tag(&mut self, tag: &Tag) -> RepoResult<()>;
    /// Soft-deletes one tag.
    fn delete_tag(&mut self, id: EntityId) -> RepoResult<()>;
    /// Returns `{id, name}` of every non-deleted tag.
    fn tag_summaries(&self) -> RepoResult<Vec<EntitySummary>>;
    /// Increments the search counter of one non-deleted tag.
    fn record_tag_search(&self, id: EntityId) -> RepoResult<()>;
}

/// SQLite-backed tag repository.
pub struct SqliteTagRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteTagRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl TagRepository for SqliteTagRepository<'_> {
    fn create_tag(&mut self, tag: &mut Tag) -> RepoResult<EntityId> {
        tag.validate()?;
        let mut record = tag.clone();
        record.normalize_associations();
        let now = now_epoch_ms();
        let id = TAG_GROUP.create(self.conn, &GroupFields::from(&record), now)?;

        record.id = id;
        record.search_count = 0;
        record.created_at = now;
        record.updated_at = now;
        record.deleted_at = None;
        *tag = record;
        Ok(id)
    }

    fn get_tag(&self, id: EntityId) -> RepoResult<Tag> {
        let not_found = RepoError::NotFound {
            entity: EntityKind::Tag,
            id,
        };
        if id <= 0 {
            return Err(not_found);
        }

        let option = ListOption {
            id: Some(id),
            ..ListOption::default()
        };
        self.list_tags(&option)?.pop().ok_or(not_found)
    }

    fn list_tags(&self, option: &ListOption) -> RepoResult<Vec<Tag>> {
        let mut tags = query_tags(self.conn, build_list_query(EntityKind::Tag, option))?;
        hydrate_tags(self.conn, &mut tags)?;
        Ok(tags)
    }

    fn update_tag(&mut self, tag: &Tag) -> RepoResult<()> {
        if tag.id <= 0 {
            return Err(ValidationError::MissingId(EntityKind::Tag).into());
        }
        tag.validate()?;
        TAG_GROUP.update(self.conn, &GroupFields::from(tag))
    }

    fn delete_tag(&mut self, id: EntityId) -> RepoResult<()> {
        TAG_GROUP.delete(self.conn, id)
    }

    fn tag_summaries(&self) -> RepoResult<Vec<EntitySummary>> {
        list_summaries(self.conn, EntityKind::Tag)
    }

    fn record_tag_search(&self, id: EntityId) -> RepoResult<()> {
        increment_counter(self.conn, EntityKind::Tag, Counter::Search, id)
    }
}

fn query_tags(conn: &Connection, query: BuiltQuery) -> RepoResult<Vec<Tag>> {
    let mut stmt = conn.prepare(&query.sql)?;
    let mut rows = stmt.query(params_from_iter(query.params))?;
    let mut tags = Vec::new();
    while let Some(row) = rows.next()? {
        tags.push(parse_tag_row(row)?);
    }
    Ok(tags)
}

fn parse_tag_row(row: &Row<'_>) -> RepoResult<Tag> {
    Ok(Tag {
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
