//! Link-table persistence for command/tag/collection/OS associations.
//!
//! # Responsibility
//! - Describe every link table as a typed `Relation` constant.
//! - Provide add/remove/list primitives plus batched and reconciling forms.
//!
//! # Invariants
//! - Table and column identifiers only ever come from the constants below;
//!   caller-supplied values are always bound parameters.
//! - `add` is insert-or-ignore on the composite key.
//! - Entity links are checked against an active (non-deleted) child before
//!   insert, and reads skip links whose child is soft-deleted.
//! - All functions take `&Connection`, so they run inside the caller's
//!   transaction when handed a `Transaction`.

use crate::model::entity::{EntityId, EntityKind};
use crate::model::os::OsLabel;
use crate::repo::query::placeholders;
use crate::repo::{entity_is_active, RepoError, RepoResult};
use rusqlite::types::{FromSql, ToSql};
use rusqlite::{params, params_from_iter, Connection};
use std::collections::{BTreeSet, HashMap};
use std::marker::PhantomData;

/// Upper bound of ids bound into one `IN (...)` list.
pub(crate) const MAX_BIND_PARAMS: usize = 500;

/// Value stored in the child column of a link table.
pub trait LinkChild: ToSql + FromSql + Ord + Clone {
    /// Returns the referenced entity id, for entity links.
    fn entity_id(&self) -> Option<EntityId>;
}

impl LinkChild for EntityId {
    fn entity_id(&self) -> Option<EntityId> {
        Some(*self)
    }
}

impl LinkChild for OsLabel {
    fn entity_id(&self) -> Option<EntityId> {
        None
    }
}

/// One direction of a link table: parent id -> set of child values.
#[derive(Debug)]
pub struct Relation<C> {
    table: &'static str,
    parent_column: &'static str,
    child_column: &'static str,
    child_kind: Option<EntityKind>,
    _child: PhantomData<fn() -> C>,
}

/// Row counts produced by `Relation::reconcile`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub added: usize,
    pub removed: usize,
}

impl ReconcileOutcome {
    pub fn is_unchanged(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}

pub const COMMAND_TAGS: Relation<EntityId> =
    Relation::entity_link("command_tags", "command_id", "tag_id", EntityKind::Tag);
pub const TAG_COMMANDS: Relation<EntityId> =
    Relation::entity_link("command_tags", "tag_id", "command_id", EntityKind::Command);
pub const COMMAND_COLLECTIONS: Relation<EntityId> = Relation::entity_link(
    "command_collections",
    "command_id",
    "collection_id",
    EntityKind::Collection,
);
pub const COLLECTION_COMMANDS: Relation<EntityId> = Relation::entity_link(
    "command_collections",
    "collection_id",
    "command_id",
    EntityKind::Command,
);
pub const COMMAND_OS: Relation<OsLabel> = Relation::os_link("command_os", "command_id");
pub const TAG_OS: Relation<OsLabel> = Relation::os_link("tag_os", "tag_id");
pub const COLLECTION_OS: Relation<OsLabel> = Relation::os_link("collection_os", "collection_id");

impl Relation<EntityId> {
    const fn entity_link(
        table: &'static str,
        parent_column: &'static str,
        child_column: &'static str,
        child_kind: EntityKind,
    ) -> Self {
        Self {
            table,
            parent_column,
            child_column,
            child_kind: Some(child_kind),
            _child: PhantomData,
        }
    }
}

impl Relation<OsLabel> {
    const fn os_link(table: &'static str, parent_column: &'static str) -> Self {
        Self {
            table,
            parent_column,
            child_column: "os",
            child_kind: None,
            _child: PhantomData,
        }
    }
}

impl<C: LinkChild> Relation<C> {
    /// Link table name.
    pub fn table(&self) -> &'static str {
        self.table
    }

    /// Column holding the parent id.
    pub fn parent_column(&self) -> &'static str {
        self.parent_column
    }

    /// Column holding the child value.
    pub fn child_column(&self) -> &'static str {
        self.child_column
    }

    /// Links `child` to `parent`. Returns `false` when the link already existed.
    ///
    /// # Errors
    /// - `Integrity` when an entity child is missing or soft-deleted.
    pub fn add(&self, conn: &Connection, parent: EntityId, child: &C) -> RepoResult<bool> {
        self.ensure_child_active(conn, child)?;
        let inserted = conn.execute(
            &format!(
                "INSERT OR IGNORE INTO {} ({}, {}) VALUES (?1, ?2);",
                self.table, self.parent_column, self.child_column
            ),
            params![parent, child],
        )?;
        Ok(inserted == 1)
    }

    /// Removes one link. Returns `false` when it did not exist.
    pub fn remove_one(&self, conn: &Connection, parent: EntityId, child: &C) -> RepoResult<bool> {
        let removed = conn.execute(
            &format!(
                "DELETE FROM {} WHERE {} = ?1 AND {} = ?2;",
                self.table, self.parent_column, self.child_column
            ),
            params![parent, child],
        )?;
        Ok(removed == 1)
    }

    /// Removes every link owned by `parent` and returns the removed row count.
    pub fn remove_all(&self, conn: &Connection, parent: EntityId) -> RepoResult<usize> {
        let removed = conn.execute(
            &format!(
                "DELETE FROM {} WHERE {} = ?1;",
                self.table, self.parent_column
            ),
            [parent],
        )?;
        Ok(removed)
    }

    /// Lists children of one parent in ascending order.
    pub fn list_by_parent(&self, conn: &Connection, parent: EntityId) -> RepoResult<Vec<C>> {
        let mut by_parent = self.list_by_parents(conn, &[parent])?;
        Ok(by_parent.remove(&parent).unwrap_or_default())
    }

    /// Lists children of many parents with one query per id chunk.
    ///
    /// Parents without links are absent from the map. Child lists are sorted.
    pub fn list_by_parents(
        &self,
        conn: &Connection,
        parents: &[EntityId],
    ) -> RepoResult<HashMap<EntityId, Vec<C>>> {
        let mut result: HashMap<EntityId, Vec<C>> = HashMap::new();
        for chunk in parents.chunks(MAX_BIND_PARAMS) {
            let sql = self.select_by_parents_sql(chunk.len());
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(chunk.iter()))?;
            while let Some(row) = rows.next()? {
                let parent: EntityId = row.get(0)?;
                let child: C = row.get(1)?;
                result.entry(parent).or_default().push(child);
            }
        }

        for children in result.values_mut() {
            children.sort();
            children.dedup();
        }
        Ok(result)
    }

    /// Makes the stored link set of `parent` equal to `desired`.
    ///
    /// Only the symmetric difference is written: missing links are added and
    /// surplus links are removed; links present on both sides are untouched.
    pub fn reconcile(
        &self,
        conn: &Connection,
        parent: EntityId,
        desired: &[C],
    ) -> RepoResult<ReconcileOutcome> {
        let current = self.stored_children(conn, parent)?;
        let desired: BTreeSet<C> = desired.iter().cloned().collect();

        let mut outcome = ReconcileOutcome::default();
        for child in desired.difference(&current) {
            if self.add(conn, parent, child)? {
                outcome.added += 1;
            }
        }
        for child in current.difference(&desired) {
            if self.remove_one(conn, parent, child)? {
                outcome.removed += 1;
            }
        }
        Ok(outcome)
    }

    /// Raw stored children, including links to soft-deleted entities.
    fn stored_children(&self, conn: &Connection, parent: EntityId) -> RepoResult<BTreeSet<C>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} WHERE {} = ?1;",
            self.child_column, self.table, self.parent_column
        ))?;
        let mut rows = stmt.query([parent])?;
        let mut children = BTreeSet::new();
        while let Some(row) = rows.next()? {
            children.insert(row.get::<_, C>(0)?);
        }
        Ok(children)
    }

    fn ensure_child_active(&self, conn: &Connection, child: &C) -> RepoResult<()> {
        let (Some(kind), Some(id)) = (self.child_kind, child.entity_id()) else {
            return Ok(());
        };
        if entity_is_active(conn, kind, id)? {
            Ok(())
        } else {
            Err(RepoError::Integrity { entity: kind, id })
        }
    }

    fn select_by_parents_sql(&self, count: usize) -> String {
        let link = format!(
            "SELECT l.{parent}, l.{child} FROM {table} l",
            parent = self.parent_column,
            child = self.child_column,
            table = self.table
        );
        let join = match self.child_kind {
            Some(kind) => format!(
                " INNER JOIN {} c ON c.id = l.{} AND c.deleted_at IS NULL",
                kind.table(),
                self.child_column
            ),
            None => String::new(),
        };
        format!(
            "{link}{join} WHERE l.{} IN ({});",
            self.parent_column,
            placeholders(count)
        )
    }
}
