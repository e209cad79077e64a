//! Write paths shared by tags and collections.
//!
//! # Responsibility
//! - Run the create/update/delete transactions of a command group once,
//!   parameterized by entity kind and link tables.
//!
//! # Invariants
//! - Every mutation runs in one `IMMEDIATE` transaction.
//! - Deleting a group purges its OS rows and command links in that same
//!   transaction; the group row itself is only tombstoned.

use crate::model::entity::{Collection, EntityId, EntityKind, Tag};
use crate::model::os::OsLabel;
use crate::repo::association::{
    Relation, COLLECTION_COMMANDS, COLLECTION_OS, TAG_COMMANDS, TAG_OS,
};
use crate::repo::{
    entity_is_active, name_in_use, now_epoch_ms, soft_delete_row, RepoError, RepoResult,
};
use rusqlite::{params, Connection, TransactionBehavior};

/// Row table plus link tables of one group kind.
pub(crate) struct GroupTables {
    kind: EntityKind,
    os: &'static Relation<OsLabel>,
    commands: &'static Relation<EntityId>,
}

pub(crate) const TAG_GROUP: GroupTables = GroupTables {
    kind: EntityKind::Tag,
    os: &TAG_OS,
    commands: &TAG_COMMANDS,
};

pub(crate) const COLLECTION_GROUP: GroupTables = GroupTables {
    kind: EntityKind::Collection,
    os: &COLLECTION_OS,
    commands: &COLLECTION_COMMANDS,
};

/// Persisted fields common to tags and collections.
pub(crate) struct GroupFields<'a> {
    pub id: EntityId,
    pub name: &'a str,
    pub description: &'a str,
    pub os: &'a [OsLabel],
    pub command_ids: &'a [EntityId],
}

impl<'a> From<&'a Tag> for GroupFields<'a> {
    fn from(tag: &'a Tag) -> Self {
        Self {
            id: tag.id,
            name: &tag.name,
            description: &tag.description,
            os: &tag.os,
            command_ids: &tag.command_ids,
        }
    }
}

impl<'a> From<&'a Collection> for GroupFields<'a> {
    fn from(collection: &'a Collection) -> Self {
        Self {
            id: collection.id,
            name: &collection.name,
            description: &collection.description,
            os: &collection.os,
            command_ids: &collection.command_ids,
        }
    }
}

impl GroupTables {
    /// Inserts the group row with zeroed counters and its links.
    ///
    /// `fields.id` is ignored; the new row id is returned.
    pub(crate) fn create(
        &self,
        conn: &mut Connection,
        fields: &GroupFields<'_>,
        now: i64,
    ) -> RepoResult<EntityId> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if name_in_use(&tx, self.kind, fields.name, None)? {
            return Err(RepoError::Conflict {
                entity: self.kind,
                name: fields.name.to_string(),
            });
        }

        tx.execute(
            &format!(
                "INSERT INTO {} (name, description, search_count, created_at, updated_at)
                 VALUES (?1, ?2, 0, ?3, ?3);",
                self.kind.table()
            ),
            params![fields.name, fields.description, now],
        )?;
        let id = tx.last_insert_rowid();
        for os in fields.os {
            self.os.add(&tx, id, os)?;
        }
        for command_id in fields.command_ids {
            self.commands.add(&tx, id, command_id)?;
        }
        tx.commit()?;
        Ok(id)
    }

    /// Rewrites name and description and reconciles both link sets.
    pub(crate) fn update(&self, conn: &mut Connection, fields: &GroupFields<'_>) -> RepoResult<()> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !entity_is_active(&tx, self.kind, fields.id)? {
            return Err(RepoError::NotFound {
                entity: self.kind,
                id: fields.id,
            });
        }
        if name_in_use(&tx, self.kind, fields.name, Some(fields.id))? {
            return Err(RepoError::Conflict {
                entity: self.kind,
                name: fields.name.to_string(),
            });
        }

        tx.execute(
            &format!(
                "UPDATE {}
                 SET
                    name = ?1,
                    description = ?2,
                    updated_at = ?3
                 WHERE id = ?4
                   AND deleted_at IS NULL;",
                self.kind.table()
            ),
            params![fields.name, fields.description, now_epoch_ms(), fields.id],
        )?;
        self.os.reconcile(&tx, fields.id, fields.os)?;
        self.commands.reconcile(&tx, fields.id, fields.command_ids)?;
        tx.commit()?;
        Ok(())
    }

    /// Tombstones the group row and purges its OS rows and command links.
    pub(crate) fn delete(&self, conn: &mut Connection, id: EntityId) -> RepoResult<()> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        soft_delete_row(&tx, self.kind, id, now_epoch_ms())?;
        self.os.remove_all(&tx, id)?;
        self.commands.remove_all(&tx, id)?;
        tx.commit()?;
        Ok(())
    }
}
