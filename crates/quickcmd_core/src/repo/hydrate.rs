//! Batched association loading for entity result sets.
//!
//! # Responsibility
//! - Attach OS labels and linked ids to records loaded without them.
//!
//! # Invariants
//! - Exactly one query per association type per id chunk, regardless of how
//!   many records are hydrated.
//! - Records without links end up with empty vectors, never stale values.

use crate::model::entity::{Collection, Command, EntityId, Tag};
use crate::repo::association::{
    COLLECTION_COMMANDS, COLLECTION_OS, COMMAND_COLLECTIONS, COMMAND_OS, COMMAND_TAGS,
    TAG_COMMANDS, TAG_OS,
};
use crate::repo::RepoResult;
use rusqlite::Connection;

/// Fills `tag_ids`, `collection_ids` and `os` on every command.
pub fn hydrate_commands(conn: &Connection, commands: &mut [Command]) -> RepoResult<()> {
    if commands.is_empty() {
        return Ok(());
    }

    let ids: Vec<EntityId> = commands.iter().map(|command| command.id).collect();
    let mut tags = COMMAND_TAGS.list_by_parents(conn, &ids)?;
    let mut collections = COMMAND_COLLECTIONS.list_by_parents(conn, &ids)?;
    let mut os = COMMAND_OS.list_by_parents(conn, &ids)?;

    for command in commands.iter_mut() {
        command.tag_ids = tags.remove(&command.id).unwrap_or_default();
        command.collection_ids = collections.remove(&command.id).unwrap_or_default();
        command.os = os.remove(&command.id).unwrap_or_default();
    }
    Ok(())
}

/// Fills `os` and `command_ids` on every tag.
pub fn hydrate_tags(conn: &Connection, tags: &mut [Tag]) -> RepoResult<()> {
    if tags.is_empty() {
        return Ok(());
    }

    let ids: Vec<EntityId> = tags.iter().map(|tag| tag.id).collect();
    let mut os = TAG_OS.list_by_parents(conn, &ids)?;
    let mut commands = TAG_COMMANDS.list_by_parents(conn, &ids)?;

    for tag in tags.iter_mut() {
        tag.os = os.remove(&tag.id).unwrap_or_default();
        tag.command_ids = commands.remove(&tag.id).unwrap_or_default();
    }
    Ok(())
}

/// Fills `os` and `command_ids` on every collection.
pub fn hydrate_collections(conn: &Connection, collections: &mut [Collection]) -> RepoResult<()> {
    if collections.is_empty() {
        return Ok(());
    }

    let ids: Vec<EntityId> = collections.iter().map(|collection| collection.id).collect();
    let mut os = COLLECTION_OS.list_by_parents(conn, &ids)?;
    let mut commands = COLLECTION_COMMANDS.list_by_parents(conn, &ids)?;

    for collection in collections.iter_mut() {
        collection.os = os.remove(&collection.id).unwrap_or_default();
        collection.command_ids = commands.remove(&collection.id).unwrap_or_default();
    }
    Ok(())
}
