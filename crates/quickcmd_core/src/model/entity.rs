//! Command, tag and collection domain records.
//!
//! # Responsibility
//! - Define the records persisted by the repositories.
//! - Validate caller-supplied fields before any SQL runs.
//! - Normalize association sets into their canonical (sorted, unique) form.
//!
//! # Invariants
//! - `id == 0` means "not yet persisted"; assigned ids never change.
//! - Counters start at zero and never go negative.
//! - `deleted_at` is the source of truth for tombstone state.

use crate::model::os::OsLabel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Server-assigned numeric identity shared by all entity types.
pub type EntityId = i64;

/// Entity types handled by the storage core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Tag,
    Collection,
    Command,
}

impl EntityKind {
    /// Base table holding rows of this kind.
    pub fn table(self) -> &'static str {
        match self {
            Self::Tag => "tags",
            Self::Collection => "collections",
            Self::Command => "commands",
        }
    }

    /// Lowercase label used in errors and log events.
    pub fn label(self) -> &'static str {
        match self {
            Self::Tag => "tag",
            Self::Collection => "collection",
            Self::Command => "command",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Field-level validation failures raised before persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Name is empty or whitespace only.
    EmptyName(EntityKind),
    /// Command content is empty or whitespace only.
    EmptyContent,
    /// Update was requested for an entity without identity.
    MissingId(EntityKind),
    /// Association list contains a non-positive id.
    InvalidReference { entity: EntityKind, id: EntityId },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName(kind) => write!(f, "{kind} name cannot be empty"),
            Self::EmptyContent => write!(f, "command content cannot be empty"),
            Self::MissingId(kind) => write!(f, "{kind} id is required"),
            Self::InvalidReference { entity, id } => {
                write!(f, "invalid {entity} id `{id}` in association list")
            }
        }
    }
}

impl Error for ValidationError {}

/// Shell command snippet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub id: EntityId,
    pub name: String,
    /// Snippet text copied to the clipboard by the UI.
    pub content: String,
    pub description: String,
    pub copy_count: i64,
    pub search_count: i64,
    /// Empty means the command applies to every OS.
    pub os: Vec<OsLabel>,
    #[serde(rename = "tagIDs")]
    pub tag_ids: Vec<EntityId>,
    #[serde(rename = "collectionIDs")]
    pub collection_ids: Vec<EntityId>,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,
}

impl Command {
    /// Creates an unsaved command with empty associations.
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    /// Checks required fields and association ids.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName(EntityKind::Command));
        }
        if self.content.trim().is_empty() {
            return Err(ValidationError::EmptyContent);
        }
        validate_ids(EntityKind::Tag, &self.tag_ids)?;
        validate_ids(EntityKind::Collection, &self.collection_ids)
    }

    /// Sorts and de-duplicates every association set in place.
    pub fn normalize_associations(&mut self) {
        self.os = normalize_set(&self.os);
        self.tag_ids = normalize_set(&self.tag_ids);
        self.collection_ids = normalize_set(&self.collection_ids);
    }
}

/// Label grouping commands by topic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: EntityId,
    pub name: String,
    pub description: String,
    pub search_count: i64,
    pub os: Vec<OsLabel>,
    /// Commands carrying this tag (reverse side of `Command::tag_ids`).
    #[serde(rename = "commandIds")]
    pub command_ids: Vec<EntityId>,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName(EntityKind::Tag));
        }
        validate_ids(EntityKind::Command, &self.command_ids)
    }

    pub fn normalize_associations(&mut self) {
        self.os = normalize_set(&self.os);
        self.command_ids = normalize_set(&self.command_ids);
    }
}

/// Named, user-curated group of commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: EntityId,
    pub name: String,
    pub description: String,
    pub search_count: i64,
    pub os: Vec<OsLabel>,
    #[serde(rename = "commandIds")]
    pub command_ids: Vec<EntityId>,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,
}

impl Collection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName(EntityKind::Collection));
        }
        validate_ids(EntityKind::Command, &self.command_ids)
    }

    pub fn normalize_associations(&mut self) {
        self.os = normalize_set(&self.os);
        self.command_ids = normalize_set(&self.command_ids);
    }
}

/// Lightweight `{id, name}` row used to populate selection widgets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySummary {
    pub id: EntityId,
    pub name: String,
}

/// Returns the sorted, de-duplicated form of an association set.
pub fn normalize_set<T: Ord + Clone>(values: &[T]) -> Vec<T> {
    values
        .iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn validate_ids(entity: EntityKind, ids: &[EntityId]) -> Result<(), ValidationError> {
    match ids.iter().find(|id| **id <= 0) {
        Some(id) => Err(ValidationError::InvalidReference { entity, id: *id }),
        None => Ok(()),
    }
}
