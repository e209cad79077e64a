//! List query construction for tags, collections and commands.
//!
//! # Responsibility
//! - Translate a `ListOption` into entity-specific SQL plus bound values.
//! - Own the filter/sort policy shared by every list use-case.
//!
//! # Invariants
//! - Caller values (name term, id, OS labels) are always bound parameters.
//! - Soft-deleted rows are never selected.
//! - An OS join is always `DISTINCT`-guarded.
//! - At most one sort key is applied: name > created_at > count.

use crate::model::entity::{EntityId, EntityKind};
use crate::model::os::OsLabel;
use crate::repo::association::{COLLECTION_OS, COMMAND_OS, TAG_OS};
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const TAG_COLUMNS: &str = "e.id AS id, e.name AS name, e.description AS description, \
     e.search_count AS search_count, e.created_at AS created_at, \
     e.updated_at AS updated_at, e.deleted_at AS deleted_at";
const COMMAND_COLUMNS: &str = "e.id AS id, e.name AS name, e.content AS content, \
     e.description AS description, e.copy_count AS copy_count, \
     e.search_count AS search_count, e.created_at AS created_at, \
     e.updated_at AS updated_at, e.deleted_at AS deleted_at";

/// Sort direction for one sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Requested ordering. Only the highest-precedence key present is honored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SortOption {
    pub name: Option<SortDirection>,
    pub created_at: Option<SortDirection>,
    /// `copy_count` for commands, `search_count` for tags and collections.
    pub count: Option<SortDirection>,
}

/// Sort key selected from a `SortOption`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    CreatedAt,
    Count,
}

impl SortOption {
    /// Returns the key that will be applied, following name > created_at > count.
    pub fn active_key(&self) -> Option<(SortKey, SortDirection)> {
        self.name
            .map(|direction| (SortKey::Name, direction))
            .or_else(|| self.created_at.map(|direction| (SortKey::CreatedAt, direction)))
            .or_else(|| self.count.map(|direction| (SortKey::Count, direction)))
    }
}

/// Filter and sort options for list operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListOption {
    /// Case-sensitive substring of the name. Empty means no filter.
    pub name: Option<String>,
    /// Exact id match. Non-positive means no filter.
    pub id: Option<EntityId>,
    /// Empty means every entity regardless of OS.
    pub os: Vec<OsLabel>,
    pub sort: SortOption,
}

impl ListOption {
    /// Returns the name term when it is not empty. Whitespace is a real term.
    pub fn name_filter(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }

    /// Returns the id when it is a valid identity.
    pub fn id_filter(&self) -> Option<EntityId> {
        self.id.filter(|id| *id > 0)
    }

    /// Returns the OS labels that require a join, or `None` to match all.
    ///
    /// Both the empty set and the full known enumeration match everything.
    pub fn os_filter(&self) -> Option<Vec<OsLabel>> {
        let labels: BTreeSet<OsLabel> = self.os.iter().copied().collect();
        if labels.is_empty() || labels.len() == OsLabel::ALL.len() {
            None
        } else {
            Some(labels.into_iter().collect())
        }
    }
}

/// SQL text plus positional values, ready for `params_from_iter`.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Builds the list query for one entity kind.
pub fn build_list_query(kind: EntityKind, option: &ListOption) -> BuiltQuery {
    let os_filter = option.os_filter();
    let mut params = Vec::new();

    let mut sql = if os_filter.is_some() {
        let (os_table, os_parent) = os_table(kind);
        format!(
            "SELECT DISTINCT {} FROM {} e INNER JOIN {os_table} o ON o.{os_parent} = e.id",
            select_columns(kind),
            kind.table()
        )
    } else {
        format!("SELECT {} FROM {} e", select_columns(kind), kind.table())
    };
    sql.push_str(" WHERE e.deleted_at IS NULL");

    if let Some(name) = option.name_filter() {
        sql.push_str(" AND instr(e.name, ?) > 0");
        params.push(Value::Text(name.to_string()));
    }

    if let Some(id) = option.id_filter() {
        sql.push_str(" AND e.id = ?");
        params.push(Value::Integer(id));
    }

    if let Some(labels) = os_filter {
        sql.push_str(&format!(" AND o.os IN ({})", placeholders(labels.len())));
        params.extend(
            labels
                .into_iter()
                .map(|label| Value::Text(label.as_str().to_string())),
        );
    }

    sql.push_str(" ORDER BY ");
    sql.push_str(&order_clause(kind, &option.sort));
    BuiltQuery { sql, params }
}

/// Column list (aliased `e.`) selected for one entity kind.
pub fn select_columns(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Command => COMMAND_COLUMNS,
        EntityKind::Tag | EntityKind::Collection => TAG_COLUMNS,
    }
}

/// `ORDER BY` body for one entity kind, with `id` as tie-breaker.
pub fn order_clause(kind: EntityKind, sort: &SortOption) -> String {
    match sort.active_key() {
        Some((key, direction)) => {
            let column = match key {
                SortKey::Name => "e.name",
                SortKey::CreatedAt => "e.created_at",
                SortKey::Count if kind == EntityKind::Command => "e.copy_count",
                SortKey::Count => "e.search_count",
            };
            let direction = direction.as_sql();
            format!("{column} {direction}, e.id {direction}")
        }
        None => "e.created_at DESC, e.id DESC".to_string(),
    }
}

/// Returns `?, ?, ...` with `count` placeholders.
pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn os_table(kind: EntityKind) -> (&'static str, &'static str) {
    let relation = match kind {
        EntityKind::Tag => &TAG_OS,
        EntityKind::Collection => &COLLECTION_OS,
        EntityKind::Command => &COMMAND_OS,
    };
    (relation.table(), relation.parent_column())
}
