//! Storage core for the quick-command snippet manager.
//! This crate is the single source of truth for persistence invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod store;

pub use db::{ensure_schema, open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{
    default_log_level, init_logging, init_logging_from_env, logging_status, LoggingError,
    LOG_DIR_ENV,
};
pub use model::entity::{
    Collection, Command, EntityId, EntityKind, EntitySummary, Tag, ValidationError,
};
pub use model::os::{OsLabel, ParseOsLabelError};
pub use repo::query::{ListOption, SortDirection, SortOption};
pub use repo::{RepoError, RepoResult};
pub use store::Store;

/// Database file name used when no path is configured.
pub const DEFAULT_DB_FILE_NAME: &str = "quick-cmd.db";

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, DEFAULT_DB_FILE_NAME};

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn default_db_file_is_sqlite_file_name() {
        assert!(DEFAULT_DB_FILE_NAME.ends_with(".db"));
    }
}
