use quickcmd_core::db::migrations::{latest_version, REQUIRED_TABLES};
use quickcmd_core::db::{open_db, open_db_in_memory, DbError};
use quickcmd_core::repo::tag_repo::SqliteTagRepository;
use quickcmd_core::{OsLabel, RepoError, Store, Tag};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in REQUIRED_TABLES {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn open_db_enables_foreign_keys() {
    let conn = open_db_in_memory().unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);
}

#[test]
fn opening_same_database_twice_is_idempotent_and_keeps_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quick-cmd.db");

    let mut store = Store::open(&path).unwrap();
    let mut tag = Tag::new("Storage");
    let tag_id = store.create_tag(&mut tag).unwrap();
    store.close().unwrap();

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    drop(conn);

    let mut reopened = Store::open(&path).unwrap();
    assert_eq!(reopened.get_tag(tag_id).unwrap(), tag);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }

    let store_err = Store::open(&path).unwrap_err();
    assert!(matches!(
        store_err,
        RepoError::Db(DbError::UnsupportedSchemaVersion { .. })
    ));
}

#[test]
fn repositories_reject_unmigrated_connections() {
    let mut conn = Connection::open_in_memory().unwrap();
    let err = SqliteTagRepository::try_new(&mut conn)
        .err()
        .expect("raw connection must be rejected");
    assert!(matches!(
        err,
        RepoError::UninitializedConnection {
            actual_version: 0,
            ..
        }
    ));

    let store_err = Store::from_connection(conn).unwrap_err();
    assert!(matches!(store_err, RepoError::UninitializedConnection { .. }));
}

#[test]
fn repositories_reject_connections_missing_tables() {
    let mut conn = open_db_in_memory().unwrap();
    conn.execute_batch("DROP TABLE command_os;").unwrap();

    let err = SqliteTagRepository::try_new(&mut conn)
        .err()
        .expect("missing table must be rejected");
    assert!(matches!(err, RepoError::MissingRequiredTable("command_os")));
}

#[test]
fn reopening_restores_table_dropped_from_current_schema() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quick-cmd.db");

    let store = Store::open(&path).unwrap();
    store.connection().execute_batch("DROP TABLE tag_os;").unwrap();
    store.close().unwrap();

    let mut reopened = Store::open(&path).unwrap();
    assert_table_exists(reopened.connection(), "tag_os");
    assert_eq!(schema_version(reopened.connection()), latest_version());

    let mut tag = Tag {
        os: vec![OsLabel::Linux],
        ..Tag::new("Storage")
    };
    let tag_id = reopened.create_tag(&mut tag).unwrap();
    assert_eq!(reopened.get_tag(tag_id).unwrap().os, vec![OsLabel::Linux]);
}

#[test]
fn store_from_migrated_connection_is_usable() {
    let conn = open_db_in_memory().unwrap();
    let mut store = Store::from_connection(conn).unwrap();
    assert!(store.get_all_tags_id_and_name().unwrap().is_empty());
    assert_eq!(schema_version(store.connection()), latest_version());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
