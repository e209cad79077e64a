use quickcmd_core::db::open_db_in_memory;
use quickcmd_core::repo::association::{COMMAND_OS, COMMAND_TAGS, TAG_COMMANDS};
use quickcmd_core::repo::command_repo::{CommandRepository, SqliteCommandRepository};
use quickcmd_core::repo::tag_repo::{SqliteTagRepository, TagRepository};
use quickcmd_core::{Command, EntityKind, OsLabel, RepoError, Tag};
use rusqlite::Connection;

fn seed(conn: &mut Connection) -> (i64, i64) {
    let tag_id = {
        let mut repo = SqliteTagRepository::try_new(conn).unwrap();
        repo.create_tag(&mut Tag::new("linux")).unwrap()
    };
    let command_id = {
        let mut repo = SqliteCommandRepository::try_new(conn).unwrap();
        repo.create_command(&mut Command::new("who", "whoami"))
            .unwrap()
    };
    (tag_id, command_id)
}

fn link_rows(conn: &Connection, command_id: i64, tag_id: i64) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM command_tags WHERE command_id = ?1 AND tag_id = ?2;",
        [command_id, tag_id],
        |row| row.get(0),
    )
    .unwrap()
}

#[test]
fn add_is_idempotent() {
    let mut conn = open_db_in_memory().unwrap();
    let (tag_id, command_id) = seed(&mut conn);

    assert!(COMMAND_TAGS.add(&conn, command_id, &tag_id).unwrap());
    assert!(!COMMAND_TAGS.add(&conn, command_id, &tag_id).unwrap());

    assert_eq!(link_rows(&conn, command_id, tag_id), 1);
    assert_eq!(
        COMMAND_TAGS.list_by_parent(&conn, command_id).unwrap(),
        vec![tag_id]
    );
    assert_eq!(
        TAG_COMMANDS.list_by_parent(&conn, tag_id).unwrap(),
        vec![command_id]
    );
}

#[test]
fn add_checks_the_referenced_entity() {
    let mut conn = open_db_in_memory().unwrap();
    let (_, command_id) = seed(&mut conn);

    let err = COMMAND_TAGS.add(&conn, command_id, &4242).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Integrity {
            entity: EntityKind::Tag,
            id: 4242
        }
    ));
}

#[test]
fn remove_one_and_remove_all_report_changes() {
    let mut conn = open_db_in_memory().unwrap();
    let (tag_id, command_id) = seed(&mut conn);
    COMMAND_OS.add(&conn, command_id, &OsLabel::Linux).unwrap();
    COMMAND_OS.add(&conn, command_id, &OsLabel::Mac).unwrap();
    COMMAND_TAGS.add(&conn, command_id, &tag_id).unwrap();

    assert!(COMMAND_TAGS.remove_one(&conn, command_id, &tag_id).unwrap());
    assert!(!COMMAND_TAGS.remove_one(&conn, command_id, &tag_id).unwrap());
    assert_eq!(COMMAND_OS.remove_all(&conn, command_id).unwrap(), 2);
    assert!(COMMAND_OS.list_by_parent(&conn, command_id).unwrap().is_empty());
}

#[test]
fn reconcile_writes_only_the_difference() {
    let mut conn = open_db_in_memory().unwrap();
    let (_, command_id) = seed(&mut conn);
    COMMAND_OS.add(&conn, command_id, &OsLabel::Linux).unwrap();
    COMMAND_OS.add(&conn, command_id, &OsLabel::Windows).unwrap();

    let outcome = COMMAND_OS
        .reconcile(&conn, command_id, &[OsLabel::Mac, OsLabel::Linux])
        .unwrap();
    assert_eq!(outcome.added, 1);
    assert_eq!(outcome.removed, 1);
    assert_eq!(
        COMMAND_OS.list_by_parent(&conn, command_id).unwrap(),
        vec![OsLabel::Linux, OsLabel::Mac]
    );

    let unchanged = COMMAND_OS
        .reconcile(&conn, command_id, &[OsLabel::Linux, OsLabel::Mac])
        .unwrap();
    assert!(unchanged.is_unchanged());
}

#[test]
fn batch_listing_groups_children_by_parent() {
    let mut conn = open_db_in_memory().unwrap();
    let (tag_id, first) = seed(&mut conn);
    let second = {
        let mut repo = SqliteCommandRepository::try_new(&mut conn).unwrap();
        repo.create_command(&mut Command::new("where", "pwd")).unwrap()
    };
    COMMAND_TAGS.add(&conn, first, &tag_id).unwrap();
    COMMAND_OS.add(&conn, second, &OsLabel::Windows).unwrap();

    let tags = COMMAND_TAGS.list_by_parents(&conn, &[first, second]).unwrap();
    assert_eq!(tags.get(&first), Some(&vec![tag_id]));
    assert!(!tags.contains_key(&second));

    let os = COMMAND_OS.list_by_parents(&conn, &[first, second]).unwrap();
    assert_eq!(os.get(&second), Some(&vec![OsLabel::Windows]));
    assert!(COMMAND_OS.list_by_parents(&conn, &[]).unwrap().is_empty());
}

#[test]
fn batch_listing_handles_more_ids_than_one_chunk() {
    let mut conn = open_db_in_memory().unwrap();
    let (tag_id, command_id) = seed(&mut conn);
    COMMAND_TAGS.add(&conn, command_id, &tag_id).unwrap();

    let mut parents: Vec<i64> = (10_000..10_800).collect();
    parents.push(command_id);
    let tags = COMMAND_TAGS.list_by_parents(&conn, &parents).unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags.get(&command_id), Some(&vec![tag_id]));
}

#[test]
fn reads_skip_links_to_soft_deleted_children() {
    let mut conn = open_db_in_memory().unwrap();
    let (tag_id, command_id) = seed(&mut conn);
    COMMAND_TAGS.add(&conn, command_id, &tag_id).unwrap();

    conn.execute(
        "UPDATE commands SET deleted_at = 1 WHERE id = ?1;",
        [command_id],
    )
    .unwrap();

    assert!(TAG_COMMANDS.list_by_parent(&conn, tag_id).unwrap().is_empty());
    assert_eq!(link_rows(&conn, command_id, tag_id), 1);
}
