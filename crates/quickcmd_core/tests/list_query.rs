use quickcmd_core::{
    Collection, Command, ListOption, OsLabel, SortDirection, SortOption, Store, Tag,
};

fn create_command(store: &mut Store, name: &str, os: &[OsLabel]) -> i64 {
    let mut command = Command {
        os: os.to_vec(),
        ..Command::new(name, format!("echo {name}"))
    };
    store.create_command(&mut command).unwrap()
}

fn names(commands: &[Command]) -> Vec<&str> {
    commands.iter().map(|command| command.name.as_str()).collect()
}

fn set_created_at(store: &Store, table: &str, id: i64, created_at: i64) {
    store
        .connection()
        .execute(
            &format!("UPDATE {table} SET created_at = ?1 WHERE id = ?2;"),
            [created_at, id],
        )
        .unwrap();
}

#[test]
fn os_filter_returns_only_matching_commands() {
    let mut store = Store::open_in_memory().unwrap();
    let linux = create_command(&mut store, "apt update", &[OsLabel::Linux]);
    let mac = create_command(&mut store, "brew update", &[OsLabel::Mac]);
    let both = create_command(&mut store, "uname", &[OsLabel::Linux, OsLabel::Mac]);
    let unscoped = create_command(&mut store, "echo", &[]);

    let only_linux = store
        .list_commands(&ListOption {
            os: vec![OsLabel::Linux],
            ..ListOption::default()
        })
        .unwrap();
    let mut ids: Vec<i64> = only_linux.iter().map(|command| command.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![linux, both]);
    // The OS join never duplicates rows, and hydration still shows all labels.
    let uname = only_linux
        .iter()
        .find(|command| command.id == both)
        .unwrap();
    assert_eq!(uname.os, vec![OsLabel::Linux, OsLabel::Mac]);

    let linux_or_mac = store
        .list_commands(&ListOption {
            os: vec![OsLabel::Mac, OsLabel::Linux],
            ..ListOption::default()
        })
        .unwrap();
    assert_eq!(linux_or_mac.len(), 3);

    for os in [Vec::new(), OsLabel::ALL.to_vec()] {
        let all = store
            .list_commands(&ListOption {
                os,
                ..ListOption::default()
            })
            .unwrap();
        let mut ids: Vec<i64> = all.iter().map(|command| command.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![linux, mac, both, unscoped]);
    }
}

#[test]
fn os_filter_applies_to_tags_and_collections() {
    let mut store = Store::open_in_memory().unwrap();
    let mut windows_tag = Tag {
        os: vec![OsLabel::Windows],
        ..Tag::new("powershell")
    };
    store.create_tag(&mut windows_tag).unwrap();
    let mut plain_tag = Tag::new("misc");
    store.create_tag(&mut plain_tag).unwrap();
    let mut mac_collection = Collection {
        os: vec![OsLabel::Mac],
        ..Collection::new("macos setup")
    };
    store.create_collection(&mut mac_collection).unwrap();

    let option = ListOption {
        os: vec![OsLabel::Windows],
        ..ListOption::default()
    };
    let tags = store.list_tags(&option).unwrap();
    assert_eq!(tags, vec![windows_tag]);
    assert!(store.list_collections(&option).unwrap().is_empty());
}

#[test]
fn name_filter_is_case_sensitive_substring() {
    let mut store = Store::open_in_memory().unwrap();
    create_command(&mut store, "Git status", &[]);
    create_command(&mut store, "git log", &[]);
    create_command(&mut store, "100% disk", &[]);

    let option = |name: &str| ListOption {
        name: Some(name.to_string()),
        sort: SortOption {
            name: Some(SortDirection::Asc),
            ..SortOption::default()
        },
        ..ListOption::default()
    };

    assert_eq!(
        names(&store.list_commands(&option("git")).unwrap()),
        vec!["git log"]
    );
    assert_eq!(
        names(&store.list_commands(&option("it")).unwrap()),
        vec!["Git status", "git log"]
    );
    // Wildcard characters are matched literally.
    assert_eq!(
        names(&store.list_commands(&option("%")).unwrap()),
        vec!["100% disk"]
    );
    assert_eq!(store.list_commands(&option("")).unwrap().len(), 3);
    assert!(store.list_commands(&option("  ")).unwrap().is_empty());
}

#[test]
fn whitespace_name_filter_matches_only_names_containing_it() {
    let mut store = Store::open_in_memory().unwrap();
    create_command(&mut store, "ab", &[]);
    create_command(&mut store, "a b", &[]);

    let listed = store
        .list_commands(&ListOption {
            name: Some(" ".to_string()),
            ..ListOption::default()
        })
        .unwrap();
    assert_eq!(names(&listed), vec!["a b"]);
}

#[test]
fn id_filter_selects_one_row() {
    let mut store = Store::open_in_memory().unwrap();
    create_command(&mut store, "one", &[]);
    let two = create_command(&mut store, "two", &[]);

    let listed = store
        .list_commands(&ListOption {
            id: Some(two),
            ..ListOption::default()
        })
        .unwrap();
    assert_eq!(names(&listed), vec!["two"]);
}

#[test]
fn sort_keys_follow_precedence() {
    let mut store = Store::open_in_memory().unwrap();
    let a = create_command(&mut store, "a", &[]);
    let b = create_command(&mut store, "b", &[]);
    let c = create_command(&mut store, "c", &[]);
    set_created_at(&store, "commands", a, 3_000);
    set_created_at(&store, "commands", b, 1_000);
    set_created_at(&store, "commands", c, 2_000);
    store.record_command_copy(b).unwrap();
    store.record_command_copy(b).unwrap();
    store.record_command_copy(c).unwrap();

    let by = |sort: SortOption| ListOption {
        sort,
        ..ListOption::default()
    };

    let default_order = store.list_commands(&ListOption::default()).unwrap();
    assert_eq!(names(&default_order), vec!["a", "c", "b"]);

    let name_desc = store
        .list_commands(&by(SortOption {
            name: Some(SortDirection::Desc),
            created_at: Some(SortDirection::Asc),
            count: Some(SortDirection::Asc),
        }))
        .unwrap();
    assert_eq!(names(&name_desc), vec!["c", "b", "a"]);

    let created_asc = store
        .list_commands(&by(SortOption {
            created_at: Some(SortDirection::Asc),
            count: Some(SortDirection::Desc),
            ..SortOption::default()
        }))
        .unwrap();
    assert_eq!(names(&created_asc), vec!["b", "c", "a"]);

    let most_copied = store
        .list_commands(&by(SortOption {
            count: Some(SortDirection::Desc),
            ..SortOption::default()
        }))
        .unwrap();
    assert_eq!(names(&most_copied), vec!["b", "c", "a"]);
}

#[test]
fn tag_count_sort_uses_search_count() {
    let mut store = Store::open_in_memory().unwrap();
    let mut rare = Tag::new("rare");
    let rare_id = store.create_tag(&mut rare).unwrap();
    let mut popular = Tag::new("popular");
    let popular_id = store.create_tag(&mut popular).unwrap();
    store.record_tag_search(popular_id).unwrap();

    let tags = store
        .list_tags(&ListOption {
            sort: SortOption {
                count: Some(SortDirection::Desc),
                ..SortOption::default()
            },
            ..ListOption::default()
        })
        .unwrap();
    let ids: Vec<i64> = tags.iter().map(|tag| tag.id).collect();
    assert_eq!(ids, vec![popular_id, rare_id]);
}

#[test]
fn list_excludes_deleted_rows_and_returns_empty_vec() {
    let mut store = Store::open_in_memory().unwrap();
    assert!(store.list_tags(&ListOption::default()).unwrap().is_empty());

    let id = create_command(&mut store, "gone", &[OsLabel::Linux]);
    store.delete_command(id).unwrap();
    assert!(store
        .list_commands(&ListOption {
            os: vec![OsLabel::Linux],
            ..ListOption::default()
        })
        .unwrap()
        .is_empty());
}
