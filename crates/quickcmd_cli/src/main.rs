//! CLI smoke entry point.
//!
//! # Responsibility
//! - Open (or create) a database file through `quickcmd_core` and ensure the
//!   schema, as the UI does at startup.
//! - Print one summary line per entity kind for quick local sanity checks.
//!
//! Usage: `quickcmd_cli [DB_PATH]`. Set `QUICKCMD_LOG_DIR` to an absolute
//! directory to enable file logging.

use log::info;
use quickcmd_core::{core_version, init_logging_from_env, Store, DEFAULT_DB_FILE_NAME};
use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(err) = init_logging_from_env() {
        eprintln!("logging disabled: {err}");
    }

    let db_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_DB_FILE_NAME.to_string());

    match run(&db_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("quickcmd: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(db_path: &str) -> Result<(), quickcmd_core::RepoError> {
    println!("quickcmd_core version={}", core_version());

    let mut store = Store::open(db_path)?;
    let tags = store.get_all_tags_id_and_name()?.len();
    let collections = store.get_all_collections_id_and_name()?.len();
    let commands = store.get_all_commands_id_and_name()?.len();

    println!("tags={tags}");
    println!("collections={collections}");
    println!("commands={commands}");
    info!(
        "event=cli_probe module=cli status=ok tags={tags} collections={collections} commands={commands}"
    );

    store.close()
}
