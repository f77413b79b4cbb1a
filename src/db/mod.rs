// Store — one SQLite file holding the latest cluster model, the
// classifications it produced, the last coherence sweep and run state.
//
// Bundled SQLite, path from SIEVE_DB_PATH (./sieve.db by default). Every
// command that reads the store goes through `open`, so an old file picks up
// pending migrations (the v2 `leaning` column) on first use.

pub mod models;
pub mod queries;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

fn connect(db_path: &str) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path))?;
    // Readers (report, export) may run while a classify run writes
    conn.pragma_update(None, "journal_mode", "WAL")?;
    schema::create_tables(&conn)?;
    Ok(conn)
}

/// Create the store, including missing parent directories. Used by `init`
/// and by the commands that write a fresh result set (`classify`, `select-k`).
pub fn initialize(db_path: &str) -> Result<Connection> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory for database: {}", db_path))?;
        }
    }
    connect(db_path)
}

/// Open a store that `sieve init` already created.
pub fn open(db_path: &str) -> Result<Connection> {
    if !Path::new(db_path).exists() {
        anyhow::bail!("Database not found at {}. Run `sieve init` first.", db_path);
    }
    connect(db_path)
}
