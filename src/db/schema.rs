// Database schema — table creation and migrations.
//
// Version-based migrations: `schema_version` records which migrations have
// run, and each migration is a function that executes SQL statements.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Create all tables if they don't exist yet. Idempotent.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Fitted cluster models, newest last. The JSON carries the scaler,
        -- mixture parameters, label assignment and extractor settings.
        CREATE TABLE IF NOT EXISTS cluster_models (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            components INTEGER NOT NULL,
            model_json TEXT NOT NULL,
            log_likelihood REAL NOT NULL,
            fitted_at TEXT NOT NULL
        );

        -- Latest classification per comment
        CREATE TABLE IF NOT EXISTS classifications (
            comment_id TEXT PRIMARY KEY,
            text TEXT NOT NULL,
            label TEXT NOT NULL,               -- quality / uncertain / spam
            confidence REAL NOT NULL,          -- 0.0 to 1.0
            margin REAL NOT NULL,
            posteriors_json TEXT NOT NULL,
            features_json TEXT NOT NULL,
            model_id INTEGER REFERENCES cluster_models(id),
            classified_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Most recent coherence sweep, one row per K
        CREATE TABLE IF NOT EXISTS coherence_sweeps (
            k INTEGER PRIMARY KEY,
            coherence_score REAL NOT NULL,
            recorded_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Run state: last run timestamps, selected K and input paths
        CREATE TABLE IF NOT EXISTS run_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_classifications_label
            ON classifications(label, confidence);
        ",
    )
    .context("Failed to create database tables")?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [1],
    )?;

    // Migration v2: remember the leaning label so thresholded results can be
    // told apart from three-way uncertain components.
    run_migration(conn, 2, |c| {
        c.execute_batch("ALTER TABLE classifications ADD COLUMN leaning TEXT;")
    })?;

    Ok(())
}

/// Run a migration if it hasn't been applied yet.
fn run_migration<F>(conn: &Connection, version: i64, migrate: F) -> Result<()>
where
    F: FnOnce(&Connection) -> rusqlite::Result<()>,
{
    let already_applied: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM schema_version WHERE version = ?1",
        [version],
        |row| row.get(0),
    )?;

    if !already_applied {
        migrate(conn).with_context(|| format!("Migration v{version} failed"))?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [version],
        )?;
    }

    Ok(())
}

/// Number of user tables (shown after `init`).
pub fn table_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tables_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();
    }

    #[test]
    fn test_table_count() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        // schema_version, cluster_models, classifications,
        // coherence_sweeps, run_state
        assert_eq!(table_count(&conn).unwrap(), 5i64);
    }

    #[test]
    fn test_migrations_run_once() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();

        let versions: Vec<i64> = conn
            .prepare("SELECT version FROM schema_version ORDER BY version")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(versions, vec![1, 2]);
    }
}
