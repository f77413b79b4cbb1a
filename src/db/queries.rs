// Database queries — CRUD operations for all tables.
//
// Every database interaction goes through this module. This keeps SQL
// contained in one place and gives the rest of the app clean Rust interfaces.

use anyhow::{Context, Result};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::models::{StoredClassification, StoredModel};
use crate::classifier::{Label, SavedModel};
use crate::pipeline::classify::ClassifiedComment;
use crate::topics::{CoherenceRecord, TopicSelection};

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, e.to_string()))
}

fn label_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Label> {
    let raw: String = row.get(idx)?;
    Label::parse(&raw).ok_or_else(|| conversion_error(idx, format!("unknown label '{raw}'")))
}

// --- Run state ---

/// Get a run state value by key (e.g., "last_classify_at").
pub fn get_run_state(conn: &Connection, key: &str) -> Result<Option<String>> {
    let mut stmt = conn.prepare("SELECT value FROM run_state WHERE key = ?1")?;
    let result = stmt.query_row(params![key], |row| row.get(0)).optional()?;
    Ok(result)
}

/// Set a run state value (upsert).
pub fn set_run_state(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO run_state (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
        params![key, value],
    )?;
    Ok(())
}

// --- Cluster models ---

/// Store a fitted model and return its row id. Classifications from earlier
/// models are left alone; see `replace_fitted_run`.
pub fn save_model(conn: &Connection, saved: &SavedModel) -> Result<i64> {
    let json = serde_json::to_string(saved).context("Failed to serialize cluster model")?;
    conn.execute(
        "INSERT INTO cluster_models (components, model_json, log_likelihood, fitted_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            saved.model.component_count() as i64,
            json,
            saved.model.mixture.log_likelihood,
            saved.model.fitted_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// The most recently stored model, if any.
pub fn latest_model(conn: &Connection) -> Result<Option<StoredModel>> {
    let mut stmt = conn.prepare(
        "SELECT id, components, log_likelihood, fitted_at, model_json
         FROM cluster_models
         ORDER BY id DESC
         LIMIT 1",
    )?;
    let result = stmt
        .query_row([], |row| {
            let components: i64 = row.get(1)?;
            Ok(StoredModel {
                id: row.get(0)?,
                components: components as usize,
                log_likelihood: row.get(2)?,
                fitted_at: row.get(3)?,
                saved: json_column(row, 4)?,
            })
        })
        .optional()?;
    Ok(result)
}

pub fn model_count(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM cluster_models", [], |row| row.get(0))?;
    Ok(count)
}

// --- Classifications ---

/// Save or update one comment's classification.
pub fn upsert_classification(
    conn: &Connection,
    item: &ClassifiedComment,
    model_id: Option<i64>,
) -> Result<()> {
    let posteriors_json = serde_json::to_string(&item.result.posteriors)?;
    let features_json = serde_json::to_string(&item.features)?;
    conn.execute(
        "INSERT INTO classifications (comment_id, text, label, confidence, margin, posteriors_json, features_json, model_id, classified_at, leaning)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, datetime('now'), ?9)
         ON CONFLICT(comment_id) DO UPDATE SET
            text = ?2,
            label = ?3,
            confidence = ?4,
            margin = ?5,
            posteriors_json = ?6,
            features_json = ?7,
            model_id = ?8,
            classified_at = datetime('now'),
            leaning = ?9",
        params![
            item.comment.id,
            item.comment.text,
            item.result.label.as_str(),
            item.result.confidence,
            item.result.margin,
            posteriors_json,
            features_json,
            model_id,
            item.result.leaning.as_str(),
        ],
    )?;
    Ok(())
}

/// Save a batch of classifications in one transaction.
pub fn save_classifications(
    conn: &Connection,
    items: &[ClassifiedComment],
    model_id: Option<i64>,
) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    for item in items {
        upsert_classification(&tx, item, model_id)?;
    }
    tx.commit()?;
    Ok(items.len())
}

/// Store a new model with its classifications, dropping every stored
/// classification that came from another model. A refit replaces the whole
/// result set, so labels from superseded models never mix with the new
/// cluster table. One transaction.
pub fn replace_fitted_run(
    conn: &Connection,
    saved: &SavedModel,
    items: &[ClassifiedComment],
) -> Result<i64> {
    let tx = conn.unchecked_transaction()?;
    let model_id = save_model(&tx, saved)?;
    let dropped = tx.execute(
        "DELETE FROM classifications WHERE model_id IS NULL OR model_id <> ?1",
        params![model_id],
    )?;
    for item in items {
        upsert_classification(&tx, item, Some(model_id))?;
    }
    tx.commit()?;
    if dropped > 0 {
        debug!(model_id, dropped, "Dropped classifications from superseded models");
    }
    Ok(model_id)
}

const CLASSIFICATION_COLUMNS: &str = "comment_id, text, label, confidence, margin, leaning,
    posteriors_json, features_json, model_id, classified_at";

fn classification_from_row(row: &Row<'_>) -> rusqlite::Result<StoredClassification> {
    let leaning: Option<String> = row.get(5)?;
    Ok(StoredClassification {
        comment_id: row.get(0)?,
        text: row.get(1)?,
        label: label_column(row, 2)?,
        confidence: row.get(3)?,
        margin: row.get(4)?,
        leaning: leaning.as_deref().and_then(Label::parse),
        posteriors: json_column(row, 6)?,
        features: json_column(row, 7)?,
        model_id: row.get(8)?,
        classified_at: row.get(9)?,
    })
}

/// Classifications carrying `label`, most confident first.
pub fn classifications_by_label(
    conn: &Connection,
    label: Label,
    limit: u32,
) -> Result<Vec<StoredClassification>> {
    let sql = format!(
        "SELECT {CLASSIFICATION_COLUMNS}
         FROM classifications
         WHERE label = ?1
         ORDER BY confidence DESC, comment_id ASC
         LIMIT ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![label.as_str(), limit], classification_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Least confident classifications of any label.
pub fn lowest_confidence(conn: &Connection, limit: u32) -> Result<Vec<StoredClassification>> {
    let sql = format!(
        "SELECT {CLASSIFICATION_COLUMNS}
         FROM classifications
         ORDER BY confidence ASC, comment_id ASC
         LIMIT ?1"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![limit], classification_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Count of stored classifications per label. Labels with no rows are
/// omitted.
pub fn label_counts(conn: &Connection) -> Result<Vec<(Label, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT label, COUNT(*) FROM classifications GROUP BY label ORDER BY label",
    )?;
    let rows = stmt.query_map([], |row| Ok((label_column(row, 0)?, row.get(1)?)))?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Mean confidence over all stored classifications (None when empty).
pub fn mean_confidence(conn: &Connection) -> Result<Option<f64>> {
    let mean = conn.query_row("SELECT AVG(confidence) FROM classifications", [], |row| {
        row.get(0)
    })?;
    Ok(mean)
}

pub fn classification_count(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM classifications", [], |row| row.get(0))?;
    Ok(count)
}

// --- Coherence sweep ---

const SELECTED_K: &str = "selected_k";
const TOPIC_SELECTION: &str = "topic_selection";

fn write_sweep(conn: &Connection, records: &[CoherenceRecord]) -> Result<()> {
    conn.execute("DELETE FROM coherence_sweeps", [])?;
    conn.execute(
        "DELETE FROM run_state WHERE key IN (?1, ?2)",
        params![SELECTED_K, TOPIC_SELECTION],
    )?;
    for r in records {
        conn.execute(
            "INSERT INTO coherence_sweeps (k, coherence_score) VALUES (?1, ?2)",
            params![r.k, r.coherence_score],
        )?;
    }
    Ok(())
}

/// Replace the stored sweep with `records`. Any stored selection belonged to
/// the old sweep and is cleared.
pub fn replace_coherence_sweep(conn: &Connection, records: &[CoherenceRecord]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    write_sweep(&tx, records)?;
    tx.commit()?;
    Ok(())
}

/// Replace the stored sweep and record the selection made over it, with the
/// selector settings that produced it baked into the result.
pub fn save_topic_selection(
    conn: &Connection,
    records: &[CoherenceRecord],
    selection: &TopicSelection,
) -> Result<()> {
    let json = serde_json::to_string(selection).context("Failed to serialize topic selection")?;
    let tx = conn.unchecked_transaction()?;
    write_sweep(&tx, records)?;
    set_run_state(&tx, SELECTED_K, &selection.k.to_string())?;
    set_run_state(&tx, TOPIC_SELECTION, &json)?;
    tx.commit()?;
    Ok(())
}

/// The selection stored by `save_topic_selection`, if any.
pub fn stored_topic_selection(conn: &Connection) -> Result<Option<TopicSelection>> {
    match get_run_state(conn, TOPIC_SELECTION)? {
        Some(json) => {
            let selection =
                serde_json::from_str(&json).context("Stored topic selection is malformed")?;
            Ok(Some(selection))
        }
        None => Ok(None),
    }
}

/// The stored sweep, ordered by K.
pub fn get_coherence_sweep(conn: &Connection) -> Result<Vec<CoherenceRecord>> {
    let mut stmt = conn.prepare("SELECT k, coherence_score FROM coherence_sweeps ORDER BY k")?;
    let rows = stmt.query_map([], |row| {
        Ok(CoherenceRecord {
            k: row.get(0)?,
            coherence_score: row.get(1)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::create_tables;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        conn
    }

    #[test]
    fn test_run_state_roundtrip() {
        let conn = test_db();
        assert_eq!(get_run_state(&conn, "selected_k").unwrap(), None);
        set_run_state(&conn, "selected_k", "26").unwrap();
        set_run_state(&conn, "selected_k", "24").unwrap();
        assert_eq!(
            get_run_state(&conn, "selected_k").unwrap().as_deref(),
            Some("24")
        );
    }

    #[test]
    fn test_coherence_sweep_is_replaced() {
        let conn = test_db();
        let first = [
            CoherenceRecord { k: 4, coherence_score: 0.415 },
            CoherenceRecord { k: 6, coherence_score: 0.471 },
        ];
        replace_coherence_sweep(&conn, &first).unwrap();
        let second = [CoherenceRecord { k: 26, coherence_score: 0.531 }];
        replace_coherence_sweep(&conn, &second).unwrap();

        let stored = get_coherence_sweep(&conn).unwrap();
        assert_eq!(stored, second.to_vec());
    }

    #[test]
    fn test_new_sweep_clears_stored_selection() {
        let conn = test_db();
        let records = [
            CoherenceRecord { k: 4, coherence_score: 0.415 },
            CoherenceRecord { k: 6, coherence_score: 0.471 },
        ];
        let selection = TopicSelection {
            k: 6,
            coherence_score: 0.471,
            improvement: Some(0.056),
            marginal: false,
        };
        save_topic_selection(&conn, &records, &selection).unwrap();
        assert_eq!(stored_topic_selection(&conn).unwrap(), Some(selection));
        assert_eq!(get_run_state(&conn, "selected_k").unwrap().as_deref(), Some("6"));

        replace_coherence_sweep(&conn, &records[..1]).unwrap();
        assert_eq!(stored_topic_selection(&conn).unwrap(), None);
        assert_eq!(get_run_state(&conn, "selected_k").unwrap(), None);
    }

    #[test]
    fn test_unknown_label_is_a_conversion_error() {
        let conn = test_db();
        conn.execute(
            "INSERT INTO classifications (comment_id, text, label, confidence, margin, posteriors_json, features_json)
             VALUES ('x', 'hi', 'bogus', 0.5, 0.0, '[]', '{}')",
            [],
        )
        .unwrap();
        assert!(label_counts(&conn).is_err());
    }
}
