// Comment loaders — CSV exports and JSON Lines files.
//
// The CSV shape matches the comment dataset exports the dashboard was built
// on (`commentId`, `textOriginal`, `likeCount`, optional `parentCommentId`).
// Like counts that don't parse as a non-negative number are treated as 0,
// the same coercion the upstream analysis applied.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use super::Comment;

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "commentId")]
    comment_id: String,
    #[serde(rename = "textOriginal", default)]
    text_original: Option<String>,
    #[serde(rename = "likeCount", default)]
    like_count: Option<String>,
    #[serde(rename = "parentCommentId", default)]
    parent_comment_id: Option<String>,
}

/// Load comments from a file, picking the format from the extension.
///
/// `.csv` is read as a headered CSV export; `.jsonl`, `.ndjson` and `.json`
/// are read as one JSON object per line.
pub fn load_comments(path: &Path) -> Result<Vec<Comment>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let comments = match ext.as_str() {
        "csv" => load_csv(path)?,
        "jsonl" | "ndjson" | "json" => load_json_lines(path)?,
        other => anyhow::bail!(
            "Unsupported comment file extension '{}' for {} (expected .csv or .jsonl)",
            other,
            path.display()
        ),
    };

    info!(
        path = %path.display(),
        comments = comments.len(),
        "Loaded comments"
    );
    Ok(comments)
}

/// Read a headered CSV export.
pub fn load_csv(path: &Path) -> Result<Vec<Comment>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open comment file {}", path.display()))?;
    read_csv(file)
}

/// Parse CSV comment rows from any reader.
pub fn read_csv<R: std::io::Read>(reader: R) -> Result<Vec<Comment>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut comments = Vec::new();
    let mut coerced = 0usize;

    for (i, row) in reader.deserialize::<CsvRow>().enumerate() {
        let row = row.with_context(|| format!("Malformed CSV row {}", i + 1))?;
        let like_count = match parse_like_count(row.like_count.as_deref()) {
            Some(n) => n,
            None => {
                coerced += 1;
                0
            }
        };
        comments.push(Comment {
            id: row.comment_id,
            text: row.text_original.unwrap_or_default(),
            like_count,
            parent_id: row.parent_comment_id.filter(|p| !p.trim().is_empty()),
        });
    }

    if coerced > 0 {
        warn!(rows = coerced, "Unparseable like counts treated as 0");
    }
    Ok(comments)
}

/// Read one JSON comment object per non-blank line.
pub fn load_json_lines(path: &Path) -> Result<Vec<Comment>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open comment file {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut comments = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let comment: Comment = serde_json::from_str(&line)
            .with_context(|| format!("Malformed comment on line {}", i + 1))?;
        comments.push(comment);
    }
    Ok(comments)
}

/// Empty or missing counts are 0; negative, fractional-garbage or
/// non-numeric values return None so the caller can count them.
fn parse_like_count(raw: Option<&str>) -> Option<u64> {
    let raw = raw.map(str::trim).unwrap_or("");
    if raw.is_empty() {
        return Some(0);
    }
    if let Ok(n) = raw.parse::<u64>() {
        return Some(n);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Some(v.round() as u64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_csv_export_shape() {
        let data = "commentId,textOriginal,likeCount,parentCommentId\n\
                    c1,Great tutorial thanks,12,\n\
                    c2,OMG,0,c1\n\
                    c3,,3.0,\n";
        let comments = read_csv(data.as_bytes()).unwrap();
        assert_eq!(comments.len(), 3);
        assert_eq!(comments[0].id, "c1");
        assert_eq!(comments[0].like_count, 12);
        assert!(!comments[0].is_reply());
        assert_eq!(comments[1].parent_id.as_deref(), Some("c1"));
        assert!(comments[1].is_reply());
        assert_eq!(comments[2].text, "");
        assert_eq!(comments[2].like_count, 3);
    }

    #[test]
    fn test_bad_like_count_coerces_to_zero() {
        let data = "commentId,textOriginal,likeCount\nc1,hello,lots\nc2,hi,-4\n";
        let comments = read_csv(data.as_bytes()).unwrap();
        assert_eq!(comments[0].like_count, 0);
        assert_eq!(comments[1].like_count, 0);
    }

    #[test]
    fn test_parse_like_count() {
        assert_eq!(parse_like_count(None), Some(0));
        assert_eq!(parse_like_count(Some(" 7 ")), Some(7));
        assert_eq!(parse_like_count(Some("2.0")), Some(2));
        assert_eq!(parse_like_count(Some("NaN")), None);
    }

    #[test]
    fn test_load_json_lines() {
        let path = std::env::temp_dir().join("sieve-loader-test.jsonl");
        std::fs::write(
            &path,
            "{\"id\":\"a\",\"text\":\"first!\",\"like_count\":0}\n\n\
             {\"id\":\"b\",\"text\":\"reply\",\"like_count\":2,\"parent_id\":\"a\"}\n",
        )
        .unwrap();
        let comments = load_comments(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(comments.len(), 2);
        assert!(comments[1].is_reply());
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let result = load_comments(Path::new("comments.xlsx"));
        assert!(result.is_err());
    }
}
