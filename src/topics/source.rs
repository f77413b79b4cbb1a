// File-backed coherence source — precomputed sweep results.
//
// Accepts the two shapes the topic-model side produces: a CSV with
// `num_topics,coherence_score` columns, or a JSON array of
// `{k, coherence_score}` objects.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use super::coherence::{sorted_sweep, CoherenceRecord};
use super::traits::CoherenceSource;

#[derive(Debug, Deserialize)]
struct CsvCoherenceRow {
    #[serde(alias = "k")]
    num_topics: u32,
    coherence_score: f64,
}

#[derive(Debug, Clone)]
pub struct FileCoherenceSource {
    path: PathBuf,
    name: String,
    scores: BTreeMap<u32, f64>,
}

impl FileCoherenceSource {
    pub fn load(path: &Path) -> Result<Self> {
        let records = load_coherence_records(path)?;
        let scores = records.iter().map(|r| (r.k, r.coherence_score)).collect();
        Ok(Self {
            path: path.to_path_buf(),
            name: format!("file {}", path.display()),
            scores,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every loaded record, sorted by k.
    pub fn records(&self) -> Vec<CoherenceRecord> {
        self.scores
            .iter()
            .map(|(&k, &coherence_score)| CoherenceRecord { k, coherence_score })
            .collect()
    }
}

impl CoherenceSource for FileCoherenceSource {
    fn coherence(&self, k: u32) -> Result<f64> {
        self.scores
            .get(&k)
            .copied()
            .with_context(|| format!("no coherence score for k={k} in {}", self.path.display()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Read and validate a coherence file, picking the format from the extension.
pub fn load_coherence_records(path: &Path) -> Result<Vec<CoherenceRecord>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let raw: Vec<CoherenceRecord> = match ext.as_str() {
        "csv" => {
            let mut reader = csv::Reader::from_path(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            let mut out = Vec::new();
            for row in reader.deserialize::<CsvCoherenceRow>() {
                let row = row.with_context(|| format!("Malformed row in {}", path.display()))?;
                out.push(CoherenceRecord {
                    k: row.num_topics,
                    coherence_score: row.coherence_score,
                });
            }
            out
        }
        "json" => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Expected a JSON array of {{k, coherence_score}} in {}", path.display()))?
        }
        other => anyhow::bail!(
            "Unsupported coherence file extension '{}' for {} (expected .csv or .json)",
            other,
            path.display()
        ),
    };

    let records = sorted_sweep(&raw)?;
    info!(path = %path.display(), records = records.len(), "Loaded coherence sweep");
    Ok(records)
}
