// Dashboard export — one JSON document with everything the charts read.
//
// The presentation layer never talks to the database; it loads this file.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::classifier::summary::LabelDistribution;
use crate::classifier::{ComponentSummary, Label};
use crate::db::models::StoredClassification;
use crate::db::queries;
use crate::features::FeatureVector;
use crate::topics::{select_optimal_k, SelectorConfig, TopicSelection};
use rusqlite::Connection;

#[derive(Debug, Clone, Serialize)]
pub struct ExportSample {
    pub comment_id: String,
    pub text: String,
    pub label: Label,
    pub confidence: f64,
    pub features: FeatureVector,
}

impl From<StoredClassification> for ExportSample {
    fn from(s: StoredClassification) -> Self {
        Self {
            comment_id: s.comment_id,
            text: s.text,
            label: s.label,
            confidence: s.confidence,
            features: s.features,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoherencePoint {
    pub k: u32,
    pub coherence_score: f64,
    pub is_optimal: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardExport {
    pub generated_at: String,
    pub distribution: LabelDistribution,
    /// Most confident samples, keyed by label name.
    pub samples: BTreeMap<String, Vec<ExportSample>>,
    pub review_candidates: Vec<ExportSample>,
    pub clusters: Vec<ComponentSummary>,
    pub coherence: Vec<CoherencePoint>,
    pub selected_k: Option<TopicSelection>,
}

/// Assemble the export from the store.
pub fn build(conn: &Connection, samples_per_label: u32, selector: &SelectorConfig) -> Result<DashboardExport> {
    let counts: Vec<(Label, usize)> = queries::label_counts(conn)?
        .into_iter()
        .map(|(label, n)| (label, n.max(0) as usize))
        .collect();
    let mean = queries::mean_confidence(conn)?.unwrap_or(0.0);
    let distribution = LabelDistribution::from_counts(&counts, mean);

    let mut samples = BTreeMap::new();
    for label in Label::ALL {
        let rows = queries::classifications_by_label(conn, label, samples_per_label)?;
        samples.insert(
            label.as_str().to_string(),
            rows.into_iter().map(ExportSample::from).collect(),
        );
    }
    let review_candidates = queries::lowest_confidence(conn, samples_per_label)?
        .into_iter()
        .map(ExportSample::from)
        .collect();

    let clusters = queries::latest_model(conn)?
        .map(|m| m.saved.model.components)
        .unwrap_or_default();

    // Prefer the selection `select-k` stored with its own settings; a sweep
    // stored without one is selected here with `selector`.
    let sweep = queries::get_coherence_sweep(conn)?;
    let selected_k = match queries::stored_topic_selection(conn)? {
        Some(stored) if sweep.iter().any(|r| r.k == stored.k) => Some(stored),
        _ if sweep.is_empty() => None,
        _ => Some(select_optimal_k(&sweep, selector).context("Stored coherence sweep is invalid")?),
    };
    let coherence = sweep
        .iter()
        .map(|r| CoherencePoint {
            k: r.k,
            coherence_score: r.coherence_score,
            is_optimal: selected_k.is_some_and(|s| s.k == r.k),
        })
        .collect();

    Ok(DashboardExport {
        generated_at: chrono::Utc::now().to_rfc3339(),
        distribution,
        samples,
        review_candidates,
        clusters,
        coherence,
        selected_k,
    })
}

/// Write the export as pretty-printed JSON.
pub fn write(export: &DashboardExport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(export).context("Failed to serialize dashboard export")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(
        path = %path.display(),
        comments = export.distribution.total,
        sweep = export.coherence.len(),
        "Wrote dashboard export"
    );
    Ok(())
}
