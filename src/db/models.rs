// Data models — Rust structs that map to database rows.
//
// Kept apart from the queries so other modules can use them without
// depending on rusqlite directly.

use serde::{Deserialize, Serialize};

use crate::classifier::{Label, LabelProbability, SavedModel};
use crate::features::FeatureVector;

/// A persisted cluster model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredModel {
    pub id: i64,
    pub components: usize,
    pub log_likelihood: f64,
    pub fitted_at: String,
    pub saved: SavedModel,
}

/// A persisted per-comment classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredClassification {
    pub comment_id: String,
    pub text: String,
    pub label: Label,
    pub confidence: f64,
    pub margin: f64,
    pub leaning: Option<Label>,
    pub posteriors: Vec<LabelProbability>,
    pub features: FeatureVector,
    pub model_id: Option<i64>,
    pub classified_at: String,
}
