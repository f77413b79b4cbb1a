// Optimal topic-count selection over a coherence sweep.
//
// k* is the K with the highest coherence. Scores within `tie_tolerance` of
// the maximum count as tied, and ties go to the smallest K. When a minimum
// improvement is configured, an optimum that barely beats every smaller K is
// flagged as marginal instead of being accepted silently.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::coherence::{sorted_sweep, CoherenceRecord};
use crate::error::{Result, SieveError};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectorConfig {
    pub tie_tolerance: f64,
    /// No universal default: None disables the marginal check.
    pub min_improvement: Option<f64>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            tie_tolerance: 1e-6,
            min_improvement: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopicSelection {
    pub k: u32,
    pub coherence_score: f64,
    /// Best score minus the best score among smaller K. None when k* is the
    /// smallest K in the sweep.
    pub improvement: Option<f64>,
    pub marginal: bool,
}

pub fn select_optimal_k(records: &[CoherenceRecord], config: &SelectorConfig) -> Result<TopicSelection> {
    if records.is_empty() {
        return Err(SieveError::NoData("coherence sweep is empty"));
    }
    if !(config.tie_tolerance.is_finite() && config.tie_tolerance >= 0.0) {
        return Err(SieveError::InvalidConfig(format!(
            "tie_tolerance must be non-negative, got {}",
            config.tie_tolerance
        )));
    }
    let sweep = sorted_sweep(records)?;

    let max = sweep
        .iter()
        .map(|r| r.coherence_score)
        .fold(f64::NEG_INFINITY, f64::max);

    // Sorted ascending by k, so the first score within tolerance is the
    // smallest tied K.
    let (idx, best) = sweep
        .iter()
        .enumerate()
        .find(|(_, r)| r.coherence_score >= max - config.tie_tolerance)
        .ok_or(SieveError::NoData("coherence sweep is empty"))?;

    let improvement = sweep[..idx]
        .iter()
        .map(|r| r.coherence_score)
        .reduce(f64::max)
        .map(|prior| best.coherence_score - prior);

    let marginal = match (config.min_improvement, improvement) {
        (Some(min), Some(gain)) => gain < min,
        _ => false,
    };

    debug!(
        k = best.k,
        coherence = best.coherence_score,
        ?improvement,
        marginal,
        "Selected topic count"
    );

    Ok(TopicSelection {
        k: best.k,
        coherence_score: best.coherence_score,
        improvement,
        marginal,
    })
}
