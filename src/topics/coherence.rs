// Coherence records — one (K, score) point of a topic-count sweep.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SieveError};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoherenceRecord {
    /// Candidate topic count.
    pub k: u32,
    pub coherence_score: f64,
}

impl CoherenceRecord {
    /// Validated constructor: `k` must be positive and the score finite.
    pub fn new(k: u32, coherence_score: f64) -> Result<Self> {
        let record = Self { k, coherence_score };
        record.validate()?;
        Ok(record)
    }

    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(SieveError::InvalidRecord("k must be positive".to_string()));
        }
        if !self.coherence_score.is_finite() {
            return Err(SieveError::InvalidRecord(format!(
                "coherence score for k={} is not finite",
                self.k
            )));
        }
        Ok(())
    }
}

/// Validate a sweep and return it sorted by k. Duplicate k values are
/// rejected rather than silently merged.
pub fn sorted_sweep(records: &[CoherenceRecord]) -> Result<Vec<CoherenceRecord>> {
    let mut seen = HashSet::new();
    for r in records {
        r.validate()?;
        if !seen.insert(r.k) {
            return Err(SieveError::InvalidRecord(format!("duplicate k={}", r.k)));
        }
    }
    let mut sorted = records.to_vec();
    sorted.sort_by_key(|r| r.k);
    Ok(sorted)
}
