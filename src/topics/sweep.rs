// Coherence sweep — evaluate a CoherenceSource over a range of K.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::coherence::CoherenceRecord;
use super::traits::CoherenceSource;

/// Inclusive range of candidate topic counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KRange {
    pub start: u32,
    pub end: u32,
    pub step: u32,
}

impl Default for KRange {
    /// 4, 6, …, 30: the sweep the dashboard charts.
    fn default() -> Self {
        Self {
            start: 4,
            end: 30,
            step: 2,
        }
    }
}

impl KRange {
    pub fn new(start: u32, end: u32, step: u32) -> Result<Self> {
        if start == 0 || step == 0 {
            anyhow::bail!("K range needs a positive start and step (got start={start}, step={step})");
        }
        if end < start {
            anyhow::bail!("K range end {end} is below start {start}");
        }
        Ok(Self { start, end, step })
    }

    pub fn values(&self) -> Vec<u32> {
        (self.start..=self.end).step_by(self.step.max(1) as usize).collect()
    }
}

/// Evaluate every candidate K. A K the source cannot score fails the whole
/// sweep: a partial sweep could move the optimum.
pub fn run_sweep<S: CoherenceSource + ?Sized>(source: &S, range: &KRange) -> Result<Vec<CoherenceRecord>> {
    let ks = range.values();
    info!(source = source.name(), candidates = ks.len(), "Running coherence sweep");

    let mut records = Vec::with_capacity(ks.len());
    for k in ks {
        let score = source
            .coherence(k)
            .with_context(|| format!("{} could not score k={k}", source.name()))?;
        let record = CoherenceRecord::new(k, score).map_err(|e| {
            warn!(k, error = %e, "Rejected coherence score");
            anyhow::Error::new(e)
        })?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Parabola;

    impl CoherenceSource for Parabola {
        fn coherence(&self, k: u32) -> Result<f64> {
            let x = k as f64 - 14.0;
            Ok(0.6 - x * x / 1000.0)
        }
    }

    #[test]
    fn test_default_range() {
        let ks = KRange::default().values();
        assert_eq!(ks.first(), Some(&4));
        assert_eq!(ks.last(), Some(&30));
        assert_eq!(ks.len(), 14);
    }

    #[test]
    fn test_range_rejects_bad_bounds() {
        assert!(KRange::new(0, 10, 2).is_err());
        assert!(KRange::new(4, 10, 0).is_err());
        assert!(KRange::new(10, 4, 2).is_err());
    }

    #[test]
    fn test_sweep_scores_every_k() {
        let records = run_sweep(&Parabola, &KRange::new(10, 18, 4).unwrap()).unwrap();
        let ks: Vec<u32> = records.iter().map(|r| r.k).collect();
        assert_eq!(ks, vec![10, 14, 18]);
        assert!((records[1].coherence_score - 0.6).abs() < 1e-12);
    }
}
