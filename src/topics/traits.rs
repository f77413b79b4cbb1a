// Coherence source trait — the seam to an external topic model.
//
// Fitting a topic model at a given K and scoring its coherence happens
// outside this crate. Anything that can answer "what is the coherence at K"
// plugs in here: precomputed sweep files today, a live model fit later.

use anyhow::Result;

pub trait CoherenceSource {
    /// Coherence score of a topic model fitted with `k` topics.
    fn coherence(&self, k: u32) -> Result<f64>;

    /// Human-readable name for logs.
    fn name(&self) -> &str {
        "coherence source"
    }
}
