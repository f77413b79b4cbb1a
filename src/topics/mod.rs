// Topic-count selection — coherence sweeps from an external topic model and
// the choice of the optimal K.

pub mod coherence;
pub mod selector;
pub mod source;
pub mod sweep;
pub mod traits;

pub use coherence::CoherenceRecord;
pub use selector::{select_optimal_k, SelectorConfig, TopicSelection};
pub use source::FileCoherenceSource;
pub use sweep::{run_sweep, KRange};
pub use traits::CoherenceSource;
