// Feature extraction — converts raw comments into fixed-size numeric vectors
// capturing spam-like surface patterns (shouting, repetition, emoji floods,
// template phrases, links) plus engagement.

pub mod emoji;
pub mod extract;
pub mod text;
pub mod vector;

pub use extract::{extract_features, FeatureExtractor};
pub use vector::{FeatureVector, FEATURE_DIM};
