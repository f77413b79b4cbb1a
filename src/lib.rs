// Sieve: unsupervised comment quality/spam classification and topic-count
// selection.
//
// This is the library root. Each module corresponds to a stage of the
// analysis: comments are loaded, turned into feature vectors, clustered and
// labeled; coherence sweeps from an external topic model pick K.

pub mod classifier;
pub mod comments;
pub mod config;
pub mod db;
pub mod error;
pub mod features;
pub mod output;
pub mod pipeline;
pub mod status;
pub mod topics;

pub use error::{FitFailure, SieveError};
