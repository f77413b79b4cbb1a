// Error taxonomy for the classification and topic-selection core.
//
// The library surfaces typed errors so callers can tell a caller bug
// (InvalidFeature, ModelNotFit) from a data problem (NoData) and from the
// one naturally retryable condition, a failed EM fit. The binary wraps
// these in anyhow with context.

use thiserror::Error;

/// Why a mixture-model fit was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitFailure {
    /// Fewer feature rows than mixture components.
    #[error("{rows} rows is fewer than {components} components")]
    TooFewRows { rows: usize, components: usize },

    /// Fewer distinct rows than components (e.g. every row identical).
    #[error("only {distinct_rows} distinct feature rows for {components} components")]
    Degenerate { distinct_rows: usize, components: usize },

    /// A component covariance stayed non-positive-definite after regularization.
    #[error("a component covariance is not positive definite (reg_covar={reg_covar:e})")]
    SingularCovariance { reg_covar: f64 },

    /// EM hit the iteration cap in every run before the lower bound settled.
    #[error("EM did not converge within {iterations} iterations ({runs} runs)")]
    NotConverged { iterations: usize, runs: usize },

    /// Any other rejection from the clustering backend.
    #[error("clustering backend: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum SieveError {
    /// Malformed or out-of-range feature input to classification.
    #[error("invalid feature {feature}: {message}")]
    InvalidFeature {
        feature: &'static str,
        message: String,
    },

    /// `classify` called before a successful fit.
    #[error("classifier has not been fit yet")]
    ModelNotFit,

    #[error("mixture model fit failed: {0}")]
    Fit(FitFailure),

    /// Empty input to a batch operation.
    #[error("no data: {0}")]
    NoData(&'static str),

    /// A malformed coherence record.
    #[error("invalid coherence record: {0}")]
    InvalidRecord(String),

    /// Classifier or selector settings outside their supported range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SieveError {
    /// Only a singular covariance or a non-converged EM run can succeed on a
    /// second attempt, and only with adjusted parameters.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SieveError::Fit(FitFailure::SingularCovariance { .. })
                | SieveError::Fit(FitFailure::NotConverged { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, SieveError>;
