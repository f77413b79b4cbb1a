// CommentClassifier — the fit/classify lifecycle around ClusterModel.
//
// The classifier is either unfit or holds one immutable, shared model. A fit
// builds a complete new model before swapping it in, so a failed fit leaves
// the previous model (or the unfit state) untouched.

use std::sync::Arc;

use tracing::warn;

use super::model::{ClassificationResult, ClassifierConfig, ClusterModel};
use crate::error::{FitFailure, Result, SieveError};
use crate::features::FeatureVector;

/// Lifecycle state as seen from outside a fit call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierState {
    Unfit,
    Fit,
}

#[derive(Debug, Clone, Default)]
pub struct CommentClassifier {
    config: ClassifierConfig,
    model: Option<Arc<ClusterModel>>,
}

impl CommentClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            model: None,
        }
    }

    /// Wrap an already fitted model, e.g. one loaded from the store.
    pub fn from_model(config: ClassifierConfig, model: ClusterModel) -> Self {
        Self {
            config,
            model: Some(Arc::new(model)),
        }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn state(&self) -> ClassifierState {
        if self.model.is_some() {
            ClassifierState::Fit
        } else {
            ClassifierState::Unfit
        }
    }

    /// The current model, shareable across threads.
    pub fn model(&self) -> Option<Arc<ClusterModel>> {
        self.model.clone()
    }

    /// Fit a new model and replace the current one on success.
    pub fn fit(&mut self, features: &[FeatureVector]) -> Result<Arc<ClusterModel>> {
        let model = Arc::new(ClusterModel::fit(features, &self.config)?);
        self.model = Some(Arc::clone(&model));
        Ok(model)
    }

    /// Like `fit`, but retries once with adjusted parameters when the first
    /// attempt fails for a numerical reason.
    pub fn fit_with_retry(&mut self, features: &[FeatureVector]) -> Result<Arc<ClusterModel>> {
        let model = Arc::new(fit_with_retry(features, &self.config)?);
        self.model = Some(Arc::clone(&model));
        Ok(model)
    }

    pub fn classify(&self, comment_id: &str, features: &FeatureVector) -> Result<ClassificationResult> {
        let model = self.model.as_ref().ok_or(SieveError::ModelNotFit)?;
        model.classify(comment_id, features)
    }
}

/// The adjusted config for a second attempt after `err`, or None when the
/// failure is permanent.
pub fn retry_config(config: &ClassifierConfig, err: &SieveError) -> Option<ClassifierConfig> {
    match err {
        SieveError::Fit(FitFailure::SingularCovariance { .. }) => Some(ClassifierConfig {
            reg_covar: if config.reg_covar > 0.0 {
                config.reg_covar * 100.0
            } else {
                1e-6
            },
            ..*config
        }),
        SieveError::Fit(FitFailure::NotConverged { .. }) => Some(ClassifierConfig {
            max_iter: config.max_iter.saturating_mul(2),
            ..*config
        }),
        _ => None,
    }
}

/// Run `attempt` with `config`, then once more with the adjusted config if
/// the first failure is retryable. The second error, if any, is final.
pub fn retry_once<T, F>(config: &ClassifierConfig, mut attempt: F) -> Result<T>
where
    F: FnMut(&ClassifierConfig) -> Result<T>,
{
    match attempt(config) {
        Ok(value) => Ok(value),
        Err(e) => {
            let Some(adjusted) = retry_config(config, &e) else {
                return Err(e);
            };
            warn!(
                error = %e,
                reg_covar = adjusted.reg_covar,
                max_iter = adjusted.max_iter,
                "Cluster fit failed, retrying once with adjusted parameters"
            );
            attempt(&adjusted)
        }
    }
}

/// Fit a ClusterModel, retrying exactly once on a retryable failure.
pub fn fit_with_retry(features: &[FeatureVector], config: &ClassifierConfig) -> Result<ClusterModel> {
    retry_once(config, |c| ClusterModel::fit(features, c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_config_adjusts_the_failing_parameter() {
        let config = ClassifierConfig::default();
        let singular = SieveError::Fit(FitFailure::SingularCovariance {
            reg_covar: config.reg_covar,
        });
        let adjusted = retry_config(&config, &singular).unwrap();
        assert!((adjusted.reg_covar - config.reg_covar * 100.0).abs() < 1e-18);
        assert_eq!(adjusted.max_iter, config.max_iter);

        let slow = SieveError::Fit(FitFailure::NotConverged {
            iterations: 100,
            runs: 1,
        });
        assert_eq!(retry_config(&config, &slow).unwrap().max_iter, 200);

        assert!(retry_config(&config, &SieveError::NoData("x")).is_none());
    }

    #[test]
    fn test_unfit_classifier_rejects_classify() {
        let classifier = CommentClassifier::new(ClassifierConfig::default());
        assert_eq!(classifier.state(), ClassifierState::Unfit);
        let fv = FeatureVector::from_array([0.0; crate::features::FEATURE_DIM]).unwrap();
        assert!(matches!(
            classifier.classify("c1", &fv),
            Err(SieveError::ModelNotFit)
        ));
    }

    #[test]
    fn test_failed_fit_keeps_unfit_state() {
        let mut classifier = CommentClassifier::new(ClassifierConfig::default());
        assert!(matches!(classifier.fit(&[]), Err(SieveError::NoData(_))));
        assert_eq!(classifier.state(), ClassifierState::Unfit);
    }
}
