// Fitted cluster model — scaler + mixture + label assignment.
//
// A ClusterModel is built once from a batch of feature vectors and never
// mutated afterwards. Scoring a comment standardizes its features with the
// training scaler, takes the component posteriors and reports the label of
// the argmax component together with the full posterior vector.

use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::gmm::{fit_em, EmParams, GaussianMixture};
use super::labeling::{assign_labels, spam_likelihood, Label, LabelWeights};
use super::scaler::StandardScaler;
use crate::error::{Result, SieveError};
use crate::features::{FeatureExtractor, FeatureVector, FEATURE_DIM};

/// Settings for one classifier fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Mixture components: 2 (quality/spam) or 3 (quality/uncertain/spam).
    pub components: usize,
    pub max_iter: usize,
    pub tol: f64,
    pub reg_covar: f64,
    /// EM restarts; the best lower bound wins.
    pub n_init: usize,
    pub seed: u64,
    /// Relabel argmax results at or below this confidence as uncertain.
    pub uncertain_below: Option<f64>,
    pub weights: LabelWeights,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        let em = EmParams::default();
        Self {
            components: em.components,
            max_iter: em.max_iter,
            tol: em.tol,
            reg_covar: em.reg_covar,
            n_init: 1,
            seed: em.seed,
            uncertain_below: None,
            weights: LabelWeights::default(),
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<()> {
        if !(2..=3).contains(&self.components) {
            return Err(SieveError::InvalidConfig(format!(
                "components must be 2 or 3, got {}",
                self.components
            )));
        }
        if self.max_iter == 0 || self.n_init == 0 {
            return Err(SieveError::InvalidConfig(
                "max_iter and n_init must be at least 1".to_string(),
            ));
        }
        if !(self.tol.is_finite() && self.tol > 0.0) {
            return Err(SieveError::InvalidConfig(format!(
                "tol must be positive, got {}",
                self.tol
            )));
        }
        if !(self.reg_covar.is_finite() && self.reg_covar >= 0.0) {
            return Err(SieveError::InvalidConfig(format!(
                "reg_covar must be non-negative, got {}",
                self.reg_covar
            )));
        }
        if let Some(t) = self.uncertain_below {
            if !(0.0..=1.0).contains(&t) {
                return Err(SieveError::InvalidConfig(format!(
                    "uncertain_below must lie in [0, 1], got {t}"
                )));
            }
        }
        Ok(())
    }

    fn em_params(&self) -> EmParams {
        EmParams {
            components: self.components,
            max_iter: self.max_iter,
            tol: self.tol,
            reg_covar: self.reg_covar,
            n_runs: self.n_init,
            seed: self.seed,
        }
    }
}

/// Per-component statistics kept with the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSummary {
    pub index: usize,
    pub label: Label,
    pub weight: f64,
    /// Training rows whose argmax component is this one.
    pub size: usize,
    pub spam_likelihood: f64,
    /// Component mean mapped back to raw feature space.
    pub mean: FeatureVector,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelProbability {
    pub label: Label,
    pub probability: f64,
}

/// Classification of one comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub comment_id: String,
    pub label: Label,
    /// Posterior of the argmax component.
    pub confidence: f64,
    /// Top-1 minus top-2 posterior.
    pub margin: f64,
    /// Label of the argmax component, before any uncertainty threshold.
    pub leaning: Label,
    /// One entry per component, in component order.
    pub posteriors: Vec<LabelProbability>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterModel {
    pub scaler: StandardScaler,
    pub mixture: GaussianMixture,
    /// Label of each component, by component index.
    pub labels: Vec<Label>,
    pub components: Vec<ComponentSummary>,
    pub uncertain_below: Option<f64>,
    pub seed: u64,
    pub fitted_at: DateTime<Utc>,
}

/// A fitted model together with the extractor settings it was trained with.
/// This is what gets persisted: rescoring new comments must normalize likes
/// exactly like the training corpus did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedModel {
    pub extractor: FeatureExtractor,
    pub model: ClusterModel,
}

fn feature_matrix(features: &[FeatureVector]) -> Array2<f64> {
    let mut x = Array2::<f64>::zeros((features.len(), FEATURE_DIM));
    for (i, fv) in features.iter().enumerate() {
        for (j, v) in fv.to_array().into_iter().enumerate() {
            x[[i, j]] = v;
        }
    }
    x
}

fn to_feature_array(row: &Array1<f64>) -> [f64; FEATURE_DIM] {
    let mut out = [0.0; FEATURE_DIM];
    for (slot, v) in out.iter_mut().zip(row.iter()) {
        *slot = *v;
    }
    out
}

/// Index of the largest value; ties go to the lowest index.
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

impl ClusterModel {
    /// Fit a model to a batch of feature vectors.
    pub fn fit(features: &[FeatureVector], config: &ClassifierConfig) -> Result<Self> {
        config.validate()?;
        if features.is_empty() {
            return Err(SieveError::NoData("no feature vectors to fit"));
        }
        for fv in features {
            fv.validate()?;
        }

        let raw = feature_matrix(features);
        let scaler = StandardScaler::fit(&raw);
        let x = scaler.transform(&raw);

        let mixture = fit_em(&x, &config.em_params())?;

        let posteriors = mixture.predict_proba_matrix(&x);
        let mut sizes = vec![0usize; mixture.components()];
        for row in posteriors.rows() {
            let row: Vec<f64> = row.to_vec();
            sizes[argmax(&row)] += 1;
        }

        let means: Vec<FeatureVector> = (0..mixture.components())
            .map(|k| {
                let raw_mean = scaler.inverse_row(mixture.means.row(k));
                FeatureVector::from_array_unchecked(to_feature_array(&raw_mean))
            })
            .collect();
        let scores: Vec<f64> = means
            .iter()
            .map(|m| spam_likelihood(m, &config.weights))
            .collect();
        let labels = assign_labels(&scores);

        let components: Vec<ComponentSummary> = (0..mixture.components())
            .map(|k| ComponentSummary {
                index: k,
                label: labels[k],
                weight: mixture.weights[k],
                size: sizes[k],
                spam_likelihood: scores[k],
                mean: means[k],
            })
            .collect();

        info!(
            rows = features.len(),
            components = mixture.components(),
            runs = config.n_init,
            log_likelihood = mixture.log_likelihood,
            "Cluster model fit"
        );

        Ok(Self {
            scaler,
            mixture,
            labels,
            components,
            uncertain_below: config.uncertain_below,
            seed: config.seed,
            fitted_at: Utc::now(),
        })
    }

    pub fn component_count(&self) -> usize {
        self.labels.len()
    }

    /// Score one comment's features against the model.
    pub fn classify(&self, comment_id: &str, features: &FeatureVector) -> Result<ClassificationResult> {
        features.validate()?;

        let row = Array1::from(features.to_array().to_vec());
        let z = self.scaler.transform_row(row.view());
        let post = self.mixture.predict_proba(z.view());

        let top = argmax(&post);
        let confidence = post[top].clamp(0.0, 1.0);
        let runner_up = post
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != top)
            .map(|(_, p)| *p)
            .fold(0.0_f64, f64::max);
        let leaning = self.labels[top];
        let label = match self.uncertain_below {
            Some(threshold) if confidence <= threshold => Label::Uncertain,
            _ => leaning,
        };

        Ok(ClassificationResult {
            comment_id: comment_id.to_string(),
            label,
            confidence,
            margin: (confidence - runner_up).max(0.0),
            leaning,
            posteriors: post
                .iter()
                .zip(&self.labels)
                .map(|(p, label)| LabelProbability {
                    label: *label,
                    probability: p.clamp(0.0, 1.0),
                })
                .collect(),
        })
    }

    /// Summary for the component carrying `label`, if any.
    pub fn component_for(&self, label: Label) -> Option<&ComponentSummary> {
        self.components.iter().find(|c| c.label == label)
    }
}
