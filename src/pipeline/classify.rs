// Classification pipeline: comments -> features -> fit -> labels.
//
// 1. Measure the corpus likes scale and extract features in parallel
// 2. Fit the cluster model on a blocking worker (one retry on numerical failure)
// 3. Score every comment against the fitted model
//
// Rescoring skips step 2 and reuses a stored model with its extractor.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use super::extract::extract_parallel;
use crate::classifier::{fit_with_retry, ClassificationResult, ClassifierConfig, ClusterModel, SavedModel};
use crate::comments::Comment;
use crate::error::SieveError;
use crate::features::{FeatureExtractor, FeatureVector};

/// One comment with everything the pipeline derived from it.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedComment {
    pub comment: Comment,
    pub features: FeatureVector,
    pub result: ClassificationResult,
}

/// Output of a full classification run.
#[derive(Debug, Clone)]
pub struct ClassifyRun {
    pub saved: SavedModel,
    pub classified: Vec<ClassifiedComment>,
}

impl ClassifyRun {
    pub fn results(&self) -> Vec<ClassificationResult> {
        self.classified.iter().map(|c| c.result.clone()).collect()
    }
}

/// Extract, fit and classify a whole corpus.
pub async fn run(
    comments: Vec<Comment>,
    config: ClassifierConfig,
    concurrency: usize,
    show_progress: bool,
) -> Result<ClassifyRun> {
    if comments.is_empty() {
        return Err(SieveError::NoData("no comments to classify").into());
    }

    let extractor = FeatureExtractor::for_corpus(&comments);
    info!(
        comments = comments.len(),
        likes_scale = extractor.likes_scale,
        "Starting classification run"
    );
    let features = extract_parallel(&comments, extractor, concurrency, show_progress).await?;

    let training = features.clone();
    let model = tokio::task::spawn_blocking(move || fit_with_retry(&training, &config))
        .await
        .context("Cluster fit worker panicked")?
        .context("Cluster fit failed")?;

    let classified = score_all(comments, features, &model)?;
    let saved = SavedModel { extractor, model };
    Ok(ClassifyRun { saved, classified })
}

/// Classify new comments against a stored model.
pub async fn rescore(
    comments: Vec<Comment>,
    saved: &SavedModel,
    concurrency: usize,
    show_progress: bool,
) -> Result<Vec<ClassifiedComment>> {
    if comments.is_empty() {
        return Err(SieveError::NoData("no comments to rescore").into());
    }
    let features = extract_parallel(&comments, saved.extractor, concurrency, show_progress).await?;
    score_all(comments, features, &saved.model)
}

fn score_all(
    comments: Vec<Comment>,
    features: Vec<FeatureVector>,
    model: &ClusterModel,
) -> Result<Vec<ClassifiedComment>> {
    comments
        .into_iter()
        .zip(features)
        .map(|(comment, features)| {
            let result = model
                .classify(&comment.id, &features)
                .with_context(|| format!("Failed to classify comment {}", comment.id))?;
            Ok(ClassifiedComment {
                comment,
                features,
                result,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Label;

    fn corpus() -> Vec<Comment> {
        let mut comments = Vec::new();
        for i in 0..40 {
            comments.push(Comment::new(
                format!("q{i}"),
                format!(
                    "I tried the recipe from this video last weekend and step {} made a real difference to the texture.",
                    i % 9
                ),
                20 + (i % 13) as u64,
            ));
            let spam = ["OMG", "LOL!!!!", "first 😍😍😍", "WOW", "NICE 🔥🔥"];
            comments.push(Comment::new(format!("s{i}"), spam[i % spam.len()], 0));
        }
        comments
    }

    #[tokio::test]
    async fn test_run_labels_both_groups() {
        let run = run(corpus(), ClassifierConfig::default(), 2, false).await.unwrap();
        assert_eq!(run.classified.len(), 80);

        let label_of = |id: &str| {
            run.classified
                .iter()
                .find(|c| c.comment.id == id)
                .map(|c| c.result.label)
                .unwrap()
        };
        assert_eq!(label_of("s0"), Label::Spam);
        assert_eq!(label_of("q0"), Label::Quality);
    }

    #[tokio::test]
    async fn test_rescore_reuses_saved_model() {
        let run = run(corpus(), ClassifierConfig::default(), 2, false).await.unwrap();
        let fresh = vec![Comment::new("new", "OMG", 0)];
        let rescored = rescore(fresh, &run.saved, 1, false).await.unwrap();
        assert_eq!(rescored[0].result.label, Label::Spam);
    }

    #[tokio::test]
    async fn test_empty_corpus_is_no_data() {
        let err = run(Vec::new(), ClassifierConfig::default(), 1, false)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SieveError>(),
            Some(SieveError::NoData(_))
        ));
    }
}
