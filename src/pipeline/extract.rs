// Parallel feature extraction over a comment corpus.
//
// Extraction is CPU-bound and pure, so the corpus is split into chunks and
// each chunk runs on a blocking worker. `buffered` keeps at most
// `concurrency` chunks in flight and yields them in submission order, which
// keeps the output aligned with the input without a re-sort.

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::comments::Comment;
use crate::features::{FeatureExtractor, FeatureVector};

/// Comments handed to one blocking worker at a time.
pub const CHUNK_SIZE: usize = 256;

/// Extract features for every comment, in input order.
pub async fn extract_parallel(
    comments: &[Comment],
    extractor: FeatureExtractor,
    concurrency: usize,
    show_progress: bool,
) -> Result<Vec<FeatureVector>> {
    if comments.is_empty() {
        return Ok(Vec::new());
    }
    let concurrency = concurrency.max(1);

    let pb = if show_progress {
        let pb = ProgressBar::new(comments.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  Extracting [{bar:30}] {pos}/{len} ({eta})")
                .context("Invalid progress bar template")?,
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let chunks: Vec<Vec<Comment>> = comments.chunks(CHUNK_SIZE).map(|c| c.to_vec()).collect();
    let chunk_count = chunks.len();

    let results: Vec<Result<Vec<FeatureVector>>> = stream::iter(chunks.into_iter().map(|chunk| {
        let pb = pb.clone();
        async move {
            let len = chunk.len() as u64;
            let features = tokio::task::spawn_blocking(move || extractor.extract_all(&chunk))
                .await
                .context("Feature extraction worker panicked")?;
            pb.inc(len);
            Ok(features)
        }
    }))
    .buffered(concurrency)
    .collect()
    .await;
    pb.finish_and_clear();

    let mut features = Vec::with_capacity(comments.len());
    for chunk in results {
        features.extend(chunk?);
    }

    info!(
        comments = comments.len(),
        chunks = chunk_count,
        concurrency,
        "Extracted features"
    );
    Ok(features)
}
