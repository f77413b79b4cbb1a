// Summaries over a batch of classification results: label distribution,
// per-label samples and review candidates.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::labeling::Label;
use super::model::ClassificationResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelCount {
    pub label: Label,
    pub count: usize,
    /// Share of all results, 0–100.
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelDistribution {
    pub total: usize,
    /// Always one entry per label, in quality/uncertain/spam order.
    pub counts: Vec<LabelCount>,
    /// Fraction of results labeled uncertain, 0–1.
    pub uncertainty_rate: f64,
    pub mean_confidence: f64,
}

impl LabelDistribution {
    pub fn count(&self, label: Label) -> usize {
        self.counts
            .iter()
            .find(|c| c.label == label)
            .map(|c| c.count)
            .unwrap_or(0)
    }

    /// Build from per-label counts (missing labels count as zero).
    pub fn from_counts(counts: &[(Label, usize)], mean_confidence: f64) -> Self {
        let total: usize = counts.iter().map(|(_, n)| n).sum();
        let pct = |n: usize| {
            if total == 0 {
                0.0
            } else {
                n as f64 * 100.0 / total as f64
            }
        };

        let counts: Vec<LabelCount> = Label::ALL
            .iter()
            .map(|&label| {
                let count = counts
                    .iter()
                    .filter(|(l, _)| *l == label)
                    .map(|(_, n)| n)
                    .sum();
                LabelCount {
                    label,
                    count,
                    percent: pct(count),
                }
            })
            .collect();
        let uncertain = counts
            .iter()
            .find(|c| c.label == Label::Uncertain)
            .map(|c| c.percent / 100.0)
            .unwrap_or(0.0);

        Self {
            total,
            counts,
            uncertainty_rate: uncertain,
            mean_confidence,
        }
    }
}

pub fn label_distribution(results: &[ClassificationResult]) -> LabelDistribution {
    let counts: Vec<(Label, usize)> = Label::ALL
        .iter()
        .map(|&label| (label, results.iter().filter(|r| r.label == label).count()))
        .collect();
    let mean_confidence = if results.is_empty() {
        0.0
    } else {
        results.iter().map(|r| r.confidence).sum::<f64>() / results.len() as f64
    };
    LabelDistribution::from_counts(&counts, mean_confidence)
}

fn by_confidence(a: &ClassificationResult, b: &ClassificationResult) -> Ordering {
    a.confidence
        .partial_cmp(&b.confidence)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.comment_id.cmp(&b.comment_id))
}

/// The `n` most confident results carrying `label`, most confident first.
pub fn top_samples(results: &[ClassificationResult], label: Label, n: usize) -> Vec<ClassificationResult> {
    let mut matching: Vec<&ClassificationResult> =
        results.iter().filter(|r| r.label == label).collect();
    matching.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.comment_id.cmp(&b.comment_id))
    });
    matching.into_iter().take(n).cloned().collect()
}

/// The `n` least confident results of any label, least confident first.
pub fn review_candidates(results: &[ClassificationResult], n: usize) -> Vec<ClassificationResult> {
    let mut all: Vec<&ClassificationResult> = results.iter().collect();
    all.sort_by(|a, b| by_confidence(a, b));
    all.into_iter().take(n).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str, label: Label, confidence: f64) -> ClassificationResult {
        ClassificationResult {
            comment_id: id.to_string(),
            label,
            confidence,
            margin: 0.0,
            leaning: label,
            posteriors: Vec::new(),
        }
    }

    fn results() -> Vec<ClassificationResult> {
        vec![
            result("a", Label::Spam, 0.99),
            result("b", Label::Quality, 0.80),
            result("c", Label::Quality, 0.97),
            result("d", Label::Uncertain, 0.51),
            result("e", Label::Spam, 0.62),
        ]
    }

    #[test]
    fn test_distribution_covers_every_label() {
        let d = label_distribution(&results());
        assert_eq!(d.total, 5);
        assert_eq!(d.count(Label::Quality), 2);
        assert_eq!(d.count(Label::Spam), 2);
        assert_eq!(d.count(Label::Uncertain), 1);
        assert!((d.uncertainty_rate - 0.2).abs() < 1e-12);
        assert_eq!(d.counts.len(), 3);
    }

    #[test]
    fn test_empty_distribution_has_zero_rates() {
        let d = label_distribution(&[]);
        assert_eq!(d.total, 0);
        assert_eq!(d.uncertainty_rate, 0.0);
        assert!(d.counts.iter().all(|c| c.percent == 0.0));
    }

    #[test]
    fn test_top_samples_orders_by_confidence() {
        let top = top_samples(&results(), Label::Quality, 5);
        let ids: Vec<&str> = top.iter().map(|r| r.comment_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);
        assert_eq!(top_samples(&results(), Label::Spam, 1)[0].comment_id, "a");
    }

    #[test]
    fn test_review_candidates_are_least_confident() {
        let review = review_candidates(&results(), 2);
        let ids: Vec<&str> = review.iter().map(|r| r.comment_id.as_str()).collect();
        assert_eq!(ids, vec!["d", "e"]);
    }
}
