// Post-hoc cluster labeling.
//
// EM only produces anonymous components. This module maps them to semantic
// labels with a fixed ranking function over each component's mean in raw
// feature space: the more a component shouts, repeats itself, floods emoji,
// posts templates or links, and the shorter and less-liked it is, the more
// spam-like it ranks. Lowest rank is quality, highest is spam, and the middle
// component of a three-way fit is uncertain.
//
// The ranking is deliberately independent of the EM fit so the policy can be
// tested and swapped on its own.

use serde::{Deserialize, Serialize};

use crate::features::FeatureVector;

/// Semantic label assigned to a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Quality,
    Uncertain,
    Spam,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Quality => "quality",
            Label::Uncertain => "uncertain",
            Label::Spam => "spam",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quality" => Some(Label::Quality),
            "uncertain" => Some(Label::Uncertain),
            "spam" => Some(Label::Spam),
            _ => None,
        }
    }

    pub const ALL: [Label; 3] = [Label::Quality, Label::Uncertain, Label::Spam];
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Weights for the composite spam-likelihood score.
///
/// `score = caps·caps_ratio + repetition·repetition_ratio + emoji·emoji_ratio
///        + generic·is_generic + url·min(url_count, 1)
///        + shortness·(1 − min(length_chars / length_reference, 1))
///        − engagement·likes_per_char`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelWeights {
    pub caps: f64,
    pub repetition: f64,
    pub emoji: f64,
    pub generic: f64,
    pub url: f64,
    pub shortness: f64,
    /// Length (chars) at and beyond which a comment no longer counts as short.
    pub length_reference: f64,
    pub engagement: f64,
}

impl Default for LabelWeights {
    fn default() -> Self {
        Self {
            caps: 1.0,
            repetition: 1.0,
            emoji: 1.0,
            generic: 1.0,
            url: 0.5,
            shortness: 1.0,
            length_reference: 100.0,
            engagement: 0.5,
        }
    }
}

/// Composite spam-likelihood of a (mean) feature vector. Higher is more
/// spam-like.
pub fn spam_likelihood(mean: &FeatureVector, weights: &LabelWeights) -> f64 {
    let reference = weights.length_reference.max(1.0);
    let shortness = 1.0 - (mean.length_chars / reference).clamp(0.0, 1.0);
    weights.caps * mean.caps_ratio
        + weights.repetition * mean.repetition_ratio
        + weights.emoji * mean.emoji_ratio
        + weights.generic * mean.is_generic
        + weights.url * mean.url_count.min(1.0)
        + weights.shortness * shortness
        - weights.engagement * mean.likes_per_char
}

/// Assign a label to each component from its spam-likelihood score.
///
/// Components are ranked ascending by score (ties broken by component index),
/// then the lowest becomes quality, the highest spam and everything between
/// uncertain. A single component is quality.
pub fn assign_labels(scores: &[f64]) -> Vec<Label> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[a]
            .partial_cmp(&scores[b])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });

    let mut labels = vec![Label::Uncertain; scores.len()];
    if let Some(&first) = order.first() {
        labels[first] = Label::Quality;
    }
    if order.len() > 1 {
        if let Some(&last) = order.last() {
            labels[last] = Label::Spam;
        }
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(caps: f64, rep: f64, emoji: f64, len: f64, likes: f64) -> FeatureVector {
        FeatureVector {
            length_chars: len,
            length_words: (len / 5.0).round(),
            caps_ratio: caps,
            repetition_ratio: rep,
            emoji_ratio: emoji,
            emoji_diversity: 0.0,
            likes_per_char: likes,
            special_ratio: 0.02,
            avg_word_length: 4.5,
            url_count: 0.0,
            is_reply: 0.0,
            is_generic: 0.0,
        }
    }

    #[test]
    fn test_shouting_short_scores_higher_than_long_liked() {
        let w = LabelWeights::default();
        let spammy = vector(0.9, 0.8, 0.1, 6.0, 0.0);
        let quality = vector(0.05, 0.1, 0.0, 220.0, 0.4);
        assert!(spam_likelihood(&spammy, &w) > spam_likelihood(&quality, &w));
    }

    #[test]
    fn test_two_components() {
        assert_eq!(assign_labels(&[2.5, 0.3]), vec![Label::Spam, Label::Quality]);
    }

    #[test]
    fn test_three_components() {
        assert_eq!(
            assign_labels(&[1.0, 3.0, 0.1]),
            vec![Label::Uncertain, Label::Spam, Label::Quality]
        );
    }

    #[test]
    fn test_ties_break_by_component_index() {
        assert_eq!(assign_labels(&[1.0, 1.0]), vec![Label::Quality, Label::Spam]);
        assert_eq!(assign_labels(&[0.7]), vec![Label::Quality]);
        assert!(assign_labels(&[]).is_empty());
    }

    #[test]
    fn test_label_parse_and_display() {
        assert_eq!(Label::parse(" Spam "), Some(Label::Spam));
        assert_eq!(Label::parse("junk"), None);
        assert_eq!(Label::Uncertain.to_string(), "uncertain");
        assert_eq!(serde_json::to_string(&Label::Quality).unwrap(), "\"quality\"");
    }
}
