// Comment → FeatureVector extraction.
//
// Extraction is a pure function of the comment and one corpus-wide constant,
// the likes-per-char scale. The scale is measured once per corpus (the
// largest raw likes-per-char value) and then stored with the fitted model, so
// comments scored later are normalized exactly like the training corpus.

use serde::{Deserialize, Serialize};

use super::emoji::emoji_stats;
use super::text::{clean_text, text_stats};
use super::vector::FeatureVector;
use crate::comments::Comment;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureExtractor {
    /// Raw likes-per-char value that maps to 1.0.
    pub likes_scale: f64,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self { likes_scale: 1.0 }
    }
}

/// `like_count / max(cleaned_length, 1)` before corpus normalization.
pub fn raw_likes_per_char(like_count: u64, length_chars: usize) -> f64 {
    like_count as f64 / length_chars.max(1) as f64
}

impl FeatureExtractor {
    /// Use a fixed normalization constant. Non-positive or non-finite scales
    /// fall back to 1.0.
    pub fn with_likes_scale(likes_scale: f64) -> Self {
        if likes_scale.is_finite() && likes_scale > 0.0 {
            Self { likes_scale }
        } else {
            Self::default()
        }
    }

    /// Measure the likes-per-char scale over a corpus.
    pub fn for_corpus(comments: &[Comment]) -> Self {
        let max = comments
            .iter()
            .map(|c| raw_likes_per_char(c.like_count, clean_text(&c.text).chars().count()))
            .fold(0.0_f64, f64::max);
        Self::with_likes_scale(max)
    }

    /// Extract the feature vector for one comment.
    pub fn extract(&self, comment: &Comment) -> FeatureVector {
        let cleaned = clean_text(&comment.text);
        let stats = text_stats(&cleaned);
        let emoji = emoji_stats(&comment.text);

        let likes_per_char =
            (raw_likes_per_char(comment.like_count, stats.char_count) / self.likes_scale).min(1.0);

        FeatureVector {
            length_chars: stats.char_count as f64,
            length_words: stats.word_count as f64,
            caps_ratio: stats.caps_ratio,
            repetition_ratio: stats.repetition_ratio,
            emoji_ratio: emoji.emoji_ratio,
            emoji_diversity: emoji.emoji_diversity,
            likes_per_char,
            special_ratio: stats.special_ratio,
            avg_word_length: stats.avg_word_length,
            url_count: stats.url_count as f64,
            is_reply: if comment.is_reply() { 1.0 } else { 0.0 },
            is_generic: if stats.is_generic { 1.0 } else { 0.0 },
        }
    }

    /// Sequential extraction, preserving input order.
    pub fn extract_all(&self, comments: &[Comment]) -> Vec<FeatureVector> {
        comments.iter().map(|c| self.extract(c)).collect()
    }
}

/// Extract with the default (unit) likes scale.
pub fn extract_features(comment: &Comment) -> FeatureVector {
    FeatureExtractor::default().extract(comment)
}
