// FeatureVector — the fixed-order numeric representation of a comment.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SieveError};

/// Number of features in a vector.
pub const FEATURE_DIM: usize = 12;

/// Derived features for one comment. Serializes as an ordered JSON object
/// in `FeatureVector::NAMES` order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub length_chars: f64,
    pub length_words: f64,
    pub caps_ratio: f64,
    pub repetition_ratio: f64,
    pub emoji_ratio: f64,
    pub emoji_diversity: f64,
    pub likes_per_char: f64,
    pub special_ratio: f64,
    pub avg_word_length: f64,
    pub url_count: f64,
    pub is_reply: f64,
    pub is_generic: f64,
}

/// Features that are fractions and must lie in [0, 1].
const UNIT_INTERVAL: [bool; FEATURE_DIM] = [
    false, // length_chars
    false, // length_words
    true,  // caps_ratio
    true,  // repetition_ratio
    true,  // emoji_ratio
    true,  // emoji_diversity
    true,  // likes_per_char
    true,  // special_ratio
    false, // avg_word_length
    false, // url_count
    true,  // is_reply
    true,  // is_generic
];

impl FeatureVector {
    pub const NAMES: [&'static str; FEATURE_DIM] = [
        "length_chars",
        "length_words",
        "caps_ratio",
        "repetition_ratio",
        "emoji_ratio",
        "emoji_diversity",
        "likes_per_char",
        "special_ratio",
        "avg_word_length",
        "url_count",
        "is_reply",
        "is_generic",
    ];

    pub fn to_array(&self) -> [f64; FEATURE_DIM] {
        [
            self.length_chars,
            self.length_words,
            self.caps_ratio,
            self.repetition_ratio,
            self.emoji_ratio,
            self.emoji_diversity,
            self.likes_per_char,
            self.special_ratio,
            self.avg_word_length,
            self.url_count,
            self.is_reply,
            self.is_generic,
        ]
    }

    /// Build a vector from raw values in `NAMES` order, rejecting anything
    /// out of range.
    pub fn from_array(values: [f64; FEATURE_DIM]) -> Result<Self> {
        let fv = Self::from_array_unchecked(values);
        fv.validate()?;
        Ok(fv)
    }

    pub(crate) fn from_array_unchecked(v: [f64; FEATURE_DIM]) -> Self {
        Self {
            length_chars: v[0],
            length_words: v[1],
            caps_ratio: v[2],
            repetition_ratio: v[3],
            emoji_ratio: v[4],
            emoji_diversity: v[5],
            likes_per_char: v[6],
            special_ratio: v[7],
            avg_word_length: v[8],
            url_count: v[9],
            is_reply: v[10],
            is_generic: v[11],
        }
    }

    /// Look up a feature by name.
    pub fn get(&self, name: &str) -> Option<f64> {
        Self::NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| self.to_array()[i])
    }

    /// Every value must be finite and non-negative; ratios must not exceed 1.
    /// Out-of-range input is rejected, never clamped.
    pub fn validate(&self) -> Result<()> {
        for (i, value) in self.to_array().into_iter().enumerate() {
            let name = Self::NAMES[i];
            if !value.is_finite() {
                return Err(SieveError::InvalidFeature {
                    feature: name,
                    message: format!("{value} is not finite"),
                });
            }
            if value < 0.0 {
                return Err(SieveError::InvalidFeature {
                    feature: name,
                    message: format!("{value} is negative"),
                });
            }
            if UNIT_INTERVAL[i] && value > 1.0 {
                return Err(SieveError::InvalidFeature {
                    feature: name,
                    message: format!("{value} exceeds 1.0"),
                });
            }
        }
        Ok(())
    }
}
