// Surface text statistics used as spam signals.
//
// All functions here are pure and operate on the cleaned comment text. The
// emoji statistics live in emoji.rs because they read the raw text.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex_lite::Regex;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static EXCLAMATIONS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!{4,}").expect("valid regex"));
static QUESTIONS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\?{4,}").expect("valid regex"));
static ELLIPSES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.{4,}").expect("valid regex"));
static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)https?://[^\s]+").expect("valid regex"));

/// Short template comments ("first!", "nice!!", "love it", "thanks", "lol").
static GENERIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?:first|1st)!?|(?:nice|good|great|awesome|amazing|cool)!*|(?:love it|love this|loved it)!*|(?:thanks|thank you)!*|(?:wow|omg|lol|haha)!*)$",
    )
    .expect("valid regex")
});

/// Light normalization that keeps the comment's character intact:
/// whitespace runs collapse to one space, runs of four or more `!`, `?` or
/// `.` shrink to three, and the ends are trimmed.
pub fn clean_text(text: &str) -> String {
    let text = WHITESPACE.replace_all(text, " ");
    let text = EXCLAMATIONS.replace_all(&text, "!!!");
    let text = QUESTIONS.replace_all(&text, "???");
    let text = ELLIPSES.replace_all(&text, "...");
    text.trim().to_string()
}

/// Statistics computed from the cleaned text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStats {
    pub char_count: usize,
    pub word_count: usize,
    pub avg_word_length: f64,
    pub caps_ratio: f64,
    pub special_ratio: f64,
    pub url_count: usize,
    pub repetition_ratio: f64,
    pub is_generic: bool,
}

pub fn text_stats(cleaned: &str) -> TextStats {
    let char_count = cleaned.chars().count();
    let words: Vec<&str> = cleaned.split_whitespace().collect();
    let word_count = words.len();

    let avg_word_length = if word_count == 0 {
        0.0
    } else {
        words.iter().map(|w| w.chars().count()).sum::<usize>() as f64 / word_count as f64
    };

    let special = cleaned.chars().filter(|c| c.is_ascii_punctuation()).count();
    let special_ratio = special as f64 / char_count.max(1) as f64;

    TextStats {
        char_count,
        word_count,
        avg_word_length,
        caps_ratio: caps_ratio(cleaned),
        special_ratio,
        url_count: URL.find_iter(cleaned).count(),
        repetition_ratio: repetition_ratio(&words),
        is_generic: is_generic(cleaned),
    }
}

/// Uppercase letters as a fraction of all alphabetic characters.
/// Text without letters (emoji, digits, punctuation) scores 0.
pub fn caps_ratio(text: &str) -> f64 {
    let mut letters = 0usize;
    let mut upper = 0usize;
    for c in text.chars().filter(|c| c.is_alphabetic()) {
        letters += 1;
        if c.is_uppercase() {
            upper += 1;
        }
    }
    if letters == 0 {
        0.0
    } else {
        upper as f64 / letters as f64
    }
}

/// Occurrences of the most frequent token divided by the token count,
/// comparing tokens case-insensitively.
///
/// No tokens gives 0. A single token gives 1.0, so short low-content
/// comments sit at the spam-like end of the range.
pub fn repetition_ratio(words: &[&str]) -> f64 {
    if words.is_empty() {
        return 0.0;
    }
    let mut freq: HashMap<String, usize> = HashMap::new();
    for w in words {
        *freq.entry(w.to_lowercase()).or_insert(0) += 1;
    }
    let max = freq.values().copied().max().unwrap_or(0);
    max as f64 / words.len() as f64
}

pub fn is_generic(cleaned: &str) -> bool {
    GENERIC.is_match(&cleaned.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_squashes_runs() {
        assert_eq!(clean_text("  wow!!!!!!   so   good????  "), "wow!!! so good???");
        assert_eq!(clean_text("wait......."), "wait...");
        assert_eq!(clean_text("line\none\ttwo"), "line one two");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn test_caps_ratio_counts_letters_only() {
        assert!((caps_ratio("OMG") - 1.0).abs() < 1e-12);
        assert!((caps_ratio("Hi!!") - 0.5).abs() < 1e-12);
        assert_eq!(caps_ratio("123 !!! 😀"), 0.0);
        assert_eq!(caps_ratio(""), 0.0);
    }

    #[test]
    fn test_repetition_ratio_policy() {
        assert_eq!(repetition_ratio(&[]), 0.0);
        assert_eq!(repetition_ratio(&["hello"]), 1.0);
        assert!((repetition_ratio(&["spam", "SPAM", "spam", "eggs"]) - 0.75).abs() < 1e-12);
        assert!((repetition_ratio(&["a", "b", "c", "d"]) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_generic_templates() {
        assert!(is_generic("First!"));
        assert!(is_generic("nice!!!"));
        assert!(is_generic("Love it"));
        assert!(is_generic("OMG"));
        assert!(is_generic("thank you!"));
        assert!(!is_generic("nice tutorial, the lighting section helped"));
        assert!(!is_generic(""));
    }

    #[test]
    fn test_text_stats() {
        let stats = text_stats("Check https://example.com now!");
        assert_eq!(stats.word_count, 3);
        assert_eq!(stats.url_count, 1);
        assert!(stats.special_ratio > 0.0);
        assert!(!stats.is_generic);
    }
}
