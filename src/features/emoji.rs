// Emoji detection over extended grapheme clusters.
//
// A grapheme counts as one emoji when it contains a pictographic code point
// from the ranges below, a regional indicator (flags), the emoji
// presentation selector U+FE0F, or the keycap combiner U+20E3. Multi-codepoint
// sequences such as "❤️", "👍🏽" or family ZWJ sequences are one grapheme and
// therefore one emoji.

use std::collections::HashSet;

use unicode_segmentation::UnicodeSegmentation;

const PICTOGRAPHIC_RANGES: &[(u32, u32)] = &[
    (0x1F000, 0x1F02F), // mahjong / domino tiles
    (0x1F0A0, 0x1F0FF), // playing cards
    (0x1F1E6, 0x1F1FF), // regional indicators
    (0x1F300, 0x1F5FF), // misc symbols and pictographs
    (0x1F600, 0x1F64F), // emoticons
    (0x1F680, 0x1F6FF), // transport and map
    (0x1F900, 0x1F9FF), // supplemental symbols and pictographs
    (0x1FA70, 0x1FAFF), // symbols and pictographs extended-A
    (0x2600, 0x26FF),   // misc symbols
    (0x2700, 0x27BF),   // dingbats
    (0x2B05, 0x2B07),
    (0x2B1B, 0x2B1C),
    (0x2B50, 0x2B50),
    (0x2B55, 0x2B55),
    (0x231A, 0x231B),
    (0x23E9, 0x23F3),
];

const VARIATION_SELECTOR_16: u32 = 0xFE0F;
const KEYCAP: u32 = 0x20E3;

fn is_emoji_char(c: char) -> bool {
    let cp = c as u32;
    PICTOGRAPHIC_RANGES
        .iter()
        .any(|&(lo, hi)| cp >= lo && cp <= hi)
}

/// Whether a single grapheme cluster renders as an emoji.
pub fn is_emoji_grapheme(grapheme: &str) -> bool {
    grapheme.chars().any(|c| {
        is_emoji_char(c) || c as u32 == VARIATION_SELECTOR_16 || c as u32 == KEYCAP
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmojiStats {
    pub emoji_count: usize,
    pub grapheme_count: usize,
    /// Emoji graphemes / all graphemes (0 for empty text).
    pub emoji_ratio: f64,
    /// Distinct emoji / emoji count (0 without emoji).
    pub emoji_diversity: f64,
}

pub fn emoji_stats(text: &str) -> EmojiStats {
    let mut grapheme_count = 0usize;
    let mut emojis: Vec<&str> = Vec::new();

    for g in text.graphemes(true) {
        grapheme_count += 1;
        if is_emoji_grapheme(g) {
            emojis.push(g);
        }
    }

    let emoji_count = emojis.len();
    let unique: HashSet<&str> = emojis.iter().copied().collect();

    EmojiStats {
        emoji_count,
        grapheme_count,
        emoji_ratio: if grapheme_count == 0 {
            0.0
        } else {
            emoji_count as f64 / grapheme_count as f64
        },
        emoji_diversity: if emoji_count == 0 {
            0.0
        } else {
            unique.len() as f64 / emoji_count as f64
        },
    }
}
