use crate::index::types::{NgramSet, QueryFingerprint};

/// Tag bit marking a unigram (a full Unicode code point).
pub const UNIGRAM_TAG: u64 = 1 << 61;

/// Tag bit marking a bigram (two low bytes of consecutive code points).
pub const BIGRAM_TAG: u64 = 1 << 62;

/// Tag bit marking a trigram (three low bytes of consecutive code points).
pub const TRIGRAM_TAG: u64 = 1 << 63;

/// Pack a single character into a tagged unigram
#[inline]
pub fn unigram(c: char) -> u64 {
    UNIGRAM_TAG | c as u64
}

/// Pack two consecutive characters into a tagged bigram
#[inline]
pub fn bigram(prev: char, cur: char) -> u64 {
    BIGRAM_TAG | ((prev as u64 & 0xFF) << 8) | (cur as u64 & 0xFF)
}

/// Pack three consecutive characters into a tagged trigram
#[inline]
pub fn trigram(prev2: char, prev1: char, cur: char) -> u64 {
    TRIGRAM_TAG
        | ((prev2 as u64 & 0xFF) << 16)
        | ((prev1 as u64 & 0xFF) << 8)
        | (cur as u64 & 0xFF)
}

/// Extract the tagged n-grams of `text`.
///
/// Every character contributes its unigram. The bigram ending at a character
/// is only emitted once two characters precede it, and the trigram once three
/// do, so the grams spanning the very start of the text are never recorded.
/// Queries go through the same function, which keeps the filter sound: any
/// gram a query emits at position `p` is emitted by the text at `offset + p`.
pub fn encode(text: &str) -> NgramSet {
    let mut set = NgramSet::new();
    let mut prev1 = '\0';
    let mut prev2 = '\0';

    for (i, cur) in text.chars().enumerate() {
        set.insert(unigram(cur));
        if i > 1 {
            set.insert(bigram(prev1, cur));
        }
        if i > 2 {
            set.insert(trigram(prev2, prev1, cur));
        }
        prev2 = prev1;
        prev1 = cur;
    }

    set
}

/// Encode a query string and remember how many distinct grams it has
pub fn collect_query_ngrams(query: &str) -> QueryFingerprint {
    let bitmask = encode(query);
    let cardinality = bitmask.len();
    QueryFingerprint {
        bitmask,
        cardinality,
    }
}

/// Check if content is likely binary
pub fn is_binary(content: &[u8]) -> bool {
    let sample_size = content.len().min(8192);
    let sample = &content[..sample_size];

    // Check for null bytes
    let null_count = sample.iter().filter(|&&b| b == 0).count();
    if null_count > sample_size / 10 {
        return true;
    }

    let non_text_count = sample
        .iter()
        .filter(|&&b| b < 0x20 && b != b'\n' && b != b'\r' && b != b'\t')
        .count();

    non_text_count > sample_size / 8
}
