#![no_main]

use libfuzzer_sys::fuzz_target;
use ngramdex::utils::{collect_query_ngrams, encode, is_binary};

fuzz_target!(|data: &[u8]| {
    let _ = is_binary(data);
    let text = String::from_utf8_lossy(data);
    let filter = encode(&text);

    // Every prefix of the text must pass its own filter
    let cut = text.char_indices().nth(text.chars().count() / 2).map_or(text.len(), |(i, _)| i);
    assert!(filter.contains_all(&collect_query_ngrams(&text[..cut])));
});
