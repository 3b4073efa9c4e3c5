use regex::Regex;
use std::sync::OnceLock;

/// A chunk is text up to and including a run of terminators; trailing text
/// without a terminator forms the last chunk.
fn chunk_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[^.!?\n]*[.!?\n]+|[^.!?\n]+").expect("chunk pattern is valid")
    })
}

/// Split text into sentence or line sized chunks, each keeping its terminators.
///
/// Matches are contiguous and cover the whole input, so concatenating the
/// chunks reproduces `text` exactly.
pub fn split_into_chunks(text: &str) -> Vec<String> {
    chunk_pattern()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Blank chunks are skipped during playback, never sent to the engine
pub fn is_blank(chunk: &str) -> bool {
    chunk.trim().is_empty()
}
