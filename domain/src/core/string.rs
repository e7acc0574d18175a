//! Text helpers for one-line summaries of task descriptions and errors.

const ELLIPSIS: char = '…';

/// Collapse all whitespace runs (newlines included) into single spaces.
pub fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cut `s` to at most `max_chars` characters, ending in `…` when shortened.
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    out.push(ELLIPSIS);
    out
}

/// A single-line, length-capped rendering for status output.
pub fn summary_line(s: &str, max_chars: usize) -> String {
    truncate(&single_line(s), max_chars)
}
