//! Text normalization applied to raw strategy output.

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Normalize one raw line: collapse whitespace runs to single spaces, drop
/// remaining control characters and trim. Returns `None` when nothing
/// printable survives.
pub fn clean_line(line: &str) -> Option<String> {
    let collapsed = WHITESPACE_RUN.replace_all(line, " ");
    let printable: String = collapsed.chars().filter(|c| !c.is_control()).collect();
    let trimmed = printable.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Split raw page text into cleaned lines, discarding the empty ones.
pub fn clean_page(text: &str) -> Vec<String> {
    text.lines().filter_map(clean_line).collect()
}
