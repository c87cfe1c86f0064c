use std::sync::LazyLock;

use regex::Regex;

static BLANK_LINE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n").unwrap());

/// Splits source code on blank lines.
///
/// Each non-empty, trimmed block is returned as-is. Blocks are not bounded
/// in size and do not overlap.
pub fn split_code_blocks(code: &str) -> Vec<String> {
    BLANK_LINE_RE
        .split(code)
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .map(String::from)
        .collect()
}
