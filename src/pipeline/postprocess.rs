//! Post-processing: deterministic cleanup of model output before JSON parsing.
//!
//! Models told to answer "strictly in JSON" still sometimes wrap the object in
//! a ```` ```json ```` fence or prefix a byte-order mark. These rules remove
//! that packaging only. Prose stays prose, so a chatty answer still fails to
//! parse and is reported as malformed.
//!
//! ## Rule Order
//!
//! Invisible characters go first so the fence regex sees the real first
//! character; trimming runs last.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to the raw model content.
///
/// 1. Strip invisible Unicode (BOM, zero-width spaces)
/// 2. Strip one outer code fence (```` ``` ```` or ```` ```json ````)
/// 3. Trim surrounding whitespace
pub fn clean_json_output(input: &str) -> String {
    let s = remove_invisible_chars(input);
    let s = strip_code_fence(&s);
    s.trim().to_string()
}

// ── Rule 1: Strip invisible Unicode ──────────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input
        .chars()
        .filter(|c| !matches!(c, '\u{FEFF}' | '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}'))
        .collect()
}

// ── Rule 2: Strip outer code fence ───────────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*[ \t]*\r?\n(.*?)\r?\n?```\s*$").unwrap());

fn strip_code_fence(input: &str) -> String {
    match RE_OUTER_FENCE.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}
