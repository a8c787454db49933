//! Checklist line grammar shared by download (render) and upload (parse).
//!
//! A line is ` [ ] text` or ` [x] text`. Parsing accepts an optional
//! single whitespace before the box and after it.

use regex::Regex;
use std::sync::LazyLock;

static CHECKLIST_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s?\[( |x)\]\s?(.*)$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistLine {
    pub checked: bool,
    pub text: String,
}

/// Parse one local line. Returns `None` for headers, footers, blank lines
/// and boxes without any text.
pub fn parse_line(line: &str) -> Option<ChecklistLine> {
    let line = line.trim_end_matches(['\n', '\r']);
    let caps = CHECKLIST_LINE_RE.captures(line)?;

    let text = caps.get(2).map_or("", |m| m.as_str()).trim();
    if text.is_empty() {
        return None;
    }

    Some(ChecklistLine {
        checked: &caps[1] == "x",
        text: text.to_string(),
    })
}

/// Render one item the way it is written to `.todo` files.
pub fn render_line(text: &str, checked: bool) -> String {
    let mark = if checked { 'x' } else { ' ' };
    format!(" [{mark}] {text}\n")
}
