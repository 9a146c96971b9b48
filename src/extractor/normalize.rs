//! Whitespace normalization for converted markdown
//!
//! Fenced code is left untouched. Elsewhere runs of spaces collapse, trailing
//! whitespace goes, blank lines collapse to one, and headings get a blank line
//! before them.

use std::sync::LazyLock;

use regex::Regex;

struct Fence {
    marker: char,
    len: usize,
}

fn fence_open(line: &str) -> Option<Fence> {
    let trimmed = line.trim_start();
    let marker = trimmed.chars().next().filter(|&c| matches!(c, '`' | '~'))?;
    let len = trimmed.chars().take_while(|&c| c == marker).count();
    (len >= 3).then_some(Fence { marker, len })
}

fn closes(fence: &Fence, line: &str) -> bool {
    let trimmed = line.trim();
    let len = trimmed.chars().take_while(|&c| c == fence.marker).count();
    len >= fence.len && len == trimmed.chars().count()
}

static INNER_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+").expect("whitespace pattern is valid"));

fn collapse_line(line: &str) -> String {
    let body = line.trim_start();
    let indent = &line[..line.len() - body.len()];
    format!("{indent}{}", INNER_SPACE.replace_all(body, " "))
}

fn is_heading(line: &str) -> bool {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    (1..=6).contains(&hashes) && line[hashes..].starts_with(' ')
}

/// Normalize whitespace in a markdown document
pub fn normalize(markdown: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut fence: Option<Fence> = None;

    for raw in markdown.lines() {
        if let Some(open) = &fence {
            if closes(open, raw) {
                fence = None;
            }
            lines.push(raw.trim_end().to_string());
            continue;
        }

        if let Some(open) = fence_open(raw) {
            fence = Some(open);
            lines.push(raw.trim_end().to_string());
            continue;
        }

        let line = collapse_line(raw.trim_end());
        if line.trim().is_empty() {
            if lines.last().is_some_and(|last| !last.is_empty()) {
                lines.push(String::new());
            }
            continue;
        }

        if is_heading(&line) && lines.last().is_some_and(|last| !last.is_empty()) {
            lines.push(String::new());
        }
        lines.push(line);
    }

    lines.join("\n").trim().to_string()
}
