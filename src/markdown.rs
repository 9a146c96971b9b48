//! Markdown structure helpers
//!
//! Section splitting, heading demotion and anchor slugs, all driven by the
//! pulldown-cmark event stream so that `#` lines inside code fences are never
//! mistaken for headings.

use std::collections::HashMap;
use std::ops::Range;

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};

/// A heading found in a markdown document
#[derive(Debug, Clone, PartialEq)]
struct Heading {
    level: usize,
    text: String,
    range: Range<usize>,
}

fn level_number(level: HeadingLevel) -> usize {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Top-level headings with their plain text and source range
fn headings(markdown: &str) -> Vec<Heading> {
    let mut found = Vec::new();
    let mut depth = 0usize;
    let mut current: Option<Heading> = None;

    for (event, range) in Parser::new_ext(markdown, Options::all()).into_offset_iter() {
        match event {
            Event::Start(Tag::Heading { level, .. }) if depth == 0 => {
                current = Some(Heading {
                    level: level_number(level),
                    text: String::new(),
                    range,
                });
            }
            Event::End(TagEnd::Heading(_)) if current.is_some() => {
                if let Some(mut heading) = current.take() {
                    heading.text = heading.text.trim().to_string();
                    found.push(heading);
                }
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some(heading) = current.as_mut() {
                    heading.text.push_str(&text);
                }
            }
            Event::Start(Tag::BlockQuote(_) | Tag::List(_) | Tag::FootnoteDefinition(_)) => {
                depth += 1;
            }
            Event::End(TagEnd::BlockQuote(_) | TagEnd::List(_) | TagEnd::FootnoteDefinition) => {
                depth = depth.saturating_sub(1);
            }
            _ => {}
        }
    }

    found
}

/// Plain text of every heading in document order, nested ones included
pub fn heading_texts(markdown: &str) -> Vec<String> {
    let mut texts = Vec::new();
    let mut current: Option<String> = None;

    for event in Parser::new_ext(markdown, Options::all()) {
        match event {
            Event::Start(Tag::Heading { .. }) => current = Some(String::new()),
            Event::End(TagEnd::Heading(_)) => {
                if let Some(text) = current.take() {
                    texts.push(text.trim().to_string());
                }
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some(heading) = current.as_mut() {
                    heading.push_str(&text);
                }
            }
            _ => {}
        }
    }

    texts
}

/// Split markdown into `(title, body)` sections at its headings
///
/// The split level is the shallowest heading level that occurs more than once, or
/// the shallowest present when none repeats; every heading at or above it starts a
/// new section. Text before the first split heading becomes a section titled
/// `fallback_title`. Sections with an empty body are dropped, and a document with no
/// headings comes back whole.
pub fn split_sections(markdown: &str, fallback_title: &str) -> Vec<(String, String)> {
    let all = headings(markdown);

    let mut counts = [0usize; 7];
    for heading in &all {
        counts[heading.level] += 1;
    }
    let split_level = (1..=6)
        .find(|&level| counts[level] > 1)
        .or_else(|| (1..=6).find(|&level| counts[level] > 0));

    let Some(split_level) = split_level else {
        let body = markdown.trim();
        return if body.is_empty() {
            Vec::new()
        } else {
            vec![(fallback_title.to_string(), body.to_string())]
        };
    };

    let boundaries: Vec<&Heading> = all.iter().filter(|h| h.level <= split_level).collect();

    let mut sections = Vec::new();
    let preamble = markdown[..boundaries[0].range.start].trim();
    if !preamble.is_empty() {
        sections.push((fallback_title.to_string(), preamble.to_string()));
    }

    for (i, heading) in boundaries.iter().enumerate() {
        let end = boundaries
            .get(i + 1)
            .map(|next| next.range.start)
            .unwrap_or(markdown.len());
        let body = markdown[heading.range.end.min(end)..end].trim();
        if body.is_empty() {
            continue;
        }
        let title = if heading.text.is_empty() {
            fallback_title.to_string()
        } else {
            heading.text.clone()
        };
        sections.push((title, body.to_string()));
    }

    sections
}

/// Rewrite a heading's source as an ATX heading at `level`
fn rewrite_heading(source: &str, level: usize) -> String {
    let trailing = &source[source.trim_end().len()..];
    let trimmed = source.trim();

    let text = if trimmed.starts_with('#') {
        let rest = trimmed.trim_start_matches('#').trim();
        // Optional closing sequence
        let without_close = rest.trim_end_matches('#');
        if without_close.len() < rest.len() && without_close.ends_with(' ') {
            without_close.trim_end()
        } else {
            rest
        }
    } else {
        // Setext heading: text is everything above the underline
        trimmed
            .rsplit_once('\n')
            .map(|(text, _)| text.trim())
            .unwrap_or(trimmed)
    };

    format!("{} {}{}", "#".repeat(level), text, trailing)
}

/// Shift headings so the shallowest one sits at `min_level`
///
/// Relative depth is preserved, levels never go past 6, and content whose headings
/// are already at or below `min_level` is returned unchanged.
pub fn demote_headings(markdown: &str, min_level: usize) -> String {
    let mut all = Vec::new();
    for (event, range) in Parser::new_ext(markdown, Options::all()).into_offset_iter() {
        if let Event::Start(Tag::Heading { level, .. }) = event {
            all.push((level_number(level), range));
        }
    }

    let Some(shallowest) = all.iter().map(|(level, _)| *level).min() else {
        return markdown.to_string();
    };
    if shallowest >= min_level {
        return markdown.to_string();
    }
    let shift = min_level - shallowest;

    let mut output = String::with_capacity(markdown.len() + all.len() * shift);
    let mut cursor = 0;
    for (level, range) in all {
        if range.start < cursor {
            continue;
        }
        output.push_str(&markdown[cursor..range.start]);
        output.push_str(&rewrite_heading(&markdown[range.clone()], (level + shift).min(6)));
        cursor = range.end;
    }
    output.push_str(&markdown[cursor..]);
    output
}

/// GitHub-style anchor slug for a heading
pub fn slugify(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                Some(c)
            } else if c.is_whitespace() {
                Some('-')
            } else {
                None
            }
        })
        .collect()
}

/// Generates unique anchor slugs within one document
#[derive(Debug, Default)]
pub struct Slugger {
    seen: HashMap<String, usize>,
}

impl Slugger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slug for `text`, suffixed with `-1`, `-2`, ... when already used
    pub fn slug(&mut self, text: &str) -> String {
        let base = slugify(text);
        let mut candidate = base.clone();
        if let Some(&used) = self.seen.get(&base) {
            let mut n = used;
            loop {
                n += 1;
                candidate = format!("{}-{}", base, n);
                if !self.seen.contains_key(&candidate) {
                    break;
                }
            }
            self.seen.insert(base, n);
        }
        self.seen.insert(candidate.clone(), 0);
        candidate
    }
}
