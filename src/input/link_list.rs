//! Markdown link list parsing

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use serde::Serialize;

/// Heading used for links that appear before any heading
pub const DEFAULT_GROUP: &str = "Default";

/// A `[title](url)` link
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub title: String,
    pub url: String,
}

/// Links that appear under one heading
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkGroup {
    pub heading: String,
    pub links: Vec<Link>,
}

/// A link or heading being read from the event stream
#[derive(Default)]
struct Pending {
    text: String,
    url: String,
}

/// Every link in a markdown document, grouped by the heading it appears under
///
/// Groups keep the order in which their heading first appears; a heading that
/// repeats adds to its earlier group. Groups without links are omitted. Links in
/// code blocks or inline code are not links and are skipped.
pub fn extract_links(markdown: &str) -> Vec<LinkGroup> {
    let mut groups = vec![LinkGroup {
        heading: DEFAULT_GROUP.to_string(),
        links: Vec::new(),
    }];
    let mut current = 0;
    let mut heading: Option<Pending> = None;
    let mut link: Option<Pending> = None;

    for event in Parser::new_ext(markdown, Options::ENABLE_TABLES) {
        match event {
            Event::Start(Tag::Heading { .. }) => heading = Some(Pending::default()),
            Event::End(TagEnd::Heading(_)) => {
                let Some(done) = heading.take() else { continue };
                let text = done.text.trim().to_string();
                current = match groups.iter().position(|g| g.heading == text) {
                    Some(index) => index,
                    None => {
                        groups.push(LinkGroup {
                            heading: text,
                            links: Vec::new(),
                        });
                        groups.len() - 1
                    }
                };
            }
            Event::Start(Tag::Link { dest_url, .. }) => {
                link = Some(Pending {
                    text: String::new(),
                    url: dest_url.trim().to_string(),
                });
            }
            Event::End(TagEnd::Link) => {
                let Some(done) = link.take() else { continue };
                if done.url.is_empty() {
                    continue;
                }
                // Untitled links are named by their URL
                let title = match done.text.trim() {
                    "" => done.url.clone(),
                    text => text.to_string(),
                };
                groups[current].links.push(Link {
                    title,
                    url: done.url,
                });
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some(pending) = link.as_mut().or(heading.as_mut()) {
                    pending.text.push_str(&text);
                }
            }
            _ => {}
        }
    }

    groups.retain(|g| !g.links.is_empty());
    groups
}
