//! Allow-list HTML sanitizer
//!
//! Re-serializes a parsed document keeping only allowed tags and attributes.
//! Dropped tags vanish with their content; any other disallowed tag is unwrapped so
//! its text survives. Link and image URLs come out absolute, and `<pre>` blocks come
//! out as `<pre><code class="language-…">` holding their raw text.

use ego_tree::NodeRef;
use scraper::{ElementRef, Html, Node};
use url::Url;

use super::config::Allowlist;
use super::convert::infer_language;

const VOID_TAGS: &[&str] = &["br", "hr", "img"];
const URL_ATTRIBUTES: &[&str] = &["href", "src"];

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

/// Whether a link or image URL is relative or uses an allowed scheme
fn is_safe_url(value: &str, allowlist: &Allowlist) -> bool {
    // Browsers ignore whitespace and control characters inside a scheme
    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect();

    let scheme_end = compact.find(|c: char| matches!(c, ':' | '/' | '?' | '#'));
    match scheme_end {
        Some(index) if compact[index..].starts_with(':') => {
            let scheme = compact[..index].to_ascii_lowercase();
            allowlist.url_schemes.contains(&scheme)
        }
        _ => true,
    }
}

fn is_allowed_attribute(tag: &str, name: &str, allowlist: &Allowlist) -> bool {
    name.starts_with("data-")
        || allowlist.global_attributes.contains(name)
        || allowlist
            .tag_attributes
            .get(tag)
            .is_some_and(|attrs| attrs.contains(name))
}

struct Sanitizer<'a> {
    allowlist: &'a Allowlist,
    base: &'a Url,
    out: String,
}

impl Sanitizer<'_> {
    /// Absolute form of a link or image URL, if its scheme is allowed
    fn resolve(&self, value: &str) -> Option<String> {
        if !is_safe_url(value, self.allowlist) {
            return None;
        }
        let url = self.base.join(value.trim()).ok()?;
        self.allowlist
            .url_schemes
            .contains(url.scheme())
            .then(|| url.to_string())
    }

    fn code_block(&mut self, pre: NodeRef<'_, Node>) {
        let text: String = ElementRef::wrap(pre)
            .map(|e| e.text().collect())
            .unwrap_or_default();
        let code = text.strip_prefix('\n').unwrap_or(&text).trim_end();
        if code.is_empty() {
            return;
        }

        self.out.push_str("<pre><code");
        if let Some(language) = infer_language(pre) {
            self.out.push_str(" class=\"language-");
            escape_attribute(&language, &mut self.out);
            self.out.push('"');
        }
        self.out.push('>');
        escape_text(code, &mut self.out);
        self.out.push_str("</code></pre>");
    }

    fn walk(&mut self, node: NodeRef<'_, Node>) {
        match node.value() {
            Node::Text(text) => escape_text(text, &mut self.out),
            Node::Element(element) => {
                let tag = element.name().to_ascii_lowercase();
                if self.allowlist.dropped_tags.contains(&tag) {
                    return;
                }
                if !self.allowlist.tags.contains(&tag) {
                    for child in node.children() {
                        self.walk(child);
                    }
                    return;
                }
                if tag == "pre" {
                    self.code_block(node);
                    return;
                }

                self.out.push('<');
                self.out.push_str(&tag);
                // Attribute storage order is unspecified; sort for stable output
                let mut attrs: Vec<(String, &str)> = element
                    .attrs()
                    .map(|(name, value)| (name.to_ascii_lowercase(), value))
                    .collect();
                attrs.sort();
                for (name, value) in attrs {
                    if !is_allowed_attribute(&tag, &name, self.allowlist) {
                        continue;
                    }
                    let resolved;
                    let value = if URL_ATTRIBUTES.contains(&name.as_str()) {
                        match self.resolve(value) {
                            Some(url) => {
                                resolved = url;
                                resolved.as_str()
                            }
                            None => continue,
                        }
                    } else {
                        value
                    };
                    self.out.push(' ');
                    self.out.push_str(&name);
                    self.out.push_str("=\"");
                    escape_attribute(value, &mut self.out);
                    self.out.push('"');
                }
                self.out.push('>');

                if VOID_TAGS.contains(&tag.as_str()) {
                    return;
                }
                for child in node.children() {
                    self.walk(child);
                }
                self.out.push_str("</");
                self.out.push_str(&tag);
                self.out.push('>');
            }
            Node::Document | Node::Fragment => {
                for child in node.children() {
                    self.walk(child);
                }
            }
            _ => {}
        }
    }
}

/// Sanitize an HTML document or fragment against the allow-list, resolving
/// relative URLs against `base`
pub fn sanitize(html: &str, allowlist: &Allowlist, base: &Url) -> String {
    let document = Html::parse_document(html);
    let mut sanitizer = Sanitizer {
        allowlist,
        base,
        out: String::with_capacity(html.len()),
    };
    sanitizer.walk(document.tree.root());
    sanitizer.out
}
