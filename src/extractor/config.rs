//! # Extractor Configuration Module
//!
//! Boilerplate thresholds and the sanitizer allow-list, kept as named values so
//! classification can be tested against fixtures without network I/O.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Thresholds for classifying a paragraph-like block as boilerplate
///
/// A block is bad when it is shorter than `min_length`, or its stopword ratio is
/// above `max_stopword_ratio`, or its link density is above `max_link_density`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoilerplateThresholds {
    /// Minimum number of text characters
    pub min_length: usize,

    /// Maximum share of words that are stopwords
    pub max_stopword_ratio: f32,

    /// Maximum share of characters that sit inside links
    pub max_link_density: f32,
}

impl Default for BoilerplateThresholds {
    fn default() -> Self {
        Self {
            min_length: 70,
            max_stopword_ratio: 0.6,
            max_link_density: 0.2,
        }
    }
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Tags and attributes that survive sanitization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Allowlist {
    /// Tags kept as-is; other tags are unwrapped unless dropped
    pub tags: BTreeSet<String>,

    /// Tags removed together with their content
    pub dropped_tags: BTreeSet<String>,

    /// Attributes allowed on every kept tag (`data-*` is allowed by prefix)
    pub global_attributes: BTreeSet<String>,

    /// Extra attributes per tag
    pub tag_attributes: BTreeMap<String, BTreeSet<String>>,

    /// URL schemes allowed in `href` and `src`; relative URLs are always allowed
    pub url_schemes: BTreeSet<String>,
}

impl Default for Allowlist {
    fn default() -> Self {
        let mut tag_attributes = BTreeMap::new();
        tag_attributes.insert("a".to_string(), set(&["href", "title"]));
        tag_attributes.insert("img".to_string(), set(&["src", "alt", "title"]));
        tag_attributes.insert("pre".to_string(), set(&["data-language"]));
        tag_attributes.insert("code".to_string(), set(&["data-language"]));
        tag_attributes.insert("ol".to_string(), set(&["start"]));
        tag_attributes.insert("td".to_string(), set(&["colspan", "rowspan"]));
        tag_attributes.insert("th".to_string(), set(&["colspan", "rowspan"]));

        Self {
            tags: set(&[
                "a", "abbr", "acronym", "b", "blockquote", "br", "code", "div", "em", "h1",
                "h2", "h3", "h4", "h5", "h6", "hr", "i", "img", "li", "math", "ol", "p", "pre",
                "span", "strong", "table", "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
                "dl", "dt", "dd", "figure", "figcaption", "del", "s", "sub", "sup", "kbd",
                "mark", "q", "cite", "section", "article", "main",
            ]),
            dropped_tags: set(&[
                "script", "style", "noscript", "template", "iframe", "object", "embed", "svg",
                "canvas", "head", "form", "input", "button", "select", "option", "textarea",
                "label", "fieldset", "nav", "link", "meta", "audio", "video",
            ]),
            global_attributes: set(&["class", "id", "name"]),
            tag_attributes,
            url_schemes: set(&["http", "https", "mailto"]),
        }
    }
}

/// Configuration for content extraction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Boilerplate classification thresholds
    pub thresholds: BoilerplateThresholds,

    /// Sanitizer allow-list
    pub allowlist: Allowlist,

    /// Skip readability-based main-content isolation and use the whole document
    pub skip_main_content: bool,
}

impl ExtractorConfig {
    /// Use the given boilerplate thresholds
    pub fn with_thresholds(mut self, thresholds: BoilerplateThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Turn readability-based main-content isolation on or off
    pub fn with_main_content(mut self, enabled: bool) -> Self {
        self.skip_main_content = !enabled;
        self
    }
}
