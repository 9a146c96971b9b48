//! Paragraph-level boilerplate classification
//!
//! Every leaf block (paragraph, list item, quote, definition, caption, or a `div`
//! holding only inline content) is scored on text length, stopword ratio, and
//! link density. Blocks scored as boilerplate are detached from the tree before
//! markdown conversion.

use ego_tree::{NodeId, NodeRef};
use scraper::{ElementRef, Html, Node};
use tracing::debug;

use super::config::BoilerplateThresholds;
use super::stopwords::stopword_ratio;

const CANDIDATE_TAGS: &[&str] = &["p", "li", "blockquote", "dd", "dt", "figcaption", "div"];

/// Elements that make a candidate a container rather than a leaf block
const STRUCTURAL_TAGS: &[&str] = &[
    "p", "div", "li", "ul", "ol", "dl", "dd", "dt", "blockquote", "pre", "table", "figure",
    "figcaption", "section", "article", "main", "h1", "h2", "h3", "h4", "h5", "h6", "hr",
];

/// Signals computed for one block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockScore {
    /// Characters of collapsed text
    pub length: usize,

    /// Share of words that are stopwords
    pub stopword_ratio: f32,

    /// Share of characters inside links
    pub link_density: f32,
}

impl BlockScore {
    /// Whether the block should be removed
    pub fn is_boilerplate(&self, thresholds: &BoilerplateThresholds) -> bool {
        self.length < thresholds.min_length
            || self.stopword_ratio > thresholds.max_stopword_ratio
            || self.link_density > thresholds.max_link_density
    }
}

/// Result of a filtering pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterOutcome {
    /// Blocks that were scored
    pub blocks: usize,

    /// Blocks that were removed
    pub removed: usize,
}

impl FilterOutcome {
    /// Every scored block was boilerplate
    pub fn all_bad(&self) -> bool {
        self.blocks > 0 && self.removed == self.blocks
    }
}

fn collapsed_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn element_name<'a>(node: &NodeRef<'a, Node>) -> Option<&'a str> {
    node.value().as_element().map(|e| e.name())
}

fn is_leaf_block(node: NodeRef<'_, Node>) -> bool {
    let Some(name) = element_name(&node) else {
        return false;
    };
    CANDIDATE_TAGS.contains(&name)
        && !node
            .descendants()
            .skip(1)
            .filter_map(|d| element_name(&d))
            .any(|n| STRUCTURAL_TAGS.contains(&n))
}

/// Score a block; `None` when it has no text at all
pub fn score(node: NodeRef<'_, Node>) -> Option<BlockScore> {
    let element = ElementRef::wrap(node)?;
    let text = collapsed_text(element);
    let chars = text.chars().count();
    if chars == 0 {
        return None;
    }

    let link_chars: usize = node
        .descendants()
        .filter(|d| element_name(d) == Some("a"))
        .filter_map(ElementRef::wrap)
        .map(|a| collapsed_text(a).chars().count())
        .sum();

    // List items are short by nature; judge their length by the whole list
    let length = match node.parent() {
        Some(parent)
            if element_name(&node) == Some("li")
                && matches!(element_name(&parent), Some("ul" | "ol")) =>
        {
            ElementRef::wrap(parent)
                .map(|list| collapsed_text(list).chars().count())
                .unwrap_or(chars)
        }
        _ => chars,
    };

    Some(BlockScore {
        length,
        stopword_ratio: stopword_ratio(&text),
        link_density: (link_chars.min(chars)) as f32 / chars as f32,
    })
}

/// Remove boilerplate blocks from `document`
pub fn filter(document: &mut Html, thresholds: &BoilerplateThresholds) -> FilterOutcome {
    let mut outcome = FilterOutcome::default();
    let mut doomed: Vec<NodeId> = Vec::new();

    for node in document.tree.root().descendants() {
        if !is_leaf_block(node) {
            continue;
        }
        let Some(score) = score(node) else {
            continue;
        };
        outcome.blocks += 1;
        if score.is_boilerplate(thresholds) {
            debug!(
                length = score.length,
                stopword_ratio = score.stopword_ratio,
                link_density = score.link_density,
                "Removing boilerplate block"
            );
            doomed.push(node.id());
        }
    }

    for id in doomed {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
            outcome.removed += 1;
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROSE: &str = "Rust programs compile into native machine code through LLVM, \
        giving predictable performance characteristics. Ownership rules checked during \
        compilation prevent data races, dangling pointers, double frees. Cargo handles \
        dependency resolution, builds, tests, documentation generation across whole workspaces.";

    fn parse(html: &str) -> Html {
        Html::parse_fragment(html)
    }

    #[test]
    fn test_short_paragraph_removed() {
        let mut doc = parse(&format!("<p>{PROSE}</p><p>Copyright 2024</p>"));
        let outcome = filter(&mut doc, &BoilerplateThresholds::default());

        assert_eq!(outcome, FilterOutcome { blocks: 2, removed: 1 });
        let html = doc.html();
        assert!(html.contains("Ownership rules"));
        assert!(!html.contains("Copyright"));
    }

    #[test]
    fn test_stopword_ratio_threshold() {
        let stopwordy = "It was the one that they had and it was all there is for us to \
            do with it, as it is what we have been doing and will be doing for them too.";
        let thresholds = BoilerplateThresholds::default();

        let mut doc = parse(&format!("<p>{stopwordy}</p><p>{PROSE}</p>"));
        let outcome = filter(&mut doc, &thresholds);
        assert_eq!(outcome.removed, 1);
        assert!(!doc.html().contains("they had"));
        assert!(doc.html().contains("Cargo handles"));

        let relaxed = BoilerplateThresholds {
            max_stopword_ratio: 1.0,
            ..thresholds
        };
        let mut doc = parse(&format!("<p>{stopwordy}</p><p>{PROSE}</p>"));
        assert_eq!(filter(&mut doc, &relaxed).removed, 0);
    }

    #[test]
    fn test_link_heavy_block_removed() {
        let links = "<p><a href=\"/a\">Home page of the whole documentation site</a> \
            <a href=\"/b\">Getting started with installation guides</a> \
            <a href=\"/c\">Reference material</a></p>";
        let mut doc = parse(&format!("{links}<p>{PROSE}</p>"));
        let outcome = filter(&mut doc, &BoilerplateThresholds::default());

        assert_eq!(outcome.removed, 1);
        assert!(!doc.html().contains("Reference material"));
    }

    #[test]
    fn test_list_items_measured_against_list() {
        let list = "<ul><li>Ownership checked at compile time prevents races</li>\
            <li>Borrowing rules stop dangling pointers entirely</li>\
            <li>Cargo builds, tests, documents whole workspaces</li></ul>";
        let mut doc = parse(list);
        let outcome = filter(&mut doc, &BoilerplateThresholds::default());

        assert_eq!(outcome.blocks, 3);
        assert_eq!(outcome.removed, 0);
    }

    #[test]
    fn test_containers_and_textless_blocks_not_scored() {
        let mut doc = parse(&format!(
            "<div><p>{PROSE}</p></div><p><img src=\"/x.png\" alt=\"\"></p><pre>x = 1</pre>"
        ));
        let outcome = filter(&mut doc, &BoilerplateThresholds::default());

        assert_eq!(outcome.blocks, 1);
        assert_eq!(outcome.removed, 0);
        assert!(doc.html().contains("x.png"));
    }

    #[test]
    fn test_all_bad() {
        let mut doc = parse("<p>Menu</p><p>Copyright 2024</p>");
        let outcome = filter(&mut doc, &BoilerplateThresholds::default());
        assert!(outcome.all_bad());
        assert!(!FilterOutcome::default().all_bad());
    }
}
