//! HTML to markdown conversion
//!
//! Conversion itself is done by `htmd`. By the time a tree gets here the sanitizer
//! has already made links absolute and rewritten every `<pre>` block into
//! `<pre><code class="language-…">`, using [`infer_language`] on the original
//! markup, so the converter only has to emit the fence.

use ego_tree::NodeRef;
use htmd::HtmlToMarkdown;
use htmd::options::{BulletListMarker, CodeBlockFence, CodeBlockStyle, HeadingStyle, HrStyle, Options};
use scraper::{Html, Node, node::Element};

use super::error::ExtractError;

const LANGUAGE_CLASS_PREFIXES: &[&str] = &["language-", "lang-", "highlight-source-", "highlight-"];

fn clean_language(raw: &str) -> Option<String> {
    let language: String = raw
        .trim()
        .trim_end_matches(';')
        .chars()
        .filter(|&c| c.is_alphanumeric() || matches!(c, '+' | '-' | '#' | '_'))
        .collect::<String>()
        .to_lowercase();
    (!language.is_empty()).then_some(language)
}

fn language_hint(element: &Element) -> Option<String> {
    if let Some(language) = element
        .attr("data-language")
        .or_else(|| element.attr("data-lang"))
        .and_then(clean_language)
    {
        return Some(language);
    }

    for class in element.classes() {
        for prefix in LANGUAGE_CLASS_PREFIXES {
            if let Some(rest) = class.strip_prefix(prefix)
                && let Some(language) = clean_language(rest)
            {
                return Some(language);
            }
        }
    }

    // SyntaxHighlighter style: class="brush: python; gutter: false"
    let class = element.attr("class")?;
    let (_, rest) = class.split_once("brush:")?;
    rest.split(';').next().and_then(clean_language)
}

/// Infer the language of a `<pre>` block from its `<code>` child, itself, or two ancestors
pub fn infer_language(pre: NodeRef<'_, Node>) -> Option<String> {
    let code_child = pre
        .children()
        .find(|c| c.value().as_element().is_some_and(|e| e.name() == "code"));

    code_child
        .into_iter()
        .chain(std::iter::once(pre))
        .chain(pre.ancestors().take(2))
        .filter_map(|node| node.value().as_element())
        .find_map(language_hint)
}

fn converter() -> HtmlToMarkdown {
    HtmlToMarkdown::builder()
        .options(Options {
            heading_style: HeadingStyle::Atx,
            hr_style: HrStyle::Dashes,
            code_block_style: CodeBlockStyle::Fenced,
            code_block_fence: CodeBlockFence::Backticks,
            bullet_list_marker: BulletListMarker::Dash,
            ..Default::default()
        })
        .build()
}

/// Convert a sanitized, filtered document or fragment to markdown
pub fn to_markdown(document: &Html) -> Result<String, ExtractError> {
    converter()
        .convert(&document.root_element().html())
        .map_err(|e| ExtractError::Convert(e.to_string()))
}
