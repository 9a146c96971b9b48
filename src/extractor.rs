//! # Extractor Module
//!
//! Turns raw page HTML into clean markdown.
//!
//! The stages run in a fixed order:
//!
//! 1. **Main content**: readability isolates the article body; pages where it
//!    finds nothing fall back to the whole document.
//! 2. **Sanitization**: an allow-list of tags and attributes strips scripts,
//!    styles, forms, and unsafe URLs; links become absolute and code blocks get
//!    their language.
//! 3. **Boilerplate removal**: each leaf block is scored on length, stopword
//!    ratio, and link density, and removed when it fails any threshold.
//! 4. **Conversion**: `htmd` turns the remaining tree into markdown.
//! 5. **Normalization**: whitespace is tidied outside code blocks.
//!
//! Extraction never fails from the caller's point of view; problems are logged and
//! yield empty text.

mod boilerplate;
mod config;
mod convert;
mod error;
mod main_content;
mod normalize;
mod sanitize;
mod stopwords;

pub use boilerplate::{BlockScore, FilterOutcome};
pub use config::{Allowlist, BoilerplateThresholds, ExtractorConfig};
pub use convert::to_markdown;
pub use error::ExtractError;
pub use normalize::normalize;
pub use sanitize::sanitize;
pub use stopwords::stopword_ratio;

use std::panic::{AssertUnwindSafe, catch_unwind};

use scraper::{Html, Selector};
use tracing::{debug, warn};
use url::Url;

/// HTML to markdown extractor
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    config: ExtractorConfig,
}

impl Extractor {
    /// Create an extractor with the given configuration
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// The active configuration
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Run every stage, reporting failures as errors
    pub fn try_extract(&self, html: &str, url: &str) -> Result<String, ExtractError> {
        let url = Url::parse(url)?;

        let main = if self.config.skip_main_content {
            None
        } else {
            main_content::main_content(html, &url)
        };
        let source = main.as_deref().unwrap_or(html);

        let sanitized = sanitize(source, &self.config.allowlist, &url);
        let mut document = Html::parse_fragment(&sanitized);

        let outcome = boilerplate::filter(&mut document, &self.config.thresholds);
        if outcome.all_bad() {
            warn!(
                url = %url,
                blocks = outcome.blocks,
                "Every block classified as boilerplate, returning empty text"
            );
            return Ok(String::new());
        }
        debug!(
            url = %url,
            blocks = outcome.blocks,
            removed = outcome.removed,
            "Boilerplate filter finished"
        );

        Ok(normalize(&to_markdown(&document)?))
    }

    /// Extract markdown from a page, returning empty text on any failure
    pub fn extract(&self, html: &str, url: &str) -> String {
        let result = catch_unwind(AssertUnwindSafe(|| self.try_extract(html, url)))
            .unwrap_or_else(|panic| {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(ExtractError::Panicked(message))
            });

        match result {
            Ok(markdown) => markdown,
            Err(err) => {
                warn!(url = %url, error = %err, "Extraction failed");
                String::new()
            }
        }
    }
}

/// Page title from `<title>`, falling back to a name derived from the host
pub fn page_title(html: &str, url: &str) -> String {
    let document = Html::parse_document(html);
    let title = Selector::parse("title").ok().and_then(|selector| {
        document
            .select(&selector)
            .next()
            .map(|t| t.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" "))
    });

    if let Some(title) = title.filter(|t| !t.is_empty()) {
        return title;
    }

    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .map(|host| host.trim_start_matches("www.").replace('.', "-"))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "Untitled".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROSE: &str = "Static analysis tools inspect source code without running it, \
        catching defects early in development. Linters flag suspicious patterns, type \
        checkers prove whole classes of errors impossible, formatters remove style debates \
        from code review. Together these tools shorten feedback loops, letting teams ship \
        reliable software faster with fewer regressions.";

    fn page(body: &str) -> String {
        format!("<html><head><title>Example</title></head><body>{body}</body></html>")
    }

    #[test]
    fn test_single_page_drops_copyright_line() {
        let html = page(&format!("<p>{PROSE}</p><p>Copyright 2024</p>"));
        assert!(PROSE.len() >= 300);

        for config in [
            ExtractorConfig::default(),
            ExtractorConfig::default().with_main_content(false),
        ] {
            let markdown = Extractor::new(config).extract(&html, "https://example.com/");
            assert!(markdown.contains("Static analysis tools inspect source code"));
            assert!(markdown.contains("fewer regressions."));
            assert!(!markdown.contains("Copyright"));
        }
    }

    #[test]
    fn test_stopword_threshold_decides_block() {
        let stopwordy = "They said that it was all about the old garden by the river, where \
            we would sit with them and talk about the weather for hours on end.";
        let html = page(&format!("<p>{stopwordy}</p><p>{PROSE}</p>"));

        let strict = Extractor::new(ExtractorConfig::default().with_main_content(false));
        let markdown = strict.extract(&html, "https://example.com/");
        assert!(!markdown.contains("old garden"));
        assert!(markdown.contains("Static analysis"));

        let relaxed = Extractor::new(
            ExtractorConfig::default()
                .with_main_content(false)
                .with_thresholds(BoilerplateThresholds {
                    max_stopword_ratio: 0.9,
                    ..Default::default()
                }),
        );
        let markdown = relaxed.extract(&html, "https://example.com/");
        assert!(markdown.contains("old garden"));
    }

    #[test]
    fn test_scripts_never_reach_output() {
        let html = page(&format!(
            "<script>document.write('injected')</script><p>{PROSE}<script>alert(1)</script></p>\
             <style>.x {{ color: red }}</style>"
        ));
        let markdown = Extractor::new(ExtractorConfig::default().with_main_content(false))
            .extract(&html, "https://example.com/");

        assert!(markdown.contains("Static analysis"));
        assert!(!markdown.contains("injected"));
        assert!(!markdown.contains("alert"));
        assert!(!markdown.contains("color"));
    }

    #[test]
    fn test_code_blocks_keep_language() {
        let html = page(&format!(
            "<h2>Usage</h2><p>{PROSE}</p><pre><code class=\"language-python\">print('hi')</code></pre>"
        ));
        let markdown = Extractor::new(ExtractorConfig::default().with_main_content(false))
            .extract(&html, "https://example.com/");

        assert!(markdown.starts_with("## Usage\n\n"));
        assert!(markdown.contains("```python\nprint('hi')\n```"));
    }

    #[test]
    fn test_all_boilerplate_page_is_empty() {
        let html = page("<p>Home</p><p>About us</p><p>Copyright 2024</p>");
        let markdown = Extractor::new(ExtractorConfig::default().with_main_content(false))
            .extract(&html, "https://example.com/");
        assert_eq!(markdown, "");
    }

    #[test]
    fn test_invalid_url() {
        let extractor = Extractor::default();
        assert!(matches!(
            extractor.try_extract("<p>x</p>", "not a url"),
            Err(ExtractError::InvalidUrl(_))
        ));
        assert_eq!(extractor.extract("<p>x</p>", "not a url"), "");
    }

    #[test]
    fn test_page_title() {
        assert_eq!(page_title(&page(""), "https://example.com/"), "Example");
        assert_eq!(
            page_title("<html><head><title>  Two\n words </title></head></html>", "https://x.io/"),
            "Two words"
        );
        assert_eq!(
            page_title("<p>no title</p>", "https://www.docs.example.com/a"),
            "docs-example-com"
        );
        assert_eq!(page_title("<p>no title</p>", "not a url"), "Untitled");
    }
}
