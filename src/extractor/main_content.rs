//! Main-content isolation with Mozilla's readability algorithm

use std::io::Cursor;

use tracing::debug;
use url::Url;

/// HTML of the primary content, or `None` when readability finds nothing
pub fn main_content(html: &str, url: &Url) -> Option<String> {
    let mut cursor = Cursor::new(html.as_bytes());
    match ::readability::extractor::extract(&mut cursor, url) {
        Ok(product) if !product.text.trim().is_empty() => Some(product.content),
        Ok(_) => {
            debug!("Readability found no main content in {}", url);
            None
        }
        Err(_) => {
            debug!("Readability could not parse {}", url);
            None
        }
    }
}
