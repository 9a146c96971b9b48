//! Link discovery in fetched pages

use scraper::{Html, Selector};
use url::Url;

use super::CrawlError;

/// Extensions of files that are never HTML pages
const ASSET_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "svg", "ico", "bmp", "tif", "tiff", "avif", "pdf",
    "zip", "gz", "tgz", "tar", "rar", "7z", "bz2", "xz", "dmg", "exe", "msi", "deb", "rpm", "apk",
    "mp3", "mp4", "wav", "ogg", "webm", "avi", "mov", "mkv", "flac", "css", "js", "json", "xml",
    "woff", "woff2", "ttf", "otf", "eot",
];

fn is_asset(url: &Url) -> bool {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|last| last.rsplit_once('.'))
        .is_some_and(|(_, ext)| ASSET_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Absolute http(s) links in a page, in document order, fragments removed
///
/// Static assets are left out; host filtering is the frontier's job.
pub fn extract_links(html: &str, page_url: &Url) -> Result<Vec<Url>, CrawlError> {
    let document = Html::parse_document(html);
    let anchor_selector = Selector::parse("a[href]")
        .map_err(|e| CrawlError::HtmlParse(format!("Failed to parse anchor selector: {}", e)))?;

    // A <base href> changes what relative links resolve against
    let base = Selector::parse("base[href]")
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .next()
                .and_then(|el| el.value().attr("href"))
                .and_then(|href| page_url.join(href).ok())
        })
        .unwrap_or_else(|| page_url.clone());

    let mut links: Vec<Url> = Vec::new();
    for element in document.select(&anchor_selector) {
        let Some(href) = element.value().attr("href").map(str::trim) else {
            continue;
        };
        if href.is_empty() || href.starts_with('#') {
            continue;
        }

        let Ok(mut url) = base.join(href) else {
            continue;
        };
        if !matches!(url.scheme(), "http" | "https") || is_asset(&url) {
            continue;
        }
        url.set_fragment(None);
        if !links.contains(&url) {
            links.push(url);
        }
    }

    Ok(links)
}
