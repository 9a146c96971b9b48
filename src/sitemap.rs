//! # Sitemap Reader
//!
//! Turns sitemap XML into a list of locations. A sitemap index yields its child
//! sitemap locations as-is; following them is left to the caller.

use std::path::Path;
use std::time::Duration;

use quick_xml::Reader;
use quick_xml::events::Event as XmlEvent;
use tracing::{debug, info, instrument, warn};

/// What a sitemap document lists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitemapKind {
    /// A `<sitemapindex>` of child sitemaps
    Index,
    /// A `<urlset>` of pages
    UrlSet,
}

/// Parsed sitemap locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sitemap {
    pub kind: SitemapKind,
    pub locs: Vec<String>,
}

impl Sitemap {
    fn empty() -> Self {
        Self {
            kind: SitemapKind::UrlSet,
            locs: Vec::new(),
        }
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    let value = value.trim();
    if !value.is_empty() && !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

/// Parse sitemap XML
///
/// Empty or malformed XML gives an empty `UrlSet` and a warning.
pub fn parse(content: &str, source: &str) -> Sitemap {
    if content.trim().is_empty() {
        warn!("Sitemap {} is empty", source);
        return Sitemap::empty();
    }

    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut is_index = false;
    let mut url_elements = 0usize;
    let mut url_locs = Vec::new();
    let mut sitemap_locs = Vec::new();
    let mut bare_locs = Vec::new();

    loop {
        let text = match reader.read_event() {
            Ok(XmlEvent::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_lowercase();
                if stack.is_empty() && name == "sitemapindex" {
                    is_index = true;
                }
                if name == "url" {
                    url_elements += 1;
                }
                stack.push(name);
                continue;
            }
            Ok(XmlEvent::Empty(e)) => {
                if e.local_name().as_ref().eq_ignore_ascii_case(b"url") {
                    url_elements += 1;
                }
                continue;
            }
            Ok(XmlEvent::End(_)) => {
                stack.pop();
                continue;
            }
            Ok(XmlEvent::Text(t)) => match t.unescape() {
                Ok(text) => text.into_owned(),
                Err(e) => {
                    warn!("Malformed sitemap {}: {}", source, e);
                    return Sitemap::empty();
                }
            },
            Ok(XmlEvent::CData(c)) => String::from_utf8_lossy(&c.into_inner()).into_owned(),
            Ok(XmlEvent::Eof) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!(
                    "Malformed sitemap {} at position {}: {}",
                    source,
                    reader.error_position(),
                    e
                );
                return Sitemap::empty();
            }
        };

        if stack.last().map(String::as_str) != Some("loc") {
            continue;
        }
        match stack.len() {
            2 => push_unique(&mut bare_locs, &text),
            n if n > 2 => match stack[n - 2].as_str() {
                "url" => push_unique(&mut url_locs, &text),
                "sitemap" => push_unique(&mut sitemap_locs, &text),
                _ => {}
            },
            _ => {}
        }
    }

    if is_index || (!sitemap_locs.is_empty() && url_elements == 0) {
        debug!("Sitemap {} is an index of {} sitemaps", source, sitemap_locs.len());
        return Sitemap {
            kind: SitemapKind::Index,
            locs: sitemap_locs,
        };
    }

    let locs = if url_locs.is_empty() { bare_locs } else { url_locs };
    if locs.is_empty() {
        warn!("Sitemap {} contains no locations", source);
    }
    Sitemap {
        kind: SitemapKind::UrlSet,
        locs,
    }
}

/// Locations listed by sitemap XML, without following nested sitemaps
pub fn read(content: &str, source: &str) -> Vec<String> {
    parse(content, source).locs
}

/// Parse a sitemap from a local file
#[instrument]
pub async fn read_file(path: &Path) -> Sitemap {
    let source = path.display().to_string();
    match tokio::fs::read_to_string(path).await {
        Ok(content) => {
            let sitemap = parse(&content, &source);
            info!("Read {} locations from {}", sitemap.locs.len(), source);
            sitemap
        }
        Err(e) => {
            warn!("Could not read sitemap file {}: {}", source, e);
            Sitemap::empty()
        }
    }
}

/// Download and parse a remote sitemap
#[instrument(skip(client))]
pub async fn fetch(client: &reqwest::Client, url: &str, timeout: Duration) -> Sitemap {
    let response = match client.get(url).timeout(timeout).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!("Could not fetch sitemap {}: {}", url, e);
            return Sitemap::empty();
        }
    };

    if !response.status().is_success() {
        warn!("Sitemap {} returned status {}", url, response.status());
        return Sitemap::empty();
    }

    match response.text().await {
        Ok(content) => {
            let sitemap = parse(&content, url);
            info!("Read {} locations from {}", sitemap.locs.len(), url);
            sitemap
        }
        Err(e) => {
            warn!("Could not read sitemap body from {}: {}", url, e);
            Sitemap::empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URLSET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://example.com/</loc><lastmod>2024-01-01</lastmod></url>
  <url><loc>https://example.com/about</loc></url>
  <url><loc> https://example.com/blog?page=1&amp;sort=new </loc></url>
</urlset>"#;

    const INDEX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>https://example.com/sitemap-a.xml</loc></sitemap>
  <sitemap><loc>https://example.com/sitemap-b.xml</loc></sitemap>
</sitemapindex>"#;

    #[test]
    fn test_read_urlset() {
        let locs = read(URLSET, "test");
        assert_eq!(
            locs,
            vec![
                "https://example.com/",
                "https://example.com/about",
                "https://example.com/blog?page=1&sort=new",
            ]
        );
    }

    #[test]
    fn test_index_returns_child_sitemaps_only() {
        let sitemap = parse(INDEX, "test");
        assert_eq!(sitemap.kind, SitemapKind::Index);
        assert_eq!(
            sitemap.locs,
            vec![
                "https://example.com/sitemap-a.xml",
                "https://example.com/sitemap-b.xml",
            ]
        );
    }

    #[test]
    fn test_sitemap_elements_without_index_root() {
        let xml = "<root><sitemap><loc>https://example.com/child.xml</loc></sitemap></root>";
        let sitemap = parse(xml, "test");
        assert_eq!(sitemap.kind, SitemapKind::Index);
        assert_eq!(sitemap.locs, vec!["https://example.com/child.xml"]);
    }

    #[test]
    fn test_bare_locs_under_root() {
        let xml = "<urlset><loc>https://example.com/one</loc><loc>https://example.com/two</loc></urlset>";
        assert_eq!(
            read(xml, "test"),
            vec!["https://example.com/one", "https://example.com/two"]
        );
    }

    #[test]
    fn test_prefixed_namespace_and_cdata() {
        let xml = r#"<ns:urlset xmlns:ns="http://www.sitemaps.org/schemas/sitemap/0.9">
            <ns:url><ns:loc><![CDATA[https://example.com/cdata]]></ns:loc></ns:url>
        </ns:urlset>"#;
        assert_eq!(read(xml, "test"), vec!["https://example.com/cdata"]);
    }

    #[test]
    fn test_empty_and_malformed_give_empty_list() {
        assert!(read("", "test").is_empty());
        assert!(read("   ", "test").is_empty());
        assert!(read("<urlset><url><loc>https://example.com/</loc></urlset>", "test").is_empty());
        assert!(read("not xml at all", "test").is_empty());
    }

    #[tokio::test]
    async fn test_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sitemap.xml");
        std::fs::write(&path, URLSET).unwrap();

        let sitemap = read_file(&path).await;
        assert_eq!(sitemap.locs.len(), 3);

        let missing = read_file(&dir.path().join("missing.xml")).await;
        assert!(missing.locs.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_remote_sitemap() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/sitemap.xml")
            .with_status(200)
            .with_header("content-type", "application/xml")
            .with_body(URLSET)
            .expect(1)
            .create_async()
            .await;
        let _missing = server
            .mock("GET", "/gone.xml")
            .with_status(404)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let sitemap = fetch(
            &client,
            &format!("{}/sitemap.xml", server.url()),
            Duration::from_secs(5),
        )
        .await;
        assert_eq!(sitemap.locs.len(), 3);
        mock.assert_async().await;

        let gone = fetch(
            &client,
            &format!("{}/gone.xml", server.url()),
            Duration::from_secs(5),
        )
        .await;
        assert!(gone.locs.is_empty());
    }
}
