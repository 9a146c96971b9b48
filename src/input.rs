//! # Input Resolver
//!
//! Decides what kind of seed a job was given: a sitemap (local or remote), a base URL
//! to crawl, or a local markdown file listing links.

pub mod link_list;

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};
use url::Url;

use crate::error::{Error, Result};

pub use link_list::{Link, LinkGroup, extract_links};

/// The kind of seed input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    /// A sitemap file on disk
    LocalSitemapFile(PathBuf),
    /// A sitemap served over HTTP
    RemoteSitemap(Url),
    /// A page URL; crawled, or fetched alone for single-page jobs
    BaseUrl(Url),
    /// A markdown file of links
    LinkList(PathBuf),
}

impl InputKind {
    /// Short label for logs and the CLI
    pub fn label(&self) -> &'static str {
        match self {
            InputKind::LocalSitemapFile(_) => "local sitemap file",
            InputKind::RemoteSitemap(_) => "remote sitemap",
            InputKind::BaseUrl(_) => "base URL",
            InputKind::LinkList(_) => "link list",
        }
    }
}

fn web_url(input: &str) -> Option<Url> {
    let url = Url::parse(input).ok()?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some_and(|h| !h.is_empty()) => Some(url),
        _ => None,
    }
}

/// Classify a seed input
///
/// Checks, in order: an existing file named `*sitemap.xml`, an http(s) URL whose path
/// ends in `sitemap.xml`, any other http(s) URL, and any other existing file.
#[instrument]
pub fn classify(input: &str) -> Result<InputKind> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("input is empty".to_string()));
    }

    let path = Path::new(trimmed);
    let is_file = path.is_file();

    let kind = if is_file && trimmed.ends_with("sitemap.xml") {
        InputKind::LocalSitemapFile(path.to_path_buf())
    } else if let Some(url) = web_url(trimmed) {
        if url.path().ends_with("sitemap.xml") {
            InputKind::RemoteSitemap(url)
        } else {
            InputKind::BaseUrl(url)
        }
    } else if is_file {
        InputKind::LinkList(path.to_path_buf())
    } else {
        return Err(Error::InvalidInput(format!(
            "'{}' is neither an http(s) URL nor an existing file",
            trimmed
        )));
    };

    debug!("Classified input '{}' as {}", trimmed, kind.label());
    Ok(kind)
}

/// Web links listed in a markdown link file, deduplicated by URL, in order
///
/// Each link keeps the title it was listed under; URLs are absolute http(s).
#[instrument]
pub async fn read_link_list(path: &Path) -> Result<Vec<Link>> {
    let content = tokio::fs::read_to_string(path).await?;
    let groups = extract_links(&content);

    let mut links: Vec<Link> = Vec::new();
    for link in groups.iter().flat_map(|g| g.links.iter()) {
        match web_url(&link.url) {
            Some(url) => {
                let url = url.to_string();
                if !links.iter().any(|l| l.url == url) {
                    links.push(Link {
                        title: link.title.clone(),
                        url,
                    });
                }
            }
            None => debug!("Ignoring non-web link '{}' ({})", link.url, link.title),
        }
    }

    info!(
        "Found {} URLs in {} sections of {}",
        links.len(),
        groups.len(),
        path.display()
    );
    Ok(links)
}
