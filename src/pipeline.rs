//! # Pipeline Module
//!
//! Orchestrates one job: resolve the input to pages, fetch them, extract
//! markdown, split and deduplicate sections, and aggregate the document.
//!
//! ## Key Components
//!
//! - `JobOptions`: Per-job configuration composed of the stage configs
//! - `Pipeline`: Runs jobs with an optional embedder and fetcher override
//! - `resolve_and_fetch` / `build_document`: Free-function entry points
//!
//! Per-page failures are logged and absorbed. Only an unclassifiable input and a job
//! with no surviving sections are reported to the caller.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::aggregator::{AggregatedDocument, JobMetadata, aggregate};
use crate::crawler::{Crawler, CrawlerConfig};
use crate::dedup::{DEFAULT_SIMILARITY_THRESHOLD, Deduplicator};
use crate::error::{Error, Result};
use crate::extractor::{Extractor, ExtractorConfig, page_title};
use crate::fetcher::{FetchConfig, FetchResult, Fetcher, build_fetcher, fetch_all};
use crate::input::{InputKind, classify, read_link_list};
use crate::markdown::split_sections;
use crate::model::{Embedder, gemini_embedder_from_env};
use crate::section::Section;
use crate::sitemap::{self, Sitemap, SitemapKind};

/// Page titles supplied by the input itself, keyed by the listed URL
type ListedTitles = HashMap<String, String>;

/// Deepest sitemap index nesting followed when expansion is enabled
pub const MAX_SITEMAP_DEPTH: usize = 3;

/// Configuration for one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobOptions {
    /// Crawl settings: page cap, delays, robots handling
    pub crawler: CrawlerConfig,

    /// Fetch strategy, concurrency and timeouts
    pub fetch: FetchConfig,

    /// Boilerplate thresholds and sanitizer allow-list
    pub extractor: ExtractorConfig,

    /// Cosine similarity at or above which a section is a duplicate
    pub similarity_threshold: f32,

    /// Fetch only the given URL instead of crawling its site
    pub single_page: bool,

    /// Split multi-page content into sections at headings
    pub split_sections: bool,

    /// Follow nested sitemap indexes
    pub expand_nested_sitemaps: bool,

    /// Wall-clock limit for the whole job
    pub job_timeout_secs: Option<u64>,

    /// Document title override
    pub title: Option<String>,

    /// Tags copied into the document front matter
    pub tags: Vec<String>,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            fetch: FetchConfig::default(),
            extractor: ExtractorConfig::default(),
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            single_page: false,
            split_sections: true,
            expand_nested_sitemaps: false,
            job_timeout_secs: None,
            title: None,
            tags: Vec::new(),
        }
    }
}

impl JobOptions {
    /// Create a new builder
    pub fn builder() -> JobOptionsBuilder {
        JobOptionsBuilder::new()
    }

    /// Maximum number of pages per job
    pub fn page_cap(&self) -> usize {
        self.crawler.max_pages
    }

    /// Deadline for the job, measured from now
    pub fn deadline(&self) -> Option<Instant> {
        self.job_timeout_secs
            .map(|secs| Instant::now() + Duration::from_secs(secs))
    }

    /// Metadata handed to the aggregator
    pub fn metadata(&self) -> JobMetadata {
        JobMetadata {
            tags: self.tags.clone(),
            title: self.title.clone(),
            ..Default::default()
        }
    }
}

/// Builder for `JobOptions`
#[derive(Debug, Default)]
pub struct JobOptionsBuilder {
    options: JobOptions,
}

impl JobOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn crawler(mut self, crawler: CrawlerConfig) -> Self {
        self.options.crawler = crawler;
        self
    }

    pub fn fetch(mut self, fetch: FetchConfig) -> Self {
        self.options.fetch = fetch;
        self
    }

    pub fn extractor(mut self, extractor: ExtractorConfig) -> Self {
        self.options.extractor = extractor;
        self
    }

    /// Page cap for crawls, sitemaps and link lists
    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.options.crawler.max_pages = max_pages;
        self
    }

    /// Concurrent fetch bound, shared by the crawler and the fetcher
    pub fn max_concurrent_fetches(mut self, max_concurrent_fetches: usize) -> Self {
        self.options.crawler.max_concurrent_fetches = max_concurrent_fetches;
        self.options.fetch.max_concurrent_fetches = max_concurrent_fetches;
        self
    }

    /// User agent for page, robots.txt and sitemap requests
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        let user_agent = user_agent.into();
        self.options.crawler.user_agent = user_agent.clone();
        self.options.fetch.user_agent = user_agent;
        self
    }

    pub fn similarity_threshold(mut self, similarity_threshold: f32) -> Self {
        self.options.similarity_threshold = similarity_threshold;
        self
    }

    pub fn single_page(mut self, single_page: bool) -> Self {
        self.options.single_page = single_page;
        self
    }

    pub fn split_sections(mut self, split_sections: bool) -> Self {
        self.options.split_sections = split_sections;
        self
    }

    pub fn expand_nested_sitemaps(mut self, expand_nested_sitemaps: bool) -> Self {
        self.options.expand_nested_sitemaps = expand_nested_sitemaps;
        self
    }

    pub fn job_timeout_secs(mut self, job_timeout_secs: u64) -> Self {
        self.options.job_timeout_secs = Some(job_timeout_secs);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.options.title = Some(title.into());
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.options.tags = tags;
        self
    }

    pub fn build(self) -> JobOptions {
        self.options
    }
}

/// Runs jobs end to end
pub struct Pipeline {
    options: JobOptions,
    extractor: Extractor,
    embedder: Option<Arc<dyn Embedder>>,
    fetcher: Option<Arc<dyn Fetcher>>,
    client: reqwest::Client,
}

impl Pipeline {
    /// Create a pipeline without an embedder; deduplication is skipped until one is set
    pub fn new(options: JobOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&options.fetch.user_agent)
            .build()?;

        Ok(Self {
            extractor: Extractor::new(options.extractor.clone()),
            options,
            embedder: None,
            fetcher: None,
            client,
        })
    }

    /// Use an embedding model for deduplication
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Use the Gemini embedder when `GEMINI_API_KEY` is set
    pub fn with_embedder_from_env(mut self) -> Self {
        self.embedder = gemini_embedder_from_env();
        self
    }

    /// Use a caller-owned fetcher instead of building one from the options
    ///
    /// The caller stays responsible for shutting it down.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn options(&self) -> &JobOptions {
        &self.options
    }

    fn fetcher(&self) -> Result<(Arc<dyn Fetcher>, bool)> {
        match &self.fetcher {
            Some(fetcher) => Ok((Arc::clone(fetcher), false)),
            None => Ok((build_fetcher(&self.options.fetch)?, true)),
        }
    }

    fn capped(&self, mut urls: Vec<String>, source: &str) -> Vec<String> {
        let cap = self.options.page_cap();
        if urls.len() > cap {
            info!(
                "{} lists {} URLs, keeping the first {}",
                source,
                urls.len(),
                cap
            );
            urls.truncate(cap);
        }
        urls
    }

    async fn load_sitemap(&self, location: &str) -> Sitemap {
        if location.starts_with("http://") || location.starts_with("https://") {
            sitemap::fetch(&self.client, location, self.options.fetch.timeout()).await
        } else {
            sitemap::read_file(Path::new(location)).await
        }
    }

    /// Page URLs listed by a sitemap, following nested indexes only when enabled
    async fn sitemap_urls(&self, root: Sitemap, source: &str) -> Vec<String> {
        if root.kind == SitemapKind::UrlSet || !self.options.expand_nested_sitemaps {
            return root.locs;
        }

        let mut seen: HashSet<String> = HashSet::from([source.to_string()]);
        let mut pending: Vec<(String, usize)> = root.locs.into_iter().map(|loc| (loc, 1)).collect();
        pending.reverse();
        let mut urls = Vec::new();

        while let Some((location, depth)) = pending.pop() {
            if !seen.insert(location.clone()) {
                continue;
            }
            let child = self.load_sitemap(&location).await;
            match child.kind {
                SitemapKind::UrlSet => urls.extend(child.locs),
                SitemapKind::Index if depth < MAX_SITEMAP_DEPTH => {
                    pending.extend(child.locs.into_iter().rev().map(|loc| (loc, depth + 1)));
                }
                SitemapKind::Index => {
                    warn!("Sitemap {} nests deeper than {} levels, ignoring it", location, MAX_SITEMAP_DEPTH);
                }
            }
            if urls.len() >= self.options.page_cap() {
                break;
            }
        }

        urls
    }

    /// URLs for inputs that list their pages up front, with any titles the listing gives them
    async fn listed_urls(&self, kind: &InputKind) -> Result<(Vec<String>, ListedTitles)> {
        let mut titles = ListedTitles::new();
        let (urls, source) = match kind {
            InputKind::LocalSitemapFile(path) => {
                let source = path.display().to_string();
                let root = sitemap::read_file(path).await;
                (self.sitemap_urls(root, &source).await, source)
            }
            InputKind::RemoteSitemap(url) => {
                let root = self.load_sitemap(url.as_str()).await;
                (self.sitemap_urls(root, url.as_str()).await, url.to_string())
            }
            InputKind::LinkList(path) => {
                let links = read_link_list(path).await?;
                let urls = links.iter().map(|link| link.url.clone()).collect();
                titles.extend(links.into_iter().map(|link| (link.url, link.title)));
                (urls, path.display().to_string())
            }
            InputKind::BaseUrl(url) => (vec![url.to_string()], url.to_string()),
        };
        Ok((self.capped(urls, &source), titles))
    }

    /// Fetch the pages of a job, crawling when the input is a base URL
    async fn fetch_pages(
        &self,
        kind: &InputKind,
        fetcher: Arc<dyn Fetcher>,
        deadline: Option<Instant>,
    ) -> Result<(Vec<FetchResult>, ListedTitles)> {
        match kind {
            InputKind::BaseUrl(url) if !self.options.single_page => {
                let crawler = Crawler::new(fetcher, self.options.crawler.clone())?;
                let report = crawler.crawl(url.as_str(), deadline).await?;
                Ok((report.pages, ListedTitles::new()))
            }
            _ => {
                let (urls, titles) = self.listed_urls(kind).await?;
                Ok((fetch_all(fetcher, &urls, deadline).await, titles))
            }
        }
    }

    /// Resolve an input to the ordered list of page URLs a job would process
    ///
    /// Base URLs are crawled to discover their pages.
    #[instrument(skip(self))]
    pub async fn resolve_urls(&self, input: &str) -> Result<Vec<String>> {
        let kind = classify(input)?;
        info!("Resolving {} '{}'", kind.label(), input);

        match &kind {
            InputKind::BaseUrl(_) if !self.options.single_page => {
                let (fetcher, owned) = self.fetcher()?;
                let pages = self
                    .fetch_pages(&kind, Arc::clone(&fetcher), self.options.deadline())
                    .await;
                if owned {
                    fetcher.shutdown().await;
                }
                let (pages, _) = pages?;
                Ok(pages.into_iter().map(|page| page.url).collect())
            }
            _ => Ok(self.listed_urls(&kind).await?.0),
        }
    }

    /// Run the job through deduplication
    #[instrument(skip(self))]
    pub async fn resolve_and_fetch(&self, input: &str) -> Result<Vec<Section>> {
        let deadline = self.options.deadline();
        let kind = classify(input)?;
        info!("Processing {} '{}'", kind.label(), input);

        let (fetcher, owned) = self.fetcher()?;
        let pages = self.fetch_pages(&kind, Arc::clone(&fetcher), deadline).await;
        if owned {
            fetcher.shutdown().await;
        }
        let (pages, titles) = pages?;

        let split = self.options.split_sections && !self.options.single_page;
        let extractor = self.extractor.clone();
        let sections = tokio::task::spawn_blocking(move || {
            pages
                .iter()
                .flat_map(|page| {
                    let listed = titles.get(&page.url).map(String::as_str);
                    page_sections(&extractor, page, listed, split)
                })
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| Error::Other(format!("extraction task failed: {e}")))?;
        info!("Extracted {} sections", sections.len());

        let deduplicator = Deduplicator::new(self.embedder.clone(), self.options.similarity_threshold);
        Ok(deduplicator.dedupe(sections).await)
    }

    /// Run the whole job and aggregate the document
    pub async fn clip(&self, input: &str) -> Result<AggregatedDocument> {
        let sections = self.resolve_and_fetch(input).await?;
        build_document(sections, self.options.metadata())
    }
}

/// Sections extracted from one fetched page; empty when the page failed or had no content
///
/// A title from the job's link list wins over the page's own `<title>`.
fn page_sections(
    extractor: &Extractor,
    page: &FetchResult,
    listed_title: Option<&str>,
    split: bool,
) -> Vec<Section> {
    let Some(html) = page.html.as_deref().filter(|_| page.is_success()) else {
        warn!(
            url = %page.url,
            stage = "fetch",
            error = %page.error.as_ref().map(ToString::to_string).unwrap_or_default(),
            "Skipping page"
        );
        return Vec::new();
    };

    // Relative links belong to wherever redirects left the page
    let url = page.landing_url();
    let title = listed_title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| page_title(html, url));
    let content = extractor.extract(html, url);
    if content.trim().is_empty() {
        info!(url = %url, stage = "extract", "No content extracted, dropping page");
        return Vec::new();
    }

    if !split {
        return vec![Section::new(url, title, content).fetched_at(page.fetched_at)];
    }

    let sections: Vec<Section> = split_sections(&content, &title)
        .into_iter()
        .map(|(heading, body)| Section::new(url, heading, body).fetched_at(page.fetched_at))
        .collect();
    debug!("Split {} into {} sections", url, sections.len());
    sections
}

/// Run a job through deduplication, with the embedder taken from the environment
pub async fn resolve_and_fetch(input: &str, options: JobOptions) -> Result<Vec<Section>> {
    Pipeline::new(options)?
        .with_embedder_from_env()
        .resolve_and_fetch(input)
        .await
}

/// Aggregate caller-supplied sections into a document
pub fn build_document(sections: Vec<Section>, metadata: JobMetadata) -> Result<AggregatedDocument> {
    aggregate(sections, metadata)
}
