//! # Frontier Crawler Module
//!
//! Discovers the pages of a site by following same-host links from a seed URL,
//! fetching them with bounded concurrency and a politeness delay.
//!
//! ## Key Components
//!
//! - `CrawlerConfig`: Configuration for the crawler, including page cap, delays and robots handling
//! - `Crawler`: Runs one crawl against a `Fetcher`
//! - `CrawlReport`: The successfully fetched pages in discovery order, plus skipped URLs
//!
//! ## Features
//!
//! - Never fetches the same normalized URL twice, never leaves the seed host
//! - Respects robots.txt rules and Crawl-delay
//! - Stops at the page cap or the job deadline, whichever comes first
//!
//! The frontier is owned by the control loop. Fetch tasks only hand their
//! `FetchResult` back; link extraction and enqueueing happen on the loop.

mod config;
mod error;
mod frontier;
mod links;
mod robots;

pub use config::{CrawlerConfig, CrawlerConfigBuilder};
pub use error::CrawlError;
pub use frontier::{CrawlTarget, Frontier, UrlState};
pub use links::extract_links;
pub use robots::RobotsPolicy;

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::fetcher::{FetchResult, Fetcher};

/// Result of a crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    /// Successfully fetched pages in discovery order
    pub pages: Vec<FetchResult>,

    /// URLs skipped because robots.txt disallows them or they redirect off the seed host
    pub skipped: Vec<String>,

    /// Number of fetches that failed
    pub failed: usize,
}

impl CrawlReport {
    /// URLs of the successfully fetched pages, in discovery order
    pub fn urls(&self) -> Vec<String> {
        self.pages.iter().map(|page| page.url.clone()).collect()
    }
}

/// Crawls one site through a fetch strategy
pub struct Crawler {
    fetcher: Arc<dyn Fetcher>,
    config: CrawlerConfig,
    client: reqwest::Client,
    robots: Option<RobotsPolicy>,
}

impl Crawler {
    /// Create a crawler; robots.txt is fetched at the start of each crawl
    pub fn new(fetcher: Arc<dyn Fetcher>, config: CrawlerConfig) -> Result<Self, CrawlError> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            fetcher,
            config,
            client,
            robots: None,
        })
    }

    /// Use a fixed robots policy instead of fetching robots.txt
    pub fn with_robots(mut self, robots: RobotsPolicy) -> Self {
        self.robots = Some(robots);
        self
    }

    async fn robots_for(&self, seed: &CrawlTarget) -> RobotsPolicy {
        if let Some(robots) = &self.robots {
            return robots.clone();
        }
        if !self.config.respect_robots_txt {
            return RobotsPolicy::allow_all();
        }
        RobotsPolicy::fetch(
            &self.client,
            &seed.url,
            &self.config.user_agent,
            self.config.robots_timeout(),
        )
        .await
    }

    /// Delay before the next request: the configured delay (or the site's
    /// Crawl-delay when longer) plus random jitter
    fn politeness_delay(&self, robots: &RobotsPolicy) -> Duration {
        let base = robots
            .crawl_delay()
            .map_or(self.config.crawl_delay(), |site| site.max(self.config.crawl_delay()));
        let jitter = if self.config.jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.config.jitter_ms)
        } else {
            0
        };
        base + Duration::from_millis(jitter)
    }

    /// Crawl from a seed URL until the frontier drains, the page cap is reached or
    /// the deadline passes
    #[instrument(skip(self), fields(max_pages = self.config.max_pages))]
    pub async fn crawl(
        &self,
        seed: &str,
        deadline: Option<Instant>,
    ) -> Result<CrawlReport, CrawlError> {
        let seed = CrawlTarget::parse(seed)?;
        let robots = self.robots_for(&seed).await;
        let mut frontier = Frontier::new(seed.clone());

        let max_in_flight = self.config.max_concurrent_fetches.max(1);
        let page_cap = self.config.max_pages;

        let mut tasks: JoinSet<(usize, CrawlTarget, FetchResult)> = JoinSet::new();
        let mut pages: Vec<(usize, FetchResult)> = Vec::new();
        let mut report = CrawlReport::default();
        let mut next_slot = Instant::now();

        info!("Starting crawl of {}", seed.url);

        loop {
            // Dispatch while there is room under both the concurrency bound and the cap
            while tasks.len() < max_in_flight && pages.len() + tasks.len() < page_cap {
                let Some((sequence, target)) = frontier.next() else {
                    break;
                };

                if !robots.allowed(target.url.as_str()) {
                    info!("Skipping {} due to robots.txt rules", target.url);
                    frontier.mark_skipped(&target.normalized);
                    report.skipped.push(target.url.to_string());
                    continue;
                }

                frontier.mark_fetching(&target.normalized);

                // Requests start one politeness delay apart
                let start_at = next_slot.max(Instant::now());
                next_slot = start_at + self.politeness_delay(&robots);

                let fetcher = Arc::clone(&self.fetcher);
                tasks.spawn(async move {
                    tokio::time::sleep_until(start_at).await;
                    let result = fetcher.fetch(target.url.as_str()).await;
                    (sequence, target, result)
                });
            }

            if tasks.is_empty() {
                break;
            }

            let joined = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        warn!(
                            "Job deadline reached, aborting {} in-flight fetches",
                            tasks.len()
                        );
                        tasks.abort_all();
                        break;
                    }
                },
                None => tasks.join_next().await,
            };

            let (sequence, target, result) = match joined {
                Some(Ok(finished)) => finished,
                Some(Err(e)) => {
                    warn!("Crawl fetch task failed: {}", e);
                    report.failed += 1;
                    continue;
                }
                None => break,
            };
            frontier.mark_visited(&target.normalized);

            let Some(html) = result.html.as_deref().filter(|_| result.is_success()) else {
                debug!(
                    "Fetch of {} failed: {}",
                    result.url,
                    result
                        .error
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_default()
                );
                report.failed += 1;
                continue;
            };

            let landed = CrawlTarget::parse(result.landing_url()).unwrap_or_else(|_| target.clone());
            if landed.normalized_host != frontier.seed_host() {
                if sequence == 0 {
                    info!("Seed redirected to {}, crawling that host", landed.url);
                    frontier.rehost(&landed.normalized_host);
                } else {
                    info!("{} redirected off-host to {}, dropping it", target.url, landed.url);
                    report.skipped.push(target.url.to_string());
                    continue;
                }
            }
            if landed.normalized != target.normalized && !frontier.record_landing(&landed) {
                debug!("{} redirected to already visited {}", target.url, landed.url);
                continue;
            }

            if pages.len() + 1 < page_cap {
                match extract_links(html, &landed.url) {
                    Ok(links) => {
                        let mut added = 0;
                        for link in links {
                            if let Ok(target) = CrawlTarget::from_url(link)
                                && frontier.enqueue(target)
                            {
                                added += 1;
                            }
                        }
                        debug!("Queued {} new links from {}", added, result.url);
                    }
                    Err(e) => warn!("Link extraction failed for {}: {}", result.url, e),
                }
            }

            pages.push((sequence, result));
        }

        pages.sort_by_key(|(sequence, _)| *sequence);
        report.pages = pages.into_iter().map(|(_, page)| page).collect();

        info!(
            "Crawl finished: {} pages fetched, {} skipped, {} failed, {} URLs seen",
            report.pages.len(),
            report.skipped.len(),
            report.failed,
            frontier.known()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::testing::StaticPages;

    fn test_config() -> CrawlerConfig {
        CrawlerConfig::builder()
            .crawl_delay_ms(0)
            .jitter_ms(0)
            .respect_robots_txt(false)
            .build()
    }

    fn page(links: &[&str]) -> String {
        let anchors: String = links
            .iter()
            .map(|href| format!("<a href=\"{href}\">link</a>"))
            .collect();
        format!("<html><body><p>Some content.</p>{anchors}</body></html>")
    }

    #[tokio::test]
    async fn test_cycle_fetches_each_page_once() {
        let fetcher = Arc::new(StaticPages::new([
            ("https://example.com/a", page(&["/b"])),
            ("https://example.com/b", page(&["/c", "/a"])),
            ("https://example.com/c", page(&["/a", "/a/", "/b#top"])),
        ]));
        let crawler = Crawler::new(fetcher.clone(), test_config()).unwrap();

        let report = crawler.crawl("https://example.com/a", None).await.unwrap();

        assert_eq!(fetcher.fetched().len(), 3);
        assert_eq!(
            report.urls(),
            vec![
                "https://example.com/a",
                "https://example.com/b",
                "https://example.com/c",
            ]
        );
    }

    #[tokio::test]
    async fn test_never_leaves_seed_host() {
        let fetcher = Arc::new(StaticPages::new([
            (
                "https://example.com/",
                page(&["/one", "https://other.com/x", "https://sub.example.com/y", "/two"]),
            ),
            ("https://example.com/one", page(&[])),
            ("https://example.com/two", page(&[])),
            ("https://other.com/x", page(&[])),
        ]));
        let crawler = Crawler::new(fetcher.clone(), test_config()).unwrap();

        let report = crawler.crawl("https://example.com/", None).await.unwrap();

        assert_eq!(report.pages.len(), 3);
        assert!(
            fetcher
                .fetched()
                .iter()
                .all(|url| url.starts_with("https://example.com/"))
        );
    }

    #[tokio::test]
    async fn test_page_cap() {
        let fetcher = Arc::new(StaticPages::new([
            ("https://example.com/", page(&["/1", "/2", "/3", "/4"])),
            ("https://example.com/1", page(&[])),
            ("https://example.com/2", page(&[])),
            ("https://example.com/3", page(&[])),
            ("https://example.com/4", page(&[])),
        ]));
        let config = CrawlerConfig::builder()
            .max_pages(2)
            .crawl_delay_ms(0)
            .jitter_ms(0)
            .respect_robots_txt(false)
            .build();
        let crawler = Crawler::new(fetcher.clone(), config).unwrap();

        let report = crawler.crawl("https://example.com/", None).await.unwrap();

        assert_eq!(report.pages.len(), 2);
        assert_eq!(fetcher.fetched().len(), 2);
        assert_eq!(report.urls()[0], "https://example.com/");
    }

    #[tokio::test]
    async fn test_robots_disallowed_urls_are_skipped() {
        let fetcher = Arc::new(StaticPages::new([
            ("https://example.com/", page(&["/public", "/private/secret"])),
            ("https://example.com/public", page(&[])),
            ("https://example.com/private/secret", page(&[])),
        ]));
        let robots = RobotsPolicy::from_content(
            "sitedigest",
            b"User-agent: *\nDisallow: /private\n",
        );
        let crawler = Crawler::new(fetcher.clone(), test_config())
            .unwrap()
            .with_robots(robots);

        let report = crawler.crawl("https://example.com/", None).await.unwrap();

        assert_eq!(report.skipped, vec!["https://example.com/private/secret"]);
        assert_eq!(report.pages.len(), 2);
        assert!(!fetcher.fetched().contains(&"https://example.com/private/secret".to_string()));
    }

    #[tokio::test]
    async fn test_failed_fetches_are_counted_not_returned() {
        let fetcher = Arc::new(StaticPages::new([(
            "https://example.com/",
            page(&["/missing", "/also-missing"]),
        )]));
        let crawler = Crawler::new(fetcher, test_config()).unwrap();

        let report = crawler.crawl("https://example.com/", None).await.unwrap();

        assert_eq!(report.pages.len(), 1);
        assert_eq!(report.failed, 2);
    }

    #[tokio::test]
    async fn test_deadline_stops_crawl() {
        let fetcher = Arc::new(
            StaticPages::new([
                ("https://example.com/", page(&["/slow"])),
                ("https://example.com/slow", page(&[])),
            ])
            .with_delay("https://example.com/slow", Duration::from_secs(10)),
        );
        let crawler = Crawler::new(fetcher, test_config()).unwrap();

        let deadline = Instant::now() + Duration::from_millis(300);
        let report = crawler.crawl("https://example.com/", Some(deadline)).await.unwrap();

        assert_eq!(report.urls(), vec!["https://example.com/"]);
    }

    #[tokio::test]
    async fn test_robots_fetched_over_http() {
        let mut server = mockito::Server::new_async().await;
        let _robots = server
            .mock("GET", "/robots.txt")
            .with_status(200)
            .with_body("User-agent: *\nDisallow: /\n")
            .create_async()
            .await;

        let seed = format!("{}/", server.url());
        let fetcher = Arc::new(StaticPages::new([(seed.clone(), page(&[]))]));
        let config = CrawlerConfig::builder()
            .crawl_delay_ms(0)
            .jitter_ms(0)
            .build();
        let crawler = Crawler::new(fetcher.clone(), config).unwrap();

        let report = crawler.crawl(&seed, None).await.unwrap();

        assert!(report.pages.is_empty());
        assert_eq!(report.skipped.len(), 1);
        assert!(fetcher.fetched().is_empty());
    }

    fn static_fetcher() -> Arc<dyn Fetcher> {
        crate::fetcher::build_fetcher(&crate::fetcher::FetchConfig::default()).unwrap()
    }

    async fn html_mock(server: &mut mockito::Server, path: &str, body: String) -> mockito::Mock {
        server
            .mock("GET", path)
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(body)
            .expect(1)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_links_resolve_against_redirect_target() {
        let mut server = mockito::Server::new_async().await;
        let base = server.url();
        let moved = server
            .mock("GET", "/docs")
            .with_status(301)
            .with_header("location", &format!("{base}/docs/"))
            .expect(1)
            .create_async()
            .await;
        let landing = html_mock(&mut server, "/docs/", page(&["intro"])).await;
        let intro = html_mock(&mut server, "/docs/intro", page(&["/docs/", "/docs"])).await;
        let wrong = server.mock("GET", "/intro").expect(0).create_async().await;

        let crawler = Crawler::new(static_fetcher(), test_config()).unwrap();
        let report = crawler.crawl(&format!("{base}/docs"), None).await.unwrap();

        moved.assert_async().await;
        landing.assert_async().await;
        intro.assert_async().await;
        wrong.assert_async().await;
        assert_eq!(report.failed, 0);
        assert_eq!(
            report.urls(),
            vec![format!("{base}/docs"), format!("{base}/docs/intro")]
        );
    }

    #[tokio::test]
    async fn test_off_host_redirect_is_dropped() {
        let mut site = mockito::Server::new_async().await;
        let mut elsewhere = mockito::Server::new_async().await;
        let base = site.url();

        let _home = html_mock(&mut site, "/", page(&["/away"])).await;
        let _away = site
            .mock("GET", "/away")
            .with_status(302)
            .with_header("location", &format!("{}/landing", elsewhere.url()))
            .create_async()
            .await;
        let _landing = html_mock(&mut elsewhere, "/landing", page(&["/secret"])).await;
        let foreign_secret = elsewhere.mock("GET", "/secret").expect(0).create_async().await;
        let local_secret = site.mock("GET", "/secret").expect(0).create_async().await;

        let crawler = Crawler::new(static_fetcher(), test_config()).unwrap();
        let report = crawler.crawl(&format!("{base}/"), None).await.unwrap();

        foreign_secret.assert_async().await;
        local_secret.assert_async().await;
        assert_eq!(report.urls(), vec![format!("{base}/")]);
        assert_eq!(report.skipped, vec![format!("{base}/away")]);
    }

    #[tokio::test]
    async fn test_invalid_seed() {
        let fetcher = Arc::new(StaticPages::new(Vec::<(String, String)>::new()));
        let crawler = Crawler::new(fetcher, test_config()).unwrap();
        assert!(matches!(
            crawler.crawl("ftp://example.com", None).await,
            Err(CrawlError::InvalidSeed(_))
        ));
    }
}
