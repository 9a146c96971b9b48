//! # Page Fetcher Module
//!
//! Retrieves the HTML for a URL through one of two interchangeable strategies behind
//! the [`Fetcher`] capability trait:
//!
//! - `StaticFetcher`: a plain HTTP GET with reqwest
//! - `RenderedFetcher`: a headless Chromium page load for JavaScript-driven sites
//!
//! Both are wrapped in a `BoundedFetcher`, which holds the job-wide semaphore that
//! caps how many fetches are in flight at once. A fetch never fails with an error;
//! the outcome, good or bad, is a [`FetchResult`].

mod bounded;
mod config;
mod error;
mod http;
mod rendered;

pub use bounded::BoundedFetcher;
pub use config::{FetchConfig, FetchConfigBuilder, FetchStrategy};
pub use error::FetchErrorKind;
pub use http::StaticFetcher;
pub use rendered::RenderedFetcher;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::error::Error;

/// Fetch strategy capability
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a single URL
    async fn fetch(&self, url: &str) -> FetchResult;

    /// Release anything the strategy holds for the lifetime of a job
    async fn shutdown(&self) {}
}

/// The outcome of fetching one URL
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// The requested URL
    pub url: String,

    /// Where the page was actually served from, when redirects moved it
    pub final_url: Option<String>,

    /// Page HTML, present only on success
    pub html: Option<String>,

    /// Content type reported by the server (without parameters)
    pub content_type: Option<String>,

    /// HTTP status code, when one was received
    pub status: Option<u16>,

    /// Why the fetch failed
    pub error: Option<FetchErrorKind>,

    /// When the fetch completed
    pub fetched_at: DateTime<Utc>,
}

impl FetchResult {
    /// A successful fetch
    pub fn success(url: impl Into<String>, html: String) -> Self {
        Self {
            url: url.into(),
            final_url: None,
            html: Some(html),
            content_type: None,
            status: None,
            error: None,
            fetched_at: Utc::now(),
        }
    }

    /// A failed fetch
    pub fn failure(url: impl Into<String>, error: FetchErrorKind) -> Self {
        Self {
            url: url.into(),
            final_url: None,
            html: None,
            content_type: None,
            status: None,
            error: Some(error),
            fetched_at: Utc::now(),
        }
    }

    /// Record the HTTP status
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Record the content type
    pub fn with_content_type(mut self, content_type: Option<String>) -> Self {
        self.content_type = content_type;
        self
    }

    /// Record the URL the response came from; ignored when it equals the request
    pub fn with_final_url(mut self, final_url: impl Into<String>) -> Self {
        let final_url = final_url.into();
        if final_url != self.url {
            self.final_url = Some(final_url);
        }
        self
    }

    /// The URL the content belongs to: the final URL after redirects, else the request
    pub fn landing_url(&self) -> &str {
        self.final_url.as_deref().unwrap_or(&self.url)
    }

    /// Whether HTML was retrieved
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.html.is_some()
    }
}

/// Build the configured fetch strategy wrapped in the job-wide concurrency bound
pub fn build_fetcher(config: &FetchConfig) -> Result<Arc<dyn Fetcher>, Error> {
    let strategy: Arc<dyn Fetcher> = match config.strategy {
        FetchStrategy::Static => Arc::new(StaticFetcher::new(config)?),
        FetchStrategy::Rendered => Arc::new(RenderedFetcher::new(config)),
    };
    debug!(
        "Using {:?} fetch strategy with {} concurrent fetches",
        config.strategy, config.max_concurrent_fetches
    );
    Ok(Arc::new(BoundedFetcher::new(
        strategy,
        config.max_concurrent_fetches,
    )))
}

/// Fetch a list of URLs concurrently, returning results in input order
///
/// Every URL is spawned at once; the fetcher's own bound decides how many run. When
/// `deadline` passes, unfinished fetches are aborted and dropped from the result.
#[instrument(skip(fetcher, urls), fields(count = urls.len()))]
pub async fn fetch_all(
    fetcher: Arc<dyn Fetcher>,
    urls: &[String],
    deadline: Option<Instant>,
) -> Vec<FetchResult> {
    let mut tasks = JoinSet::new();
    for (index, url) in urls.iter().enumerate() {
        let fetcher = Arc::clone(&fetcher);
        let url = url.clone();
        tasks.spawn(async move { (index, fetcher.fetch(&url).await) });
    }

    let mut results = Vec::with_capacity(urls.len());
    loop {
        let joined = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!(
                        "Job deadline reached with {} fetches outstanding, aborting them",
                        tasks.len()
                    );
                    tasks.abort_all();
                    break;
                }
            },
            None => tasks.join_next().await,
        };

        match joined {
            Some(Ok(indexed)) => results.push(indexed),
            Some(Err(e)) => warn!("Fetch task failed: {}", e),
            None => break,
        }
    }

    results.sort_by_key(|(index, _)| *index);
    let succeeded = results.iter().filter(|(_, r)| r.is_success()).count();
    info!("Fetched {}/{} pages", succeeded, urls.len());
    results.into_iter().map(|(_, result)| result).collect()
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory fetcher for tests

    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Serves fixed HTML per URL and records every fetch
    pub struct StaticPages {
        pages: HashMap<String, String>,
        delays: HashMap<String, Duration>,
        log: Mutex<Vec<String>>,
    }

    impl StaticPages {
        pub fn new<I, U, H>(pages: I) -> Self
        where
            I: IntoIterator<Item = (U, H)>,
            U: Into<String>,
            H: Into<String>,
        {
            Self {
                pages: pages
                    .into_iter()
                    .map(|(u, h)| (u.into(), h.into()))
                    .collect(),
                delays: HashMap::new(),
                log: Mutex::new(Vec::new()),
            }
        }

        pub fn with_delay(mut self, url: &str, delay: Duration) -> Self {
            self.delays.insert(url.to_string(), delay);
            self
        }

        pub fn fetched(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetcher for StaticPages {
        async fn fetch(&self, url: &str) -> FetchResult {
            self.log.lock().unwrap().push(url.to_string());
            if let Some(delay) = self.delays.get(url) {
                tokio::time::sleep(*delay).await;
            }
            match self.pages.get(url) {
                Some(html) => FetchResult::success(url, html.clone())
                    .with_status(200)
                    .with_content_type(Some("text/html".to_string())),
                None => FetchResult::failure(url, FetchErrorKind::HttpStatus(404)).with_status(404),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::StaticPages;
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_fetch_result_success() {
        let result = FetchResult::success("https://example.com", "<p>hi</p>".to_string())
            .with_status(200)
            .with_content_type(Some("text/html".to_string()));

        assert!(result.is_success());
        assert_eq!(result.status, Some(200));
        assert_eq!(result.content_type.as_deref(), Some("text/html"));
        assert_eq!(result.landing_url(), "https://example.com");
    }

    #[test]
    fn test_final_url_only_recorded_when_moved() {
        let same = FetchResult::success("https://example.com/a", String::new())
            .with_final_url("https://example.com/a");
        assert_eq!(same.final_url, None);

        let moved = FetchResult::success("https://example.com/a", String::new())
            .with_final_url("https://example.com/a/");
        assert_eq!(moved.landing_url(), "https://example.com/a/");
        assert_eq!(moved.url, "https://example.com/a");
    }

    #[test]
    fn test_fetch_result_failure() {
        let result = FetchResult::failure("https://example.com", FetchErrorKind::Timeout);
        assert!(!result.is_success());
        assert!(result.html.is_none());
        assert_eq!(result.error, Some(FetchErrorKind::Timeout));
    }

    #[tokio::test]
    async fn test_fetch_all_preserves_input_order() {
        let fetcher = StaticPages::new([
            ("https://example.com/a", "<p>a</p>"),
            ("https://example.com/b", "<p>b</p>"),
            ("https://example.com/c", "<p>c</p>"),
        ])
        .with_delay("https://example.com/a", Duration::from_millis(60))
        .with_delay("https://example.com/b", Duration::from_millis(30));
        let fetcher: Arc<dyn Fetcher> = Arc::new(fetcher);

        let urls = vec![
            "https://example.com/a".to_string(),
            "https://example.com/b".to_string(),
            "https://example.com/c".to_string(),
            "https://example.com/missing".to_string(),
        ];
        let results = fetch_all(fetcher, &urls, None).await;

        let order: Vec<&str> = results.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(order, urls.iter().map(String::as_str).collect::<Vec<_>>());
        assert!(results[0].is_success());
        assert_eq!(results[3].error, Some(FetchErrorKind::HttpStatus(404)));
    }

    #[tokio::test]
    async fn test_fetch_all_stops_at_deadline() {
        let fetcher = StaticPages::new([
            ("https://example.com/fast", "<p>fast</p>"),
            ("https://example.com/slow", "<p>slow</p>"),
        ])
        .with_delay("https://example.com/slow", Duration::from_secs(5));
        let fetcher: Arc<dyn Fetcher> = Arc::new(fetcher);

        let urls = vec![
            "https://example.com/fast".to_string(),
            "https://example.com/slow".to_string(),
        ];
        let deadline = Instant::now() + Duration::from_millis(200);
        let results = fetch_all(fetcher, &urls, Some(deadline)).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url, "https://example.com/fast");
    }

    #[test]
    fn test_build_fetcher_static() {
        let config = FetchConfig::builder().max_concurrent_fetches(3).build();
        assert!(build_fetcher(&config).is_ok());
    }
}
