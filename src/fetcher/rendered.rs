//! Headless browser fetch strategy
//!
//! One Chromium instance is launched lazily on the first fetch and shared by every
//! page of the job. Each fetch opens a tab, waits for navigation to settle, reads the
//! rendered DOM and closes the tab.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::{FetchConfig, FetchErrorKind, FetchResult, Fetcher};

/// Fetches pages by rendering them in headless Chromium
pub struct RenderedFetcher {
    browser: Mutex<Option<Arc<Browser>>>,
    user_agent: String,
    render_timeout: Duration,
    settle: Duration,
}

impl RenderedFetcher {
    /// Create a fetcher; the browser is not started until the first fetch
    pub fn new(config: &FetchConfig) -> Self {
        Self {
            browser: Mutex::new(None),
            user_agent: config.user_agent.clone(),
            render_timeout: config.render_timeout(),
            settle: config.render_settle(),
        }
    }

    async fn browser(&self) -> Result<Arc<Browser>, FetchErrorKind> {
        let mut guard = self.browser.lock().await;
        if let Some(browser) = guard.as_ref() {
            return Ok(Arc::clone(browser));
        }

        let browser_config = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg(format!("--user-agent={}", self.user_agent))
            .build()
            .map_err(|e| FetchErrorKind::Network(format!("browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| FetchErrorKind::Network(format!("browser launch failed: {e}")))?;

        tokio::spawn(async move { while handler.next().await.is_some() {} });
        info!("Launched headless browser for rendered fetches");

        let shared = Arc::new(browser);
        *guard = Some(Arc::clone(&shared));
        Ok(shared)
    }

    /// Rendered HTML and the URL the tab ended up on
    async fn render(&self, url: &str) -> Result<(String, Option<String>), FetchErrorKind> {
        let browser = self.browser().await?;

        let page = tokio::time::timeout(self.render_timeout, browser.new_page(url))
            .await
            .map_err(|_| FetchErrorKind::Timeout)?
            .map_err(|e| FetchErrorKind::Network(format!("failed to open page: {e}")))?;

        // Navigation that never settles still leaves a usable DOM
        if tokio::time::timeout(self.render_timeout, page.wait_for_navigation())
            .await
            .is_err()
        {
            debug!("Navigation for {} did not settle within the render timeout", url);
        }

        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }

        let content = tokio::time::timeout(self.render_timeout, page.content()).await;
        let final_url = page.url().await.ok().flatten();

        if let Err(e) = page.close().await {
            debug!(url, error = %e, "Page close error");
        }

        let html = content
            .map_err(|_| FetchErrorKind::Timeout)?
            .map_err(|e| FetchErrorKind::Network(format!("failed to read content: {e}")))?;
        Ok((html, final_url))
    }
}

#[async_trait]
impl Fetcher for RenderedFetcher {
    #[instrument(skip(self), fields(strategy = "rendered"))]
    async fn fetch(&self, url: &str) -> FetchResult {
        match self.render(url).await {
            Ok((html, final_url)) => {
                let result = FetchResult::success(url, html)
                    .with_content_type(Some("text/html".to_string()));
                match final_url {
                    Some(final_url) => result.with_final_url(final_url),
                    None => result,
                }
            }
            Err(kind) => {
                debug!("Rendering {} failed: {}", url, kind);
                FetchResult::failure(url, kind)
            }
        }
    }

    async fn shutdown(&self) {
        let mut guard = self.browser.lock().await;
        if let Some(browser) = guard.take() {
            match Arc::try_unwrap(browser) {
                Ok(mut browser) => {
                    if let Err(e) = browser.close().await {
                        warn!(error = %e, "Browser close error");
                    }
                }
                Err(_) => warn!("Browser still in use at shutdown, leaving it to drop"),
            }
        }
    }
}
