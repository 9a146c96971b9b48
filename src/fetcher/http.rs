//! Static HTTP fetch strategy

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, instrument};

use super::{FetchConfig, FetchErrorKind, FetchResult, Fetcher};
use crate::error::Error;

/// Fetches pages with a plain HTTP GET
#[derive(Debug, Clone)]
pub struct StaticFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl StaticFetcher {
    /// Create a fetcher using the configured user agent and timeout
    pub fn new(config: &FetchConfig) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            timeout: config.timeout(),
        })
    }

    fn parse_content_type(headers: &reqwest::header::HeaderMap) -> Option<String> {
        headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| {
                value
                    .split(';')
                    .next()
                    .unwrap_or(value)
                    .trim()
                    .to_ascii_lowercase()
            })
    }

    fn is_html(content_type: &str) -> bool {
        content_type == "text/html" || content_type == "application/xhtml+xml"
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    #[instrument(skip(self), fields(strategy = "static"))]
    async fn fetch(&self, url: &str) -> FetchResult {
        let response = match self.client.get(url).timeout(self.timeout).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("Request to {} failed: {}", url, e);
                return FetchResult::failure(url, FetchErrorKind::from(&e));
            }
        };

        let status = response.status();
        let final_url = response.url().to_string();
        let content_type = Self::parse_content_type(response.headers());

        if !status.is_success() {
            return FetchResult::failure(url, FetchErrorKind::HttpStatus(status.as_u16()))
                .with_status(status.as_u16())
                .with_content_type(content_type);
        }

        if !content_type.as_deref().is_some_and(Self::is_html) {
            let reported = content_type.clone().unwrap_or_else(|| "unknown".to_string());
            return FetchResult::failure(url, FetchErrorKind::NonHtml(reported))
                .with_status(status.as_u16())
                .with_content_type(content_type);
        }

        match response.text().await {
            Ok(html) => FetchResult::success(url, html)
                .with_final_url(final_url)
                .with_status(status.as_u16())
                .with_content_type(content_type),
            Err(e) => FetchResult::failure(url, FetchErrorKind::from(&e))
                .with_status(status.as_u16())
                .with_content_type(content_type),
        }
    }
}
