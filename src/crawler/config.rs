//! # Crawler Configuration Module
//!
//! This module provides configuration options for the frontier crawler: page cap,
//! politeness delay, concurrency and robots.txt handling. It uses a builder pattern
//! for flexible configuration.
//!
//! ## Key Components
//!
//! - `CrawlerConfig`: The main configuration struct with crawler parameters
//! - `CrawlerConfigBuilder`: Builder pattern implementation for easier configuration
//!
//! ## Features
//!
//! - Default configurations suitable for polite crawling
//! - Randomized jitter on top of a fixed delay between requests
//! - User-agent customization shared with robots.txt matching

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the crawler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of pages to fetch successfully
    pub max_pages: usize,

    /// Maximum number of fetches the crawl keeps in flight
    pub max_concurrent_fetches: usize,

    /// Fixed delay in milliseconds between dispatched requests
    pub crawl_delay_ms: u64,

    /// Upper bound in milliseconds of the random delay added to each request
    pub jitter_ms: u64,

    /// Whether to respect robots.txt
    pub respect_robots_txt: bool,

    /// Timeout in seconds for fetching robots.txt
    pub robots_timeout_secs: u64,

    /// User agent to use for requests
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: 100,
            max_concurrent_fetches: 5,
            crawl_delay_ms: 1000,
            jitter_ms: 500,
            respect_robots_txt: true,
            robots_timeout_secs: 10,
            user_agent: format!("sitedigest/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Builder for CrawlerConfig
#[derive(Debug, Default)]
pub struct CrawlerConfigBuilder {
    config: CrawlerConfig,
}

impl CrawlerConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: CrawlerConfig::default(),
        }
    }

    /// Set the maximum number of pages to crawl
    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.config.max_pages = max_pages;
        self
    }

    /// Set the maximum number of concurrent fetches
    pub fn max_concurrent_fetches(mut self, max_concurrent_fetches: usize) -> Self {
        self.config.max_concurrent_fetches = max_concurrent_fetches;
        self
    }

    /// Set the fixed delay in milliseconds between requests
    pub fn crawl_delay_ms(mut self, crawl_delay_ms: u64) -> Self {
        self.config.crawl_delay_ms = crawl_delay_ms;
        self
    }

    /// Set the maximum random jitter in milliseconds
    pub fn jitter_ms(mut self, jitter_ms: u64) -> Self {
        self.config.jitter_ms = jitter_ms;
        self
    }

    /// Set whether to respect robots.txt
    pub fn respect_robots_txt(mut self, respect_robots_txt: bool) -> Self {
        self.config.respect_robots_txt = respect_robots_txt;
        self
    }

    /// Set the robots.txt fetch timeout in seconds
    pub fn robots_timeout_secs(mut self, robots_timeout_secs: u64) -> Self {
        self.config.robots_timeout_secs = robots_timeout_secs;
        self
    }

    /// Set the user agent to use for requests
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Build the configuration
    pub fn build(self) -> CrawlerConfig {
        self.config
    }
}

impl CrawlerConfig {
    /// Create a new builder
    pub fn builder() -> CrawlerConfigBuilder {
        CrawlerConfigBuilder::new()
    }

    /// Get the fixed crawl delay as a Duration
    pub fn crawl_delay(&self) -> Duration {
        Duration::from_millis(self.crawl_delay_ms)
    }

    /// Get the robots.txt timeout as a Duration
    pub fn robots_timeout(&self) -> Duration {
        Duration::from_secs(self.robots_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_polite() {
        let config = CrawlerConfig::default();
        assert_eq!(config.max_pages, 100);
        assert_eq!(config.crawl_delay(), Duration::from_secs(1));
        assert_eq!(config.jitter_ms, 500);
        assert!(config.respect_robots_txt);
        assert!(config.user_agent.starts_with("sitedigest/"));
    }

    #[test]
    fn test_builder_overrides() {
        let config = CrawlerConfig::builder()
            .max_pages(2)
            .max_concurrent_fetches(1)
            .crawl_delay_ms(0)
            .jitter_ms(0)
            .respect_robots_txt(false)
            .build();

        assert_eq!(config.max_pages, 2);
        assert_eq!(config.max_concurrent_fetches, 1);
        assert_eq!(config.crawl_delay(), Duration::ZERO);
        assert!(!config.respect_robots_txt);
    }
}
