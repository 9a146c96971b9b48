//! # Fetcher Configuration Module
//!
//! Strategy selection, concurrency bound, timeouts and user agent for page fetches,
//! with a builder in the same shape as the crawler configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which fetch strategy a job uses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStrategy {
    /// Plain HTTP GET
    #[default]
    Static,

    /// Headless browser render, for JavaScript-driven pages
    Rendered,
}

/// Configuration for fetching pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Static HTTP or rendered fetching
    pub strategy: FetchStrategy,

    /// Maximum number of fetches in flight at once
    pub max_concurrent_fetches: usize,

    /// Per-fetch timeout in seconds
    pub timeout_secs: u64,

    /// Upper bound in seconds on each browser step of a rendered fetch
    pub render_timeout_secs: u64,

    /// Extra wait in milliseconds after navigation before reading the rendered DOM
    pub render_settle_ms: u64,

    /// User agent to use for requests
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            strategy: FetchStrategy::Static,
            max_concurrent_fetches: 5,
            timeout_secs: 30,
            render_timeout_secs: 30,
            render_settle_ms: 500,
            user_agent: format!("sitedigest/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Builder for FetchConfig
#[derive(Debug, Default)]
pub struct FetchConfigBuilder {
    config: FetchConfig,
}

impl FetchConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: FetchConfig::default(),
        }
    }

    /// Set the fetch strategy
    pub fn strategy(mut self, strategy: FetchStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    /// Set the maximum number of concurrent fetches
    pub fn max_concurrent_fetches(mut self, max_concurrent_fetches: usize) -> Self {
        self.config.max_concurrent_fetches = max_concurrent_fetches;
        self
    }

    /// Set the per-fetch timeout in seconds
    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.config.timeout_secs = timeout_secs;
        self
    }

    /// Set the render timeout in seconds
    pub fn render_timeout_secs(mut self, render_timeout_secs: u64) -> Self {
        self.config.render_timeout_secs = render_timeout_secs;
        self
    }

    /// Set the post-navigation settle time in milliseconds
    pub fn render_settle_ms(mut self, render_settle_ms: u64) -> Self {
        self.config.render_settle_ms = render_settle_ms;
        self
    }

    /// Set the user agent to use for requests
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Build the configuration
    pub fn build(self) -> FetchConfig {
        self.config
    }
}

impl FetchConfig {
    /// Create a new builder
    pub fn builder() -> FetchConfigBuilder {
        FetchConfigBuilder::new()
    }

    /// Get the per-fetch timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get the render timeout as a Duration
    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }

    /// Get the render settle time as a Duration
    pub fn render_settle(&self) -> Duration {
        Duration::from_millis(self.render_settle_ms)
    }
}
