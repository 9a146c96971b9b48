//! Error types for the sitedigest crate

use thiserror::Error;

/// Result type for sitedigest operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for sitedigest operations
///
/// Only [`Error::InvalidInput`] and [`Error::EmptyContent`] are job-fatal. Every other
/// variant is produced by a single page or stage and is normally logged and absorbed
/// at the page boundary; the variants exist so those stages can use `?` internally.
#[derive(Debug, Error)]
pub enum Error {
    /// The job input could not be classified as a sitemap, URL or link list
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No section survived to aggregation
    #[error("No content could be aggregated")]
    EmptyContent,

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// File system error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Web crawling error
    #[error("Crawl error: {0}")]
    Crawl(String),

    /// Page fetch error
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Content extraction error
    #[error("Extraction error: {0}")]
    Extract(String),

    /// Embedding model error
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}
