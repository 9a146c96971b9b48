//! # sitedigest - Clean, deduplicated markdown from a page, sitemap or site
//!
//! This crate turns one seed input into a single aggregated markdown document. It
//! handles the awkward middle of that job: polite crawling, bounded-concurrency
//! fetching, boilerplate removal, HTML-to-markdown conversion, and cross-page
//! semantic deduplication.
//!
//! ## Features
//!
//! - Input resolution for page URLs, sitemaps (remote or local), and markdown link lists
//! - Same-host frontier crawling with robots.txt compliance and politeness delays
//! - Static (reqwest) or rendered (headless Chromium) fetching behind one trait
//! - Readability main-content isolation, allow-list sanitization, and a
//!   length/stopword/link-density boilerplate filter
//! - Embedding-based near-duplicate removal with rate-limited Gemini embeddings
//! - Async API with Tokio
//! - Robust error handling and logging
//!
//! ## Example
//!
//! ```rust,no_run
//! use sitedigest::prelude::{JobOptions, Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = JobOptions::builder().max_pages(20).build();
//!
//!     // Embeddings are used for deduplication when GEMINI_API_KEY is set
//!     let pipeline = Pipeline::new(options)?.with_embedder_from_env();
//!     let document = pipeline.clip("https://example.com/docs/").await?;
//!
//!     println!("{}", document.body);
//!     Ok(())
//! }
//! ```

pub mod aggregator;
pub mod crawler;
pub mod dedup;
mod error;
pub mod extractor;
pub mod fetcher;
pub mod input;
pub mod markdown;
pub mod model;
pub mod pipeline;
pub mod section;
pub mod sitemap;

pub use error::{Error, Result};
pub use pipeline::{build_document, resolve_and_fetch};

/// Re-export of the types most callers need
pub mod prelude {
    pub use crate::aggregator::{AggregatedDocument, JobMetadata};
    pub use crate::crawler::CrawlerConfig;
    pub use crate::error::Error;
    pub use crate::error::Result;
    pub use crate::extractor::{BoilerplateThresholds, ExtractorConfig};
    pub use crate::fetcher::{FetchConfig, FetchStrategy};
    pub use crate::pipeline::{JobOptions, Pipeline, build_document, resolve_and_fetch};
    pub use crate::section::{Provenance, Section};
}
