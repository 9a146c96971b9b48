//! # Embedding Model Module
//!
//! Embedding capability used by the deduplicator, with built-in rate limiting to
//! prevent API quota exhaustion.
//!
//! ## Key Components
//!
//! - `Embedder`: object-safe capability trait the deduplicator depends on
//! - `RateLimitedEmbeddingModel`: A wrapper that adds rate limiting to any embedding model
//! - `EmbeddingConversion`: Utilities for converting between embedding formats
//!
//! Any `rig` embedding model is an `Embedder` through a blanket implementation, so
//! swapping providers does not touch the deduplicator.

use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{Quota, RateLimiter};
use rig::providers::gemini;
use tracing::info;

pub mod embedding;
#[cfg(test)]
pub mod mock_model;
pub mod ratelimited_embedding;

pub use embedding::{EmbedError, Embedder, EmbeddingConversion};
pub use ratelimited_embedding::RateLimitedEmbeddingModel;

/// Environment variable holding the Gemini API key
pub const GEMINI_API_KEY_VAR: &str = "GEMINI_API_KEY";

const EMBEDDING_REQUESTS_PER_MINUTE: u32 = 1000;

/// Rate-limited Gemini text embedding model
pub fn new_gemini_embedding(
    gemini_client: &gemini::Client,
) -> RateLimitedEmbeddingModel<gemini::embedding::EmbeddingModel> {
    let quota = NonZeroU32::new(EMBEDDING_REQUESTS_PER_MINUTE).unwrap_or(NonZeroU32::MIN);
    let embedding_limiter = RateLimiter::direct(Quota::per_minute(quota));
    RateLimitedEmbeddingModel::new(
        gemini_client.embedding_model(gemini::embedding::EMBEDDING_004),
        embedding_limiter,
    )
}

/// Gemini embedder configured from `GEMINI_API_KEY`, if the variable is set
pub fn gemini_embedder_from_env() -> Option<Arc<dyn Embedder>> {
    match std::env::var(GEMINI_API_KEY_VAR) {
        Ok(key) if !key.trim().is_empty() => {
            let gemini_client = gemini::Client::new(key.trim());
            Some(Arc::new(new_gemini_embedding(&gemini_client)))
        }
        _ => {
            info!(
                "{} not set, semantic deduplication is disabled",
                GEMINI_API_KEY_VAR
            );
            None
        }
    }
}
