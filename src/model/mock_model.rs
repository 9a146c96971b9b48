//! # Mock Embedding Model for Testing
//!
//! Provides a `MockEmbeddingModel` that implements the `EmbeddingModel` trait for use
//! in tests. Vectors are a hashed bag of words, so texts sharing most of their words
//! land close together and unrelated texts do not, without any API calls.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rig::embeddings::{Embedding, EmbeddingError, EmbeddingModel};

const DIMENSIONS: usize = 256;

/// Deterministic embedding model that counts its calls
#[derive(Debug, Clone, Default)]
pub struct MockEmbeddingModel {
    calls: Arc<AtomicUsize>,
    texts: Arc<AtomicUsize>,
    fail: bool,
}

impl MockEmbeddingModel {
    pub const BATCH_SIZE: usize = 4;

    pub fn new() -> Self {
        Self::default()
    }

    /// A model whose every call fails
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Number of `embed_texts` calls made
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Total number of texts embedded
    pub fn texts_embedded(&self) -> usize {
        self.texts.load(Ordering::SeqCst)
    }

    /// Bag-of-words vector for a text, normalized to unit length
    pub fn vector_for(text: &str) -> Vec<f64> {
        let mut vec = vec![0.0f64; DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            vec[(hasher.finish() % DIMENSIONS as u64) as usize] += 1.0;
        }

        let norm = vec.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            vec.iter_mut().for_each(|v| *v /= norm);
        }
        vec
    }
}

impl EmbeddingModel for MockEmbeddingModel {
    const MAX_DOCUMENTS: usize = Self::BATCH_SIZE;

    fn ndims(&self) -> usize {
        DIMENSIONS
    }

    async fn embed_texts(
        &self,
        texts: impl IntoIterator<Item = String> + Send,
    ) -> Result<Vec<Embedding>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(EmbeddingError::ProviderError(
                "mock model unavailable".to_string(),
            ));
        }

        let embeddings: Vec<Embedding> = texts
            .into_iter()
            .map(|text| Embedding {
                vec: Self::vector_for(&text),
                document: text,
            })
            .collect();
        self.texts.fetch_add(embeddings.len(), Ordering::SeqCst);
        Ok(embeddings)
    }
}
