//! # Semantic Deduplication Module
//!
//! Removes sections whose content is a near-duplicate of an earlier section, judged
//! by cosine similarity of their embeddings. Without an embedding model the sections
//! pass through untouched.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::model::Embedder;
use crate::section::Section;

/// Default similarity at or above which a section counts as a duplicate
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.85;

/// Greedy first-wins semantic deduplicator
#[derive(Clone)]
pub struct Deduplicator {
    embedder: Option<Arc<dyn Embedder>>,
    threshold: f32,
}

impl Deduplicator {
    pub fn new(embedder: Option<Arc<dyn Embedder>>, threshold: f32) -> Self {
        Self {
            embedder,
            threshold,
        }
    }

    /// Whether an embedding model is available
    pub fn is_enabled(&self) -> bool {
        self.embedder.is_some()
    }

    /// Drop near-duplicate sections, keeping the first of each group in input order
    ///
    /// Sections that already carry an embedding are not re-embedded. If the model
    /// fails, the input comes back unchanged.
    #[instrument(skip(self, sections), fields(count = sections.len()))]
    pub async fn dedupe(&self, mut sections: Vec<Section>) -> Vec<Section> {
        let Some(embedder) = &self.embedder else {
            info!("No embedding model configured, skipping deduplication");
            return sections;
        };
        if sections.len() < 2 {
            return sections;
        }

        let missing: Vec<usize> = sections
            .iter()
            .enumerate()
            .filter(|(_, s)| s.embedding.is_none())
            .map(|(i, _)| i)
            .collect();

        if !missing.is_empty() {
            let texts = missing.iter().map(|&i| sections[i].content.clone()).collect();
            match embedder.embed(texts).await {
                Ok(vectors) => {
                    for (index, vector) in missing.into_iter().zip(vectors) {
                        sections[index].embedding = Some(vector);
                    }
                }
                Err(e) => {
                    warn!("Embedding failed, returning sections without deduplication: {}", e);
                    return sections;
                }
            }
        }

        let total = sections.len();
        let mut kept: Vec<Section> = Vec::with_capacity(total);
        for section in sections {
            let duplicate_of = section.embedding.as_ref().and_then(|candidate| {
                kept.iter()
                    .filter_map(|k| k.embedding.as_ref().map(|e| (k, cosine_similarity(candidate, e))))
                    .find(|(_, similarity)| *similarity >= self.threshold)
            });

            match duplicate_of {
                Some((original, similarity)) => debug!(
                    "Dropping section '{}' from {} (similarity {:.3} to '{}')",
                    section.title, section.url, similarity, original.title
                ),
                None => kept.push(section),
            }
        }

        info!("Deduplicated {} sections down to {}", total, kept.len());
        kept
    }
}

/// Cosine similarity of two vectors, 0.0 when either is zero or lengths differ
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mock_model::MockEmbeddingModel;

    const FOOTER: &str = "Copyright 2024 Example Corp. All rights reserved. Privacy policy and terms of service apply to every page on this site.";

    fn dedup_with(model: &MockEmbeddingModel) -> Deduplicator {
        Deduplicator::new(Some(Arc::new(model.clone())), DEFAULT_SIMILARITY_THRESHOLD)
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_shared_footer_kept_once() {
        let model = MockEmbeddingModel::new();
        let sections = vec![
            Section::new("https://example.com/a", "Alpha", "Rust ownership rules govern how memory is managed without a garbage collector."),
            Section::new("https://example.com/a", "Footer", FOOTER),
            Section::new("https://example.com/b", "Beta", "Async tasks in tokio are scheduled cooperatively across worker threads."),
            Section::new("https://example.com/b", "Footer", FOOTER),
            Section::new("https://example.com/c", "Gamma", "Serde derives serialization code for structs and enums at compile time."),
            Section::new("https://example.com/c", "Footer", FOOTER),
        ];

        let kept = dedup_with(&model).dedupe(sections).await;

        let footers: Vec<&Section> = kept.iter().filter(|s| s.content == FOOTER).collect();
        assert_eq!(footers.len(), 1);
        assert_eq!(footers[0].url, "https://example.com/a");
        let titles: Vec<&str> = kept.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "Footer", "Beta", "Gamma"]);
    }

    #[tokio::test]
    async fn test_dedupe_is_idempotent_and_never_reembeds() {
        let model = MockEmbeddingModel::new();
        let dedup = dedup_with(&model);
        let sections = vec![
            Section::new("https://example.com/a", "One", "The quick brown fox jumps over the lazy dog."),
            Section::new("https://example.com/b", "Two", "The quick brown fox jumps over the lazy dog."),
            Section::new("https://example.com/c", "Three", "Completely unrelated content about databases and indexes."),
        ];

        let once = dedup.dedupe(sections).await;
        let embedded_after_first = model.texts_embedded();
        let twice = dedup.dedupe(once.clone()).await;

        assert_eq!(once, twice);
        assert_eq!(once.len(), 2);
        assert_eq!(embedded_after_first, 3);
        assert_eq!(model.texts_embedded(), 3);
    }

    #[tokio::test]
    async fn test_without_embedder_passes_through() {
        let sections = vec![
            Section::new("https://example.com/a", "A", "same"),
            Section::new("https://example.com/b", "B", "same"),
        ];

        let dedup = Deduplicator::new(None, DEFAULT_SIMILARITY_THRESHOLD);
        assert!(!dedup.is_enabled());
        assert_eq!(dedup.dedupe(sections.clone()).await, sections);
    }

    #[tokio::test]
    async fn test_embedder_failure_returns_input() {
        let model = MockEmbeddingModel::failing();
        let sections = vec![
            Section::new("https://example.com/a", "A", "same text"),
            Section::new("https://example.com/b", "B", "same text"),
        ];

        let result = dedup_with(&model).dedupe(sections.clone()).await;
        assert_eq!(result, sections);
    }
}
