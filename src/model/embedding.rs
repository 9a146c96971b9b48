use async_trait::async_trait;
use rig::embeddings::{Embedding, EmbeddingModel};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::error::Error as CrateError;

/// Errors from the embedding capability
#[derive(Debug, Error)]
pub enum EmbedError {
    /// The model could not be reached or rejected the request
    #[error("embedding model unavailable: {0}")]
    Unavailable(String),

    /// The model answered with the wrong number of vectors
    #[error("embedding model returned {returned} vectors for {expected} texts")]
    CountMismatch { expected: usize, returned: usize },
}

impl From<EmbedError> for CrateError {
    fn from(err: EmbedError) -> Self {
        CrateError::Embedding(err.to_string())
    }
}

/// Turns texts into vectors, one per text, in input order
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbedError>;
}

#[async_trait]
impl<M> Embedder for M
where
    M: EmbeddingModel + 'static,
{
    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbedError> {
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(M::MAX_DOCUMENTS.max(1)) {
            debug!("Embedding batch of {} texts", batch.len());
            let embeddings = self
                .embed_texts(batch.to_vec())
                .await
                .map_err(|e| EmbedError::Unavailable(e.to_string()))?;

            if embeddings.len() != batch.len() {
                return Err(EmbedError::CountMismatch {
                    expected: batch.len(),
                    returned: embeddings.len(),
                });
            }
            vectors.extend(embeddings.iter().map(EmbeddingConversion::to_vec));
        }

        Ok(vectors)
    }
}

/// Helper functions for converting between Embedding and Vec<f32>
pub trait EmbeddingConversion {
    fn to_vec(&self) -> Vec<f32>;
    fn from_vec(vec: Vec<f32>) -> Self;
}

impl EmbeddingConversion for Embedding {
    fn to_vec(&self) -> Vec<f32> {
        self.vec.iter().map(|f| *f as f32).collect()
    }

    fn from_vec(vec: Vec<f32>) -> Self {
        Self {
            vec: vec.into_iter().map(|f| f as f64).collect(),
            document: "".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mock_model::MockEmbeddingModel;

    #[test]
    fn test_embedding_conversion() {
        let original_vec = vec![1.0, 2.0, 3.0];
        let embedding = Embedding::from_vec(original_vec.clone());
        assert_eq!(embedding.to_vec(), original_vec);
    }

    #[tokio::test]
    async fn test_embed_batches_by_model_limit() {
        let model = MockEmbeddingModel::new();
        let texts: Vec<String> = (0..MockEmbeddingModel::BATCH_SIZE * 2 + 1)
            .map(|i| format!("document number {i}"))
            .collect();

        let vectors = model.embed(texts.clone()).await.unwrap();

        assert_eq!(vectors.len(), texts.len());
        assert_eq!(model.calls(), 3);
        assert_eq!(model.texts_embedded(), texts.len());
    }

    #[tokio::test]
    async fn test_embed_failure_is_unavailable() {
        let model = MockEmbeddingModel::failing();
        let err = model.embed(vec!["text".to_string()]).await.unwrap_err();
        assert!(matches!(err, EmbedError::Unavailable(_)));
    }
}
