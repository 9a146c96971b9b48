use std::sync::Arc;

use governor::DefaultDirectRateLimiter;
use rig::embeddings::{Embedding, EmbeddingError, EmbeddingModel};
use tracing::{Instrument, debug_span, info_span};

/// Embedding model whose calls wait on a shared rate limiter
#[derive(Clone)]
pub struct RateLimitedEmbeddingModel<M: EmbeddingModel> {
    model: M,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl<M> RateLimitedEmbeddingModel<M>
where
    M: EmbeddingModel,
{
    pub fn new(model: M, limiter: DefaultDirectRateLimiter) -> Self {
        Self {
            model,
            limiter: Arc::new(limiter),
        }
    }
}

impl<M: EmbeddingModel> EmbeddingModel for RateLimitedEmbeddingModel<M> {
    const MAX_DOCUMENTS: usize = M::MAX_DOCUMENTS;

    fn ndims(&self) -> usize {
        self.model.ndims()
    }

    async fn embed_texts(
        &self,
        texts: impl IntoIterator<Item = String> + Send,
    ) -> Result<Vec<Embedding>, EmbeddingError> {
        self.limiter
            .until_ready()
            .instrument(debug_span!("embedding_limiter"))
            .await;
        self.model
            .embed_texts(texts)
            .instrument(info_span!("embed_sections"))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Embedder;
    use crate::model::mock_model::MockEmbeddingModel;
    use governor::{Quota, RateLimiter};
    use std::num::NonZeroU32;

    #[tokio::test]
    async fn test_rate_limited_model_delegates() {
        let inner = MockEmbeddingModel::new();
        let limiter = RateLimiter::direct(Quota::per_second(NonZeroU32::new(100).unwrap()));
        let model = RateLimitedEmbeddingModel::new(inner.clone(), limiter);

        assert_eq!(model.ndims(), inner.ndims());
        let vectors = model
            .embed(vec!["alpha beta".to_string(), "gamma".to_string()])
            .await
            .unwrap();

        assert_eq!(vectors.len(), 2);
        assert_eq!(inner.calls(), 1);
    }
}
