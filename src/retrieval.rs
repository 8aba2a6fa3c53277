//! Query-time path: embed once, search filtered by allow-list, threshold and truncate.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::models::{Chunk, DocumentId};
use crate::providers::EmbeddingProvider;
use crate::storage::VectorStore;
use std::sync::Arc;

pub struct RetrievalService {
    embedder: Arc<dyn EmbeddingProvider>,
    vectors: Arc<VectorStore>,
    config: EngineConfig,
}

impl RetrievalService {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, vectors: Arc<VectorStore>, config: EngineConfig) -> Self {
        Self { embedder, vectors, config }
    }

    /// `k <= 0` defaults to `max_retrieved_chunks`. Empty `allowed_doc_ids` always returns empty.
    pub async fn retrieve(&self, query: &str, allowed_doc_ids: &[DocumentId], k: i64) -> Result<Vec<(Chunk, f32)>> {
        if query.trim().is_empty() {
            return Err(EngineError::InvalidArgument("query must not be empty".to_string()));
        }
        if allowed_doc_ids.is_empty() {
            return Ok(Vec::new());
        }

        let k = if k <= 0 { self.config.max_retrieved_chunks } else { k as usize };
        let embedding = self.embedder.embed(query).await?;

        let candidates = self.vectors.search_in_documents(&embedding, Some(allowed_doc_ids), k * 2).await?;

        let mut results: Vec<(Chunk, f32)> = candidates
            .into_iter()
            .filter(|(_, score)| *score >= self.config.min_similarity_score)
            .collect();
        results.truncate(k);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Chunk;
    use crate::providers::MockEmbeddingProvider;
    use crate::storage::ConnectionProvider;

    async fn service(min_similarity: f32) -> (RetrievalService, Arc<VectorStore>) {
        let dir = tempfile::tempdir().unwrap();
        let connection = Arc::new(ConnectionProvider::new(dir.path().join("vectors.db"), dir.path().join("embeddings")));
        connection.initialize().await.unwrap();
        std::mem::forget(dir);
        let vectors = Arc::new(VectorStore::new(connection));
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(MockEmbeddingProvider::new(8));
        let mut config = EngineConfig::default();
        config.min_similarity_score = min_similarity;
        (RetrievalService::new(embedder, vectors.clone(), config), vectors)
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let (service, _) = service(0.0).await;
        let result = service.retrieve("   ", &[DocumentId::new()], 5).await;
        assert!(matches!(result, Err(EngineError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn empty_allow_list_returns_empty() {
        let (service, _) = service(0.0).await;
        let result = service.retrieve("hello", &[], 5).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn retrieves_matching_chunk_within_allow_list() {
        let (service, vectors) = service(-1.0).await;
        let document_id = DocumentId::new();
        let mut chunk = Chunk::new(document_id, 0, "matching content".to_string(), "doc".to_string(), "ParagraphGroup");
        chunk.embedding = service.embedder.embed("matching content").await.unwrap();
        vectors.add_vectors("doc", &[chunk]).await.unwrap();

        let results = service.retrieve("matching content", &[document_id], 0).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn high_similarity_threshold_filters_everything_out() {
        let (service, vectors) = service(0.999).await;
        let document_id = DocumentId::new();
        let mut chunk = Chunk::new(document_id, 0, "something".to_string(), "doc".to_string(), "ParagraphGroup");
        chunk.embedding = vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        vectors.add_vectors("doc", &[chunk]).await.unwrap();

        let results = service.retrieve("totally unrelated query", &[document_id], 5).await.unwrap();
        assert!(results.is_empty());
    }
}
