//! End-to-end ingestion pipeline: extraction → structure → chunking →
//! embedding → persistence, serialized one document at a time.

use crate::chunking::ChunkingService;
use crate::config::EngineConfig;
use crate::document::DocumentProcessorRegistry;
use crate::error::{EngineError, Result};
use crate::models::{Chunk, Document, DocumentMetadata, StructuredDocument};
use crate::providers::EmbeddingProvider;
use crate::repository::Repository;
use crate::storage::VectorStore;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

pub struct ProcessingOrchestrator {
    processors: DocumentProcessorRegistry,
    chunking: ChunkingService,
    embedder: Arc<dyn EmbeddingProvider>,
    repository: Arc<Repository>,
    vectors: Arc<VectorStore>,
    config: EngineConfig,
    processing_lock: Mutex<()>,
}

impl ProcessingOrchestrator {
    pub fn new(
        processors: DocumentProcessorRegistry,
        embedder: Arc<dyn EmbeddingProvider>,
        repository: Arc<Repository>,
        vectors: Arc<VectorStore>,
        config: EngineConfig,
    ) -> Self {
        let chunking = ChunkingService::new(config.chunk_size, config.chunk_overlap);
        Self {
            processors,
            chunking,
            embedder,
            repository,
            vectors,
            config,
            processing_lock: Mutex::new(()),
        }
    }

    /// Ingests a single file path end to end, returning the persisted document.
    pub async fn process(&self, path: &Path, metadata: DocumentMetadata) -> Result<Document> {
        let _guard = self.processing_lock.lock().await;

        if !path.exists() {
            return Err(EngineError::not_found("document file", path.display().to_string()));
        }

        let processor = self.processors.for_path(path)?;
        let content = processor.extract_text(path).await?;
        let mut document = Document { metadata, content, chunks: Vec::new() };

        match self.run_pipeline(&document, processor).await {
            Ok(chunks) => {
                document.chunks = chunks;
                document.metadata.is_processed = !document.chunks.is_empty();
                document.metadata.is_selected = true;
                document.metadata.has_embeddings = document.metadata.is_processed;

                self.repository.save(&document).await.map_err(|e| {
                    EngineError::DocumentProcessingError(format!("failed to persist document: {e}"))
                })?;

                if !document.chunks.is_empty() {
                    if let Err(e) = self.vectors.add_vectors(&document.metadata.name, &document.chunks).await {
                        warn!(error = %e, document_id = %document.id(), "vector store insert failed, document remains marked processed");
                    }
                }
                Ok(document)
            }
            Err(e) => {
                error!(error = %e, document_id = %document.id(), "document processing failed");
                document.metadata.is_processed = false;
                document.chunks.clear();
                let _ = self.repository.save(&document).await;
                Err(EngineError::DocumentProcessingError(e.to_string()))
            }
        }
    }

    async fn run_pipeline(&self, document: &Document, processor: &dyn crate::document::DocumentProcessor) -> Result<Vec<Chunk>> {
        let structured = self.extract_structure(document, processor).await;
        let mut chunks = self.chunking.chunk(document, structured.as_ref());

        if chunks.is_empty() {
            chunks = fixed_size_fallback(document, self.config.chunk_size);
        }

        self.embed_chunks(chunks).await
    }

    async fn extract_structure(&self, document: &Document, processor: &dyn crate::document::DocumentProcessor) -> Option<StructuredDocument> {
        if !processor.supports_structured_extraction() {
            return None;
        }
        let path = Path::new(&document.metadata.file_path);
        match processor.extract_structure(path).await {
            Ok(s) if !s.is_empty() => Some(s),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "structured extraction failed, falling back to unstructured chunking");
                None
            }
        }
    }

    async fn embed_chunks(&self, mut chunks: Vec<Chunk>) -> Result<Vec<Chunk>> {
        let batch_size = self.config.embedding_batch_size.max(1);
        for batch in chunks.chunks_mut(batch_size) {
            let futures = batch.iter().map(|chunk| {
                let embedder = self.embedder.clone();
                let text = chunk.content.clone();
                async move { embedder.embed(&text).await }
            });
            let results = futures::future::join_all(futures).await;
            for (chunk, result) in batch.iter_mut().zip(results) {
                match result {
                    Ok(embedding) => chunk.embedding = embedding,
                    Err(e) => {
                        warn!(chunk_id = %chunk.id, error = %e, "embedding failed for chunk, dropping from result");
                        chunk.embedding = Vec::new();
                    }
                }
            }
        }

        let before = chunks.len();
        chunks.retain(|c| !c.embedding.is_empty());
        if chunks.len() < before {
            debug!(dropped = before - chunks.len(), "removed chunks with empty embeddings");
        }
        Ok(chunks)
    }
}

/// Used when no chunking strategy (including the Text default) produces output.
fn fixed_size_fallback(document: &Document, chunk_size: usize) -> Vec<Chunk> {
    let content = document.content.trim();
    if content.is_empty() {
        return Vec::new();
    }

    if content.len() <= 2 * chunk_size {
        return vec![Chunk::new(document.id(), 0, content.to_string(), document.metadata.name.clone(), "FullDocument")];
    }

    let mut chunks = Vec::new();
    let mut index = 0u64;
    let chars: Vec<char> = content.chars().collect();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        let slice: String = chars[start..end].iter().collect::<String>().trim().to_string();
        if !slice.is_empty() {
            chunks.push(Chunk::new(document.id(), index, slice, document.metadata.name.clone(), "FixedSizeFallback"));
            index += 1;
        }
        start = end;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentProcessorRegistry;
    use crate::providers::MockEmbeddingProvider;
    use crate::storage::{ConnectionProvider, ContentStore, MetadataStore};

    async fn orchestrator(dir: &std::path::Path) -> ProcessingOrchestrator {
        let connection = Arc::new(ConnectionProvider::new(dir.join("vectors.db"), dir.join("embeddings")));
        connection.initialize().await.unwrap();
        let metadata_store = MetadataStore::new(dir.join("library.json"));
        let content_store = ContentStore::new(dir.join("documents"), dir.join("embeddings"));
        let vectors = Arc::new(VectorStore::new(connection));
        let repository = Arc::new(Repository::new(metadata_store, content_store, vectors.clone()));
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(MockEmbeddingProvider::new(8));
        ProcessingOrchestrator::new(DocumentProcessorRegistry::with_defaults(), embedder, repository, vectors, EngineConfig::default())
    }

    #[tokio::test]
    async fn processes_plain_text_file_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("note.txt");
        tokio::fs::write(&file_path, "First paragraph of the note.\n\nSecond paragraph continues on.").await.unwrap();

        let orchestrator = orchestrator(dir.path()).await;
        let metadata = DocumentMetadata::new("note.txt".to_string(), file_path.display().to_string(), "text".to_string(), 10);
        let document = orchestrator.process(&file_path, metadata).await.unwrap();

        assert!(document.metadata.is_processed);
        assert!(document.metadata.has_embeddings);
        assert!(!document.chunks.is_empty());
        assert!(document.chunks.iter().all(|c| !c.embedding.is_empty()));
    }

    #[tokio::test]
    async fn missing_file_surfaces_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator(dir.path()).await;
        let missing = dir.path().join("missing.txt");
        let metadata = DocumentMetadata::new("missing.txt".to_string(), missing.display().to_string(), "text".to_string(), 0);
        let result = orchestrator.process(&missing, metadata).await;
        assert!(result.is_err());
    }
}
