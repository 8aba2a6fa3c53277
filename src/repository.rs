//! Composes the three stores behind a single doc-centric API.

use crate::document::DocumentProcessorRegistry;
use crate::error::{EngineError, Result};
use crate::models::{Chunk, ChunkId, Document, DocumentFormat, DocumentId, DocumentMetadata};
use crate::storage::{ContentStore, MetadataStore, VectorStore};
use std::path::Path;
use std::sync::Arc;

pub struct Repository {
    metadata: Arc<MetadataStore>,
    content: Arc<ContentStore>,
    vectors: Arc<VectorStore>,
}

impl Repository {
    pub fn new(metadata: Arc<MetadataStore>, content: Arc<ContentStore>, vectors: Arc<VectorStore>) -> Self {
        Self { metadata, content, vectors }
    }

    /// Registers a file ahead of processing: sniffs `document_type` from its
    /// extension via `registry`, then persists metadata (`is_processed` and
    /// `has_embeddings` both false) and raw content. Chunking/embedding is a
    /// separate step performed later against the returned metadata's id.
    pub async fn add_document(&self, path: &Path, registry: &DocumentProcessorRegistry) -> Result<DocumentMetadata> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| EngineError::UnsupportedFormat("(no extension)".to_string()))?;
        registry
            .find(extension)
            .ok_or_else(|| EngineError::UnsupportedFormat(extension.to_string()))?;

        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| EngineError::StorageFailure(e.to_string()))?;
        let document_type = DocumentFormat::from_extension(extension).label();
        let metadata = DocumentMetadata::new(name, path.display().to_string(), document_type, content.len() as u64);

        self.metadata.upsert(metadata.clone()).await?;
        self.content.save_content(metadata.id, &content).await?;
        Ok(metadata)
    }

    /// Persists metadata, raw content, and the chunk list, in that order.
    pub async fn save(&self, document: &Document) -> Result<()> {
        self.metadata.upsert(document.metadata.clone()).await?;
        self.content.save_content(document.id(), &document.content).await?;
        self.content.save_embeddings(document.id(), &document.chunks).await?;
        Ok(())
    }

    /// Deletes content, then the embeddings file, then the catalog entry, so a
    /// failure partway through never leaves content/embeddings orphaned with
    /// no metadata row pointing at them. Vector rows cascade from the
    /// document row and aren't part of that fixed order.
    pub async fn delete(&self, id: DocumentId) -> Result<()> {
        self.content.delete_content(id).await?;
        self.content.delete_embeddings(id).await?;
        self.metadata.delete(id).await?;
        self.vectors.remove_vectors(id).await?;
        Ok(())
    }

    pub async fn load(&self, id: DocumentId) -> Result<Option<Document>> {
        let metadata = match self.metadata.get(id).await? {
            Some(m) => m,
            None => return Ok(None),
        };
        let content = self.content.load_content(id).await?.unwrap_or_default();
        let chunks = self.content.load_embeddings(id).await?;
        Ok(Some(Document { metadata, content, chunks }))
    }

    pub async fn list_metadata(&self) -> Result<Vec<crate::models::DocumentMetadata>> {
        Ok(self.metadata.load_all().await?.into_values().collect())
    }

    /// Vector-store-backed point lookup, the normative variant for a
    /// repository that also exposes filtered similarity search.
    pub async fn get_chunk(&self, chunk_id: ChunkId) -> Result<Option<Chunk>> {
        self.vectors.get_chunk_by_id(chunk_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentMetadata;
    use crate::storage::ConnectionProvider;

    async fn repository() -> Repository {
        let dir = tempfile::tempdir().unwrap();
        let connection = Arc::new(ConnectionProvider::new(dir.path().join("vectors.db"), dir.path().join("embeddings")));
        connection.initialize().await.unwrap();
        let metadata = MetadataStore::new(dir.path().join("library.json"));
        let content = ContentStore::new(dir.path().join("documents"), dir.path().join("embeddings"));
        let vectors = Arc::new(VectorStore::new(connection));
        std::mem::forget(dir);
        Repository::new(metadata, content, vectors)
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let repository = repository().await;
        let metadata = DocumentMetadata::new("doc.txt".to_string(), "/tmp/doc.txt".to_string(), "text".to_string(), 5);
        let id = metadata.id;
        let document = Document { metadata, content: "hello".to_string(), chunks: Vec::new() };
        repository.save(&document).await.unwrap();

        let loaded = repository.load(id).await.unwrap().unwrap();
        assert_eq!(loaded.content, "hello");
    }

    #[tokio::test]
    async fn add_document_registers_unprocessed_metadata_and_content() {
        let repository = repository().await;
        let registry = DocumentProcessorRegistry::with_defaults();
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("notes.md");
        tokio::fs::write(&file_path, "# Title\n\nBody text.").await.unwrap();

        let metadata = repository.add_document(&file_path, &registry).await.unwrap();
        assert_eq!(metadata.document_type, "markdown");
        assert!(!metadata.is_processed);
        assert!(!metadata.has_embeddings);

        let loaded = repository.load(metadata.id).await.unwrap().unwrap();
        assert_eq!(loaded.content, "# Title\n\nBody text.");
    }

    #[tokio::test]
    async fn add_document_rejects_unsupported_extension() {
        let repository = repository().await;
        let registry = DocumentProcessorRegistry::with_defaults();
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("binary.exe");
        tokio::fs::write(&file_path, "not text").await.unwrap();

        let result = repository.add_document(&file_path, &registry).await;
        assert!(matches!(result, Err(EngineError::UnsupportedFormat(_))));
    }

    #[tokio::test]
    async fn delete_removes_all_traces() {
        let repository = repository().await;
        let metadata = DocumentMetadata::new("doc.txt".to_string(), "/tmp/doc.txt".to_string(), "text".to_string(), 5);
        let id = metadata.id;
        let document = Document { metadata, content: "hello".to_string(), chunks: Vec::new() };
        repository.save(&document).await.unwrap();
        repository.delete(id).await.unwrap();
        assert!(repository.load(id).await.unwrap().is_none());
    }
}
