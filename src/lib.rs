//! ragforge: a local retrieval-augmented generation engine.
//!
//! Ingests heterogeneous documents (plain text, Markdown, PDF, DOCX, source
//! code), decomposes them into semantically coherent chunks, computes vector
//! embeddings via an external embedding service, persists chunks and vectors
//! durably, and at query time returns the most relevant chunks for prompt
//! augmentation.
//!
//! # Example
//!
//! ```rust,no_run
//! use ragforge::{EngineConfig, ProcessingOrchestrator, DocumentProcessorRegistry, RetrievalService};
//! use ragforge::providers::MockEmbeddingProvider;
//! use ragforge::storage::{ConnectionProvider, ContentStore, MetadataStore, VectorStore};
//! use ragforge::{Repository, DocumentMetadata};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = EngineConfig::default();
//!     let connection = Arc::new(ConnectionProvider::new("./data/vectors.db", "./data/embeddings"));
//!     connection.initialize().await?;
//!     let metadata = MetadataStore::new("./data/library.json");
//!     let content = ContentStore::new("./data/documents", "./data/embeddings");
//!     let vectors = Arc::new(VectorStore::new(connection));
//!     let repository = Arc::new(Repository::new(metadata, content, vectors.clone()));
//!     let embedder = Arc::new(MockEmbeddingProvider::new(384));
//!
//!     let orchestrator = ProcessingOrchestrator::new(
//!         DocumentProcessorRegistry::with_defaults(),
//!         embedder.clone(),
//!         repository.clone(),
//!         vectors.clone(),
//!         config.clone(),
//!     );
//!     let metadata = DocumentMetadata::new("note.txt".into(), "./note.txt".into(), "text".into(), 0);
//!     orchestrator.process(Path::new("./note.txt"), metadata).await?;
//!
//!     let retrieval = RetrievalService::new(embedder, vectors, config);
//!     let doc_ids: Vec<_> = repository.list_metadata().await?.into_iter().map(|m| m.id).collect();
//!     let _hits = retrieval.retrieve("what does the note say?", &doc_ids, 4).await?;
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod config;
pub mod document;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod providers;
pub mod repository;
pub mod retrieval;
pub mod storage;

pub use chunking::{ChunkingService, ChunkingStrategy};
pub use config::EngineConfig;
pub use document::{DocumentProcessor, DocumentProcessorRegistry};
pub use error::{EngineError, Result};
pub use models::{
    Chunk, ChunkId, Document, DocumentElement, DocumentFormat, DocumentId, DocumentMetadata,
    ElementType, HeadingStack, StructuredDocument,
};
pub use orchestrator::ProcessingOrchestrator;
pub use providers::EmbeddingProvider;
pub use repository::Repository;
pub use retrieval::RetrievalService;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(VERSION.starts_with(char::is_numeric));
    }
}
