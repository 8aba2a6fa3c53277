//! Chunking strategies and their dispatch.

mod code;
mod hierarchical;
mod structured;
mod text;

pub use code::CodeChunkingStrategy;
pub use hierarchical::HierarchicalChunkingStrategy;
pub use structured::StructuredChunkingStrategy;
pub use text::TextChunkingStrategy;

use crate::models::{Chunk, Document, StructuredDocument};

/// A pluggable way to turn a `Document` (± its `StructuredDocument`) into chunks.
pub trait ChunkingStrategy: Send + Sync {
    fn can_chunk(&self, document: &Document, structured: Option<&StructuredDocument>) -> bool;
    fn chunk(&self, document: &Document, structured: Option<&StructuredDocument>) -> Vec<Chunk>;
    fn name(&self) -> &'static str;
}

/// Dispatches to the first applicable strategy in registration order,
/// falling back to `TextChunkingStrategy` if none apply or all return empty.
pub struct ChunkingService {
    strategies: Vec<Box<dyn ChunkingStrategy>>,
    default_strategy: TextChunkingStrategy,
}

impl ChunkingService {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let strategies: Vec<Box<dyn ChunkingStrategy>> = vec![
            Box::new(HierarchicalChunkingStrategy::new(chunk_size, chunk_overlap)),
            Box::new(StructuredChunkingStrategy::new(chunk_size, chunk_overlap)),
            Box::new(CodeChunkingStrategy::new(chunk_size)),
        ];
        Self {
            strategies,
            default_strategy: TextChunkingStrategy::new(chunk_size, chunk_overlap),
        }
    }

    pub fn chunk(&self, document: &Document, structured: Option<&StructuredDocument>) -> Vec<Chunk> {
        for strategy in &self.strategies {
            if strategy.can_chunk(document, structured) {
                let chunks = strategy.chunk(document, structured);
                if !chunks.is_empty() {
                    tracing::debug!(strategy = strategy.name(), count = chunks.len(), "chunking strategy produced chunks");
                    return chunks;
                }
            }
        }
        self.default_strategy.chunk(document, structured)
    }
}
