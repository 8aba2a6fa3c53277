//! Default paragraph-based chunking, grounded on `ContentChunker::chunk_text`.

use super::ChunkingStrategy;
use crate::models::{Chunk, Document, StructuredDocument};
use regex::Regex;
use std::sync::OnceLock;

fn paragraph_boundary() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\r?\n\s*\r?\n").unwrap())
}

pub struct TextChunkingStrategy {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextChunkingStrategy {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }
}

impl ChunkingStrategy for TextChunkingStrategy {
    fn can_chunk(&self, _document: &Document, _structured: Option<&StructuredDocument>) -> bool {
        true
    }

    fn chunk(&self, document: &Document, _structured: Option<&StructuredDocument>) -> Vec<Chunk> {
        chunk_text(
            &document.content,
            document.id(),
            &document.metadata.name,
            self.chunk_size,
            self.chunk_overlap,
        )
    }

    fn name(&self) -> &'static str {
        "TextChunkingStrategy"
    }
}

/// Splits on blank-line paragraph boundaries, greedily filling a buffer up to
/// `chunk_size`, then seeds the next chunk with the last `chunk_overlap`
/// characters of the flushed chunk.
pub(crate) fn chunk_text(
    content: &str,
    document_id: crate::models::DocumentId,
    source: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<Chunk> {
    let paragraphs: Vec<&str> = paragraph_boundary().split(content.trim()).filter(|p| !p.trim().is_empty()).collect();
    if paragraphs.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut index = 0u64;
    let mut buffer = String::new();

    fn flush(
        buffer: &mut String,
        chunks: &mut Vec<Chunk>,
        index: &mut u64,
        document_id: crate::models::DocumentId,
        source: &str,
    ) {
        let trimmed = buffer.trim();
        if trimmed.is_empty() {
            return;
        }
        chunks.push(Chunk::new(
            document_id,
            *index,
            trimmed.to_string(),
            source.to_string(),
            "ParagraphGroup",
        ));
        *index += 1;
    }

    for paragraph in paragraphs {
        let paragraph = paragraph.trim();
        if buffer.is_empty() {
            buffer.push_str(paragraph);
        } else if buffer.len() + paragraph.len() + 2 <= chunk_size {
            buffer.push_str("\n\n");
            buffer.push_str(paragraph);
        } else {
            flush(&mut buffer, &mut chunks, &mut index, document_id, source);
            let overlap_start = buffer.len().saturating_sub(chunk_overlap);
            let seed = buffer[overlap_start..].to_string();
            buffer = seed;
            if !buffer.is_empty() {
                buffer.push_str("\n\n");
            }
            buffer.push_str(paragraph);
        }
    }
    flush(&mut buffer, &mut chunks, &mut index, document_id, source);

    chunks
}
