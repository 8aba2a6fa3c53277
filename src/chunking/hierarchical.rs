//! Hierarchical chunking over a `StructuredDocument`'s elements.

use super::ChunkingStrategy;
use crate::models::{Chunk, Document, DocumentElement, StructuredDocument};

pub struct HierarchicalChunkingStrategy {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl HierarchicalChunkingStrategy {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }
}

impl ChunkingStrategy for HierarchicalChunkingStrategy {
    fn can_chunk(&self, _document: &Document, structured: Option<&StructuredDocument>) -> bool {
        structured.map(|s| !s.is_empty()).unwrap_or(false)
    }

    fn chunk(&self, document: &Document, structured: Option<&StructuredDocument>) -> Vec<Chunk> {
        let Some(structured) = structured else {
            return Vec::new();
        };
        let document_id = document.id();
        let source = document.metadata.name.clone();

        let mut chunks = Vec::new();
        let mut index = 0u64;

        for group in group_by_section(&structured.elements) {
            let header = context_header(&group.section_path);
            let room = self.chunk_size.saturating_sub(header.len());
            if room < 10 {
                tracing::warn!(section_path = %group.section_path, "header leaves < 10 chars of content room, skipping element");
                continue;
            }

            let text = group.text();

            if text.len() <= room {
                let content = format!("{header}{text}");
                let chunk = Chunk::new(document_id, index, content, source.clone(), "Section")
                    .with_section(group.section_path.clone(), group.heading_level);
                chunks.push(chunk);
                index += 1;
            } else {
                for piece in split_with_overlap(&text, room, self.chunk_overlap) {
                    let content = format!("{header}{piece}");
                    let chunk = Chunk::new(document_id, index, content, source.clone(), "SectionPart")
                        .with_section(group.section_path.clone(), group.heading_level);
                    chunks.push(chunk);
                    index += 1;
                }
            }
        }

        chunks
    }

    fn name(&self) -> &'static str {
        "HierarchicalChunkingStrategy"
    }
}

fn context_header(section_path: &str) -> String {
    if section_path.is_empty() {
        String::new()
    } else {
        format!("Context: {section_path}\n\n")
    }
}

struct SectionGroup {
    section_path: String,
    heading_level: Option<u8>,
    texts: Vec<String>,
}

impl SectionGroup {
    fn text(&self) -> String {
        self.texts.join("\n\n")
    }
}

/// Groups elements that share a `section_path` into one unit, so a heading
/// and the body text under it become a single chunk instead of one chunk
/// per node. `section_path` changes exactly at heading boundaries, so a
/// run of equal paths is one section.
fn group_by_section(elements: &[DocumentElement]) -> Vec<SectionGroup> {
    let mut groups: Vec<SectionGroup> = Vec::new();
    for element in elements {
        match groups.last_mut() {
            Some(group) if group.section_path == element.section_path => {
                group.texts.push(element.text.clone());
                if group.heading_level.is_none() {
                    group.heading_level = element.heading_level;
                }
            }
            _ => groups.push(SectionGroup {
                section_path: element.section_path.clone(),
                heading_level: element.heading_level,
                texts: vec![element.text.clone()],
            }),
        }
    }
    groups
}

fn split_with_overlap(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }
    let mut pieces = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + size).min(chars.len());
        let piece: String = chars[start..end].iter().collect();
        pieces.push(piece);
        if end >= chars.len() {
            break;
        }
        start = end.saturating_sub(overlap).max(start + 1);
    }
    pieces
}
