//! Regex-driven Markdown heading detection over raw text, independent of
//! whether a `StructuredDocument` was produced.

use super::text::chunk_text;
use super::ChunkingStrategy;
use crate::models::{Chunk, Document, HeadingStack, StructuredDocument};
use regex::Regex;
use std::sync::OnceLock;

fn heading_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^(#{1,6})\s+(.+)$").unwrap())
}

pub struct StructuredChunkingStrategy {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl StructuredChunkingStrategy {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }
}

impl ChunkingStrategy for StructuredChunkingStrategy {
    fn can_chunk(&self, document: &Document, _structured: Option<&StructuredDocument>) -> bool {
        heading_line().is_match(&document.content)
    }

    fn chunk(&self, document: &Document, _structured: Option<&StructuredDocument>) -> Vec<Chunk> {
        let document_id = document.id();
        let source = document.metadata.name.clone();
        let content = &document.content;

        let matches: Vec<_> = heading_line().find_iter(content).collect();
        if matches.is_empty() {
            return Vec::new();
        }

        let mut chunks = Vec::new();
        let mut index = 0u64;
        let mut stack = HeadingStack::new();

        let preface = content[..matches[0].start()].trim();
        if !preface.is_empty() {
            chunks.push(Chunk::new(document_id, index, preface.to_string(), source.clone(), "Section"));
            index += 1;
        }

        for (i, m) in matches.iter().enumerate() {
            let caps = heading_line().captures(&content[m.start()..m.end()]).unwrap();
            let level = caps[1].len().min(6) as u8;
            let title = caps[2].trim().to_string();
            stack.push(level, &title);
            let section_path = stack.path();

            let section_start = m.end();
            let section_end = matches.get(i + 1).map(|n| n.start()).unwrap_or(content.len());
            let body = content[section_start..section_end].trim();

            let header = format!("Context: {section_path}\n\n");

            if body.is_empty() {
                continue;
            }

            if header.len() + body.len() <= self.chunk_size {
                let mut chunk = Chunk::new(
                    document_id,
                    index,
                    format!("{header}{body}"),
                    source.clone(),
                    "Section",
                )
                .with_section(section_path.clone(), Some(level));
                chunk.chunk_index = index;
                chunks.push(chunk);
                index += 1;
            } else {
                let sub_chunks = chunk_text(body, document_id, &source, self.chunk_size.saturating_sub(header.len()).max(1), self.chunk_overlap);
                for mut sub in sub_chunks {
                    sub.content = format!("{header}{}", sub.content);
                    sub.chunk_index = index;
                    sub.chunk_type = "SectionPart".to_string();
                    sub.section_path = section_path.clone();
                    sub.heading_level = Some(level);
                    chunks.push(sub);
                    index += 1;
                }
            }
        }

        chunks
    }

    fn name(&self) -> &'static str {
        "StructuredChunkingStrategy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentMetadata;

    fn doc(content: &str) -> Document {
        Document {
            metadata: DocumentMetadata::new(
                "doc.md".to_string(),
                "/tmp/doc.md".to_string(),
                "markdown".to_string(),
                content.len() as u64,
            ),
            content: content.to_string(),
            chunks: Vec::new(),
        }
    }

    #[test]
    fn markdown_ingest_retrieve_scenario() {
        let d = doc("# Intro\n\nHello.\n\n## Details\n\nThe answer is 42.");
        let strategy = StructuredChunkingStrategy::new(500, 0);
        assert!(strategy.can_chunk(&d, None));
        let chunks = strategy.chunk(&d, None);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].section_path, "Intro");
        assert_eq!(chunks[0].heading_level, Some(1));
        assert!(chunks[0].content.starts_with("Context: Intro\n\n"));
        assert_eq!(chunks[1].section_path, "Intro / Details");
        assert!(chunks[1].content.contains("42"));
    }

    #[test]
    fn no_headings_cannot_chunk() {
        let d = doc("Just plain text with no markdown headers at all.");
        let strategy = StructuredChunkingStrategy::new(500, 0);
        assert!(!strategy.can_chunk(&d, None));
    }
}
