//! Fenced-block and declaration-aware chunking for source-like content.

use super::ChunkingStrategy;
use crate::models::{Chunk, Document, StructuredDocument};
use regex::Regex;
use std::sync::OnceLock;

const DECL_KEYWORDS: &[&str] = &[
    "class", "struct", "interface", "enum", "def", "function", "public", "private", "protected",
    "internal", "static", "namespace", "using", "import",
];

fn declaration_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let alt = DECL_KEYWORDS.join("|");
        Regex::new(&format!(r"(?m)^\s*(?:{alt})\b.*$")).unwrap()
    })
}

pub struct CodeChunkingStrategy {
    chunk_size: usize,
}

impl CodeChunkingStrategy {
    pub fn new(chunk_size: usize) -> Self {
        Self { chunk_size }
    }
}

impl ChunkingStrategy for CodeChunkingStrategy {
    fn can_chunk(&self, document: &Document, _structured: Option<&StructuredDocument>) -> bool {
        let head: String = document.content.chars().take(1000).collect();
        document.content.contains("```") || declaration_line().is_match(&head)
    }

    fn chunk(&self, document: &Document, _structured: Option<&StructuredDocument>) -> Vec<Chunk> {
        let document_id = document.id();
        let source = document.metadata.name.clone();
        let content = &document.content;

        let mut pieces: Vec<(usize, usize, &'static str, String)> = Vec::new(); // (start, end, type, signature)

        let mut pos = 0;
        while let Some(fence_start) = content[pos..].find("```") {
            let abs_start = pos + fence_start;
            if let Some(fence_end_rel) = content[abs_start + 3..].find("```") {
                let abs_end = abs_start + 3 + fence_end_rel + 3;
                pieces.push((abs_start, abs_end, "CodeBlock", String::new()));
                pos = abs_end;
            } else {
                break;
            }
        }

        for m in declaration_line().find_iter(content) {
            if pieces.iter().any(|(s, e, _, _)| m.start() >= *s && m.start() < *e) {
                continue;
            }
            let signature = m.as_str().trim().to_string();
            let block_end = match_brace_block(content, m.end());
            pieces.push((m.start(), block_end, "Definition", signature));
        }

        pieces.sort_by_key(|(s, _, _, _)| *s);

        let mut chunks = Vec::new();
        let mut index = 0u64;
        let mut cursor = 0usize;

        for (start, end, kind, signature) in pieces {
            if start > cursor {
                let text_piece = content[cursor..start].trim();
                if !text_piece.is_empty() {
                    chunks.extend(emit_sized(text_piece, document_id, &source, "CodeText", None, self.chunk_size, &mut index));
                }
            }
            let piece = content[start..end].trim();
            if !piece.is_empty() {
                chunks.extend(emit_sized(piece, document_id, &source, kind, Some(&signature), self.chunk_size, &mut index));
            }
            cursor = end.max(cursor);
        }
        if cursor < content.len() {
            let tail = content[cursor..].trim();
            if !tail.is_empty() {
                chunks.extend(emit_sized(tail, document_id, &source, "CodeText", None, self.chunk_size, &mut index));
            }
        }

        chunks
    }

    fn name(&self) -> &'static str {
        "CodeChunkingStrategy"
    }
}

/// Brace-matches from the first `{` after `start`, skipping string/char
/// literals and line/block comments, returning the index just past the
/// matching `}` (or end of content if unbalanced).
fn match_brace_block(content: &str, start: usize) -> usize {
    let bytes = content.as_bytes();
    let Some(open_rel) = content[start..].find('{') else {
        return content[start..].find('\n').map(|i| start + i).unwrap_or(content.len());
    };
    let mut i = start + open_rel;
    let mut depth = 0i32;
    let mut in_string = false;
    let mut in_char = false;
    let mut in_line_comment = false;
    let mut in_block_comment = false;

    while i < bytes.len() {
        let c = bytes[i] as char;
        if in_line_comment {
            if c == '\n' {
                in_line_comment = false;
            }
        } else if in_block_comment {
            if c == '*' && i + 1 < bytes.len() && bytes[i + 1] == b'/' {
                in_block_comment = false;
                i += 1;
            }
        } else if in_string {
            if c == '\\' {
                i += 1;
            } else if c == '"' {
                in_string = false;
            }
        } else if in_char {
            if c == '\\' {
                i += 1;
            } else if c == '\'' {
                in_char = false;
            }
        } else {
            match c {
                '"' => in_string = true,
                '\'' => in_char = true,
                '/' if i + 1 < bytes.len() && bytes[i + 1] == b'/' => in_line_comment = true,
                '/' if i + 1 < bytes.len() && bytes[i + 1] == b'*' => in_block_comment = true,
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return i + 1;
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }
    content.len()
}

#[allow(clippy::too_many_arguments)]
fn emit_sized(
    text: &str,
    document_id: crate::models::DocumentId,
    source: &str,
    chunk_type: &str,
    signature: Option<&str>,
    chunk_size: usize,
    index: &mut u64,
) -> Vec<Chunk> {
    let mut out = Vec::new();
    if text.len() <= chunk_size {
        out.push(Chunk::new(document_id, *index, text.to_string(), source.to_string(), chunk_type));
        *index += 1;
        return out;
    }

    let header = signature.map(|s| format!("Context: {s}\n\n")).unwrap_or_default();
    let mut buffer = String::new();
    for line in text.lines() {
        if line.len() > chunk_size {
            if !buffer.is_empty() {
                out.push(Chunk::new(document_id, *index, format!("{header}{}", buffer.trim()), source.to_string(), chunk_type));
                *index += 1;
                buffer.clear();
            }
            out.push(Chunk::new(
                document_id,
                *index,
                format!("{header}{line} …(LongLine)"),
                source.to_string(),
                chunk_type,
            ));
            *index += 1;
            continue;
        }
        if buffer.len() + line.len() + 1 > chunk_size && !buffer.is_empty() {
            out.push(Chunk::new(document_id, *index, format!("{header}{}", buffer.trim()), source.to_string(), chunk_type));
            *index += 1;
            buffer.clear();
        }
        buffer.push_str(line);
        buffer.push('\n');
    }
    if !buffer.trim().is_empty() {
        out.push(Chunk::new(document_id, *index, format!("{header}{}", buffer.trim()), source.to_string(), chunk_type));
        *index += 1;
    }
    out
}
