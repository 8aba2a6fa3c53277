//! Plain-text processor: extraction plus a lightweight structure heuristic.

use super::{unify_whitespace, DocumentProcessor};
use crate::error::{EngineError, Result};
use crate::models::{DocumentElement, ElementType, HeadingStack, StructuredDocument};
use async_trait::async_trait;

const EXTENSIONS: &[&str] = &[
    "txt", "text", "log", "rs", "py", "ts", "js", "go", "java", "c", "cpp",
];

#[derive(Default)]
pub struct TextProcessor;

impl TextProcessor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentProcessor for TextProcessor {
    fn supported_extensions(&self) -> &[&str] {
        EXTENSIONS
    }

    async fn extract_text(&self, path: &std::path::Path) -> Result<String> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EngineError::not_found("document", path.display().to_string())
            } else {
                EngineError::corrupt(path.display().to_string(), e)
            }
        })?;
        Ok(unify_whitespace(&raw))
    }

    fn supports_structured_extraction(&self) -> bool {
        true
    }

    async fn extract_structure(&self, path: &std::path::Path) -> Result<StructuredDocument> {
        let text = self.extract_text(path).await?;
        Ok(structure_plain_text(&text))
    }
}

/// Detects a title line followed by `====`/`----`, splits on blank lines into
/// paragraphs, and recognizes fenced code blocks, `#`-headings, and list items.
fn structure_plain_text(text: &str) -> StructuredDocument {
    let mut elements = Vec::new();
    let mut stack = HeadingStack::new();
    let lines: Vec<&str> = text.lines().collect();

    let mut title = None;
    let mut i = 0;
    if lines.len() >= 2 {
        let sep = lines[1].trim();
        if !lines[0].trim().is_empty() && !sep.is_empty() && sep.chars().all(|c| c == '=') {
            title = Some(lines[0].trim().to_string());
            stack.push(1, lines[0].trim());
            elements.push(
                DocumentElement::new(ElementType::Heading1, lines[0].trim().to_string(), stack.path())
                    .with_level(1),
            );
            i = 2;
        } else if !lines[0].trim().is_empty() && !sep.is_empty() && sep.chars().all(|c| c == '-') {
            title = Some(lines[0].trim().to_string());
            stack.push(2, lines[0].trim());
            elements.push(
                DocumentElement::new(ElementType::Heading2, lines[0].trim().to_string(), stack.path())
                    .with_level(2),
            );
            i = 2;
        }
    }

    let mut paragraph_buf: Vec<&str> = Vec::new();
    let mut in_fence = false;
    let mut fence_buf: Vec<&str> = Vec::new();

    let flush_paragraph = |buf: &mut Vec<&str>, elements: &mut Vec<DocumentElement>, stack: &HeadingStack| {
        if buf.is_empty() {
            return;
        }
        let joined = buf.join("\n");
        buf.clear();
        if joined.trim().is_empty() {
            return;
        }
        let trimmed = joined.trim();
        if trimmed.starts_with('*') || trimmed.starts_with('-') || trimmed.starts_with('+') {
            elements.push(DocumentElement::new(
                ElementType::ListItem,
                trimmed.to_string(),
                stack.path(),
            ));
        } else {
            elements.push(DocumentElement::new(
                ElementType::Paragraph,
                trimmed.to_string(),
                stack.path(),
            ));
        }
    };

    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim();

        if trimmed.starts_with("```") {
            if in_fence {
                fence_buf.push(line);
                elements.push(DocumentElement::new(
                    ElementType::CodeBlock,
                    fence_buf.join("\n"),
                    stack.path(),
                ));
                fence_buf.clear();
                in_fence = false;
            } else {
                flush_paragraph(&mut paragraph_buf, &mut elements, &stack);
                in_fence = true;
                fence_buf.push(line);
            }
            i += 1;
            continue;
        }
        if in_fence {
            fence_buf.push(line);
            i += 1;
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix('#') {
            let level = (trimmed.len() - rest.trim_start_matches('#').len()).min(6) as u8;
            let heading_text = trimmed.trim_start_matches('#').trim().to_string();
            if !heading_text.is_empty() {
                flush_paragraph(&mut paragraph_buf, &mut elements, &stack);
                stack.push(level, &heading_text);
                let element_type = match level {
                    1 => ElementType::Heading1,
                    2 => ElementType::Heading2,
                    _ => ElementType::Heading3,
                };
                elements.push(
                    DocumentElement::new(element_type, heading_text, stack.path()).with_level(level),
                );
                i += 1;
                continue;
            }
        }

        if trimmed.is_empty() {
            flush_paragraph(&mut paragraph_buf, &mut elements, &stack);
        } else {
            paragraph_buf.push(line);
        }
        i += 1;
    }
    flush_paragraph(&mut paragraph_buf, &mut elements, &stack);
    if in_fence && !fence_buf.is_empty() {
        elements.push(DocumentElement::new(
            ElementType::CodeBlock,
            fence_buf.join("\n"),
            stack.path(),
        ));
    }

    StructuredDocument { title, elements }
}

trait WithLevel {
    fn with_level(self, level: u8) -> Self;
}

impl WithLevel for DocumentElement {
    fn with_level(mut self, level: u8) -> Self {
        self.heading_level = Some(level);
        self
    }
}
