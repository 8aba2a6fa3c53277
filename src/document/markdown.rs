//! Markdown processor: full AST walk via `pulldown-cmark`.

use super::DocumentProcessor;
use crate::error::{EngineError, Result};
use crate::models::{DocumentElement, ElementType, HeadingStack, StructuredDocument};
use async_trait::async_trait;
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Parser, Tag, TagEnd};

const EXTENSIONS: &[&str] = &["md", "markdown"];

#[derive(Default)]
pub struct MarkdownProcessor;

impl MarkdownProcessor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentProcessor for MarkdownProcessor {
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
        Ok(strip_markdown(&raw))
    }

    fn supports_structured_extraction(&self) -> bool {
        true
    }

    async fn extract_structure(&self, path: &std::path::Path) -> Result<StructuredDocument> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EngineError::not_found("document", path.display().to_string())
            } else {
                EngineError::corrupt(path.display().to_string(), e)
            }
        })?;
        Ok(structure_markdown(&raw))
    }
}

fn strip_markdown(raw: &str) -> String {
    let parser = Parser::new(raw);
    let mut out = String::new();
    for event in parser {
        if let Event::Text(t) | Event::Code(t) = event {
            out.push_str(&t);
            out.push(' ');
        }
    }
    out.trim().to_string()
}

enum Block {
    Heading(u8),
    Paragraph,
    ListItem { ordered: bool },
    CodeBlock { language: String },
    Quote,
    TableCell,
}

/// Walks the event stream, accumulating text per block and rendering tables
/// back to pipe-delimited text with a separator row.
fn structure_markdown(raw: &str) -> StructuredDocument {
    let parser = Parser::new(raw);
    let mut elements = Vec::new();
    let mut stack = HeadingStack::new();
    let mut block_stack: Vec<Block> = Vec::new();
    let mut buf = String::new();
    let mut title: Option<String> = None;

    let mut table_rows: Vec<Vec<String>> = Vec::new();
    let mut table_row: Vec<String> = Vec::new();
    let mut in_table = false;

    for event in parser {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                buf.clear();
                let level_num = heading_level_num(level);
                block_stack.push(Block::Heading(level_num));
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(Block::Heading(level)) = block_stack.pop() {
                    let text = buf.trim().to_string();
                    buf.clear();
                    if title.is_none() {
                        title = Some(text.clone());
                    }
                    stack.push(level, &text);
                    let element_type = match level {
                        1 => ElementType::Heading1,
                        2 => ElementType::Heading2,
                        _ => ElementType::Heading3,
                    };
                    let mut el = DocumentElement::new(element_type, text, stack.path());
                    el.heading_level = Some(level);
                    elements.push(el);
                }
            }
            Event::Start(Tag::Paragraph) => {
                buf.clear();
                block_stack.push(Block::Paragraph);
            }
            Event::End(TagEnd::Paragraph) => {
                block_stack.pop();
                let text = buf.trim().to_string();
                buf.clear();
                if in_table {
                    table_row.push(text);
                } else if !text.is_empty() {
                    elements.push(DocumentElement::new(ElementType::Paragraph, text, stack.path()));
                }
            }
            Event::Start(Tag::Item) => {
                buf.clear();
                let ordered = matches!(block_stack.last(), Some(Block::ListItem { ordered: true }))
                    || false;
                block_stack.push(Block::ListItem { ordered });
            }
            Event::End(TagEnd::Item) => {
                block_stack.pop();
                let text = buf.trim().to_string();
                buf.clear();
                if !text.is_empty() {
                    let mut el =
                        DocumentElement::new(ElementType::ListItem, text, stack.path());
                    el.metadata.insert("is_ordered".to_string(), "false".to_string());
                    elements.push(el);
                }
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                buf.clear();
                let language = match kind {
                    CodeBlockKind::Fenced(lang) => lang.to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                block_stack.push(Block::CodeBlock { language });
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some(Block::CodeBlock { language }) = block_stack.pop() {
                    let text = buf.clone();
                    buf.clear();
                    let mut el =
                        DocumentElement::new(ElementType::CodeBlock, text, stack.path());
                    el.metadata.insert("language".to_string(), language);
                    elements.push(el);
                }
            }
            Event::Start(Tag::BlockQuote(_)) => {
                buf.clear();
                block_stack.push(Block::Quote);
            }
            Event::End(TagEnd::BlockQuote(_)) => {
                block_stack.pop();
                let text = buf.trim().to_string();
                buf.clear();
                if !text.is_empty() {
                    elements.push(DocumentElement::new(ElementType::Quote, text, stack.path()));
                }
            }
            Event::Start(Tag::Table(_)) => {
                in_table = true;
                table_rows.clear();
            }
            Event::End(TagEnd::Table) => {
                in_table = false;
                if !table_rows.is_empty() {
                    let rendered = render_table(&table_rows);
                    elements.push(DocumentElement::new(ElementType::Table, rendered, stack.path()));
                }
            }
            Event::Start(Tag::TableRow) | Event::Start(Tag::TableHead) => {
                table_row = Vec::new();
                block_stack.push(Block::TableCell);
            }
            Event::End(TagEnd::TableRow) | Event::End(TagEnd::TableHead) => {
                block_stack.pop();
                table_rows.push(std::mem::take(&mut table_row));
            }
            Event::Start(Tag::TableCell) => {
                buf.clear();
            }
            Event::End(TagEnd::TableCell) => {
                let text = buf.trim().to_string();
                buf.clear();
                table_row.push(text);
            }
            Event::Text(t) | Event::Code(t) => {
                buf.push_str(&t);
            }
            Event::SoftBreak | Event::HardBreak => {
                buf.push(' ');
            }
            _ => {}
        }
    }

    StructuredDocument { title, elements }
}

fn heading_level_num(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn render_table(rows: &[Vec<String>]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    let mut out = String::new();
    let header = &rows[0];
    out.push_str("| ");
    out.push_str(&header.join(" | "));
    out.push_str(" |\n");
    out.push('|');
    for _ in header {
        out.push_str(" --- |");
    }
    out.push('\n');
    for row in &rows[1..] {
        out.push_str("| ");
        out.push_str(&row.join(" | "));
        out.push_str(" |\n");
    }
    out.trim_end().to_string()
}
