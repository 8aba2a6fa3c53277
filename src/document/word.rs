//! Word (.docx) processor: reads the OOXML zip container and walks
//! `word/document.xml` with `quick-xml`.

use super::DocumentProcessor;
use crate::error::{EngineError, Result};
use crate::models::{DocumentElement, ElementType, HeadingStack, StructuredDocument};
use async_trait::async_trait;
use quick_xml::events::Event as XmlEvent;
use quick_xml::reader::Reader;
use std::io::Read;

const EXTENSIONS: &[&str] = &["docx"];

#[derive(Default)]
pub struct WordProcessor;

impl WordProcessor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentProcessor for WordProcessor {
    fn supported_extensions(&self) -> &[&str] {
        EXTENSIONS
    }

    async fn extract_text(&self, path: &std::path::Path) -> Result<String> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let paragraphs = read_document_xml(&path)?;
            Ok(paragraphs
                .into_iter()
                .map(|p| p.render_text())
                .collect::<Vec<_>>()
                .join("\n\n"))
        })
        .await
        .map_err(|e| EngineError::DocumentProcessingError(e.to_string()))?
    }

    fn supports_structured_extraction(&self) -> bool {
        true
    }

    async fn extract_structure(&self, path: &std::path::Path) -> Result<StructuredDocument> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let paragraphs = read_document_xml(&path)?;
            Ok(structure_paragraphs(paragraphs))
        })
        .await
        .map_err(|e| EngineError::DocumentProcessingError(e.to_string()))?
    }
}

/// One `<w:p>` element: its runs' concatenated text, any `w:pStyle` id, and
/// whether it's a table cell row (rendered as tab-separated text).
struct DocxParagraph {
    text: String,
    style_id: Option<String>,
    is_list_item: bool,
    table_row: Option<Vec<String>>,
}

impl DocxParagraph {
    fn render_text(&self) -> String {
        if let Some(cells) = &self.table_row {
            cells.join("\t")
        } else {
            self.text.clone()
        }
    }
}

fn read_document_xml(path: &std::path::Path) -> Result<Vec<DocxParagraph>> {
    if !path.exists() {
        return Err(EngineError::not_found("document", path.display().to_string()));
    }
    let file = std::fs::File::open(path)
        .map_err(|e| EngineError::corrupt(path.display().to_string(), e))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| EngineError::corrupt(path.display().to_string(), e))?;

    let mut xml = String::new();
    {
        let mut entry = archive
            .by_name("word/document.xml")
            .map_err(|_| EngineError::corrupt(path.display().to_string(), "missing word/document.xml"))?;
        entry
            .read_to_string(&mut xml)
            .map_err(|e| EngineError::corrupt(path.display().to_string(), e))?;
    }

    Ok(parse_paragraphs(&xml))
}

fn parse_paragraphs(xml: &str) -> Vec<DocxParagraph> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut paragraphs = Vec::new();
    let mut buf = Vec::new();

    let mut in_paragraph = false;
    let mut in_text = false;
    let mut current_text = String::new();
    let mut current_style: Option<String> = None;
    let mut current_is_list = false;
    let mut in_table_row = false;
    let mut current_row: Vec<String> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(XmlEvent::Start(e)) => {
                let name = e.name();
                let local = name.as_ref();
                match local {
                    b"w:p" => {
                        in_paragraph = true;
                        current_text.clear();
                        current_style = None;
                        current_is_list = false;
                    }
                    b"w:t" => in_text = true,
                    b"w:pStyle" => {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"w:val" {
                                current_style =
                                    Some(String::from_utf8_lossy(&attr.value).to_string());
                            }
                        }
                    }
                    b"w:numPr" => current_is_list = true,
                    b"w:tr" => {
                        in_table_row = true;
                        current_row = Vec::new();
                    }
                    _ => {}
                }
            }
            Ok(XmlEvent::Empty(e)) => {
                let local = e.name();
                if local.as_ref() == b"w:pStyle" {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"w:val" {
                            current_style = Some(String::from_utf8_lossy(&attr.value).to_string());
                        }
                    }
                } else if local.as_ref() == b"w:numPr" {
                    current_is_list = true;
                }
            }
            Ok(XmlEvent::Text(e)) => {
                if in_text {
                    current_text.push_str(&e.unescape().unwrap_or_default());
                }
            }
            Ok(XmlEvent::End(e)) => {
                let local = e.name();
                match local.as_ref() {
                    b"w:t" => in_text = false,
                    b"w:p" => {
                        in_paragraph = false;
                        if in_table_row {
                            current_row.push(current_text.clone());
                        } else {
                            paragraphs.push(DocxParagraph {
                                text: current_text.clone(),
                                style_id: current_style.clone(),
                                is_list_item: current_is_list,
                                table_row: None,
                            });
                        }
                    }
                    b"w:tr" => {
                        in_table_row = false;
                        paragraphs.push(DocxParagraph {
                            text: String::new(),
                            style_id: None,
                            is_list_item: false,
                            table_row: Some(std::mem::take(&mut current_row)),
                        });
                    }
                    _ => {}
                }
            }
            Ok(XmlEvent::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    let _ = in_paragraph;
    paragraphs
}

/// Classifies paragraphs into headings via `w:pStyle` id (`Title`,
/// `Subtitle`, `Heading{n}`), falling back to treating unstyled short
/// paragraphs as body text since outline-level/bold-run heuristics require
/// run-property data this parser doesn't retain.
fn structure_paragraphs(paragraphs: Vec<DocxParagraph>) -> StructuredDocument {
    let mut elements = Vec::new();
    let mut stack = HeadingStack::new();
    let mut title = None;

    for p in paragraphs {
        if let Some(cells) = &p.table_row {
            let rendered = cells.join(" | ");
            elements.push(DocumentElement::new(ElementType::Table, rendered, stack.path()));
            continue;
        }
        let text = p.text.trim();
        if text.is_empty() {
            continue;
        }

        let level = p.style_id.as_deref().and_then(style_heading_level);
        if let Some(level) = level {
            if title.is_none() {
                title = Some(text.to_string());
            }
            stack.push(level, text);
            let element_type = match level {
                1 => ElementType::Heading1,
                2 => ElementType::Heading2,
                _ => ElementType::Heading3,
            };
            let mut el = DocumentElement::new(element_type, text.to_string(), stack.path());
            el.heading_level = Some(level);
            elements.push(el);
        } else if p.is_list_item {
            elements.push(DocumentElement::new(
                ElementType::ListItem,
                text.to_string(),
                stack.path(),
            ));
        } else {
            elements.push(DocumentElement::new(
                ElementType::Paragraph,
                text.to_string(),
                stack.path(),
            ));
        }
    }

    StructuredDocument { title, elements }
}

fn style_heading_level(style_id: &str) -> Option<u8> {
    match style_id {
        "Title" => Some(1),
        "Subtitle" => Some(2),
        s if s.starts_with("Heading") => s[7..].parse::<u8>().ok().map(|n| n.min(6)).or(Some(1)),
        _ => None,
    }
}
