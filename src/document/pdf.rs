//! PDF processor: plain-text extraction via `pdf-extract`, structure via `lopdf`.

use super::DocumentProcessor;
use crate::error::{EngineError, Result};
use crate::models::{DocumentElement, ElementType, HeadingStack, StructuredDocument};
use async_trait::async_trait;

const EXTENSIONS: &[&str] = &["pdf"];

#[derive(Default)]
pub struct PdfProcessor;

impl PdfProcessor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentProcessor for PdfProcessor {
    fn supported_extensions(&self) -> &[&str] {
        EXTENSIONS
    }

    async fn extract_text(&self, path: &std::path::Path) -> Result<String> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || extract_text_blocking(&path))
            .await
            .map_err(|e| EngineError::DocumentProcessingError(e.to_string()))?
    }

    fn supports_structured_extraction(&self) -> bool {
        true
    }

    async fn extract_structure(&self, path: &std::path::Path) -> Result<StructuredDocument> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || extract_structure_blocking(&path))
            .await
            .map_err(|e| EngineError::DocumentProcessingError(e.to_string()))?
    }
}

fn extract_text_blocking(path: &std::path::Path) -> Result<String> {
    if !path.exists() {
        return Err(EngineError::not_found("document", path.display().to_string()));
    }

    let pages = pdf_extract::extract_text_by_pages(path)
        .map_err(|e| EngineError::corrupt(path.display().to_string(), e))?;

    let mut out = String::new();
    for (i, page_text) in pages.iter().enumerate() {
        out.push_str(&format!("--- Page {} ---\n", i + 1));
        out.push_str(page_text.trim());
        out.push('\n');
    }

    if out.trim().is_empty() {
        return Err(EngineError::corrupt(
            path.display().to_string(),
            "PDF contains no extractable text",
        ));
    }
    Ok(out.trim().to_string())
}

/// Per-page paragraph grouping and heading classification.
///
/// A true Y-proximity/font-size grouping needs per-run position data from the
/// content stream; we approximate the documented heading rule (length <= 120,
/// no terminal punctuation) on a per-line basis, which is the signal the rule
/// ultimately discriminates on.
fn extract_structure_blocking(path: &std::path::Path) -> Result<StructuredDocument> {
    if !path.exists() {
        return Err(EngineError::not_found("document", path.display().to_string()));
    }
    let document = lopdf::Document::load(path)
        .map_err(|e| EngineError::corrupt(path.display().to_string(), e))?;

    let mut elements = Vec::new();
    let mut stack = HeadingStack::new();
    let mut title = None;

    for (page_num, _) in document.get_pages() {
        let page_text = match document.extract_text(&[page_num]) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(page_num, error = %e, "failed to extract structure from PDF page");
                elements.push(DocumentElement::new(
                    ElementType::Paragraph,
                    format!("[Error processing page {page_num}]"),
                    stack.path(),
                ));
                continue;
            }
        };

        for paragraph in page_text.split("\n\n") {
            let line = paragraph.trim();
            if line.is_empty() {
                continue;
            }
            let looks_like_heading = line.len() <= 120
                && !line.ends_with(['.', '?', '!', ':'])
                && !line.contains('\n');
            if looks_like_heading {
                let level = if title.is_none() { 1 } else { 2 };
                if title.is_none() {
                    title = Some(line.to_string());
                }
                stack.push(level, line);
                let element_type = match level {
                    1 => ElementType::Heading1,
                    _ => ElementType::Heading2,
                };
                let mut el = DocumentElement::new(element_type, line.to_string(), stack.path());
                el.heading_level = Some(level);
                elements.push(el);
            } else {
                elements.push(DocumentElement::new(
                    ElementType::Paragraph,
                    line.to_string(),
                    stack.path(),
                ));
            }
        }
    }

    Ok(StructuredDocument { title, elements })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let processor = PdfProcessor::new();
        let err = processor
            .extract_text(std::path::Path::new("/no/such/file.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }
}
