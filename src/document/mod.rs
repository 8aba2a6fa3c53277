//! Document processors: per-format text and structure extraction.

mod markdown;
mod pdf;
mod text;
mod word;

pub use markdown::MarkdownProcessor;
pub use pdf::PdfProcessor;
pub use text::TextProcessor;
pub use word::WordProcessor;

use crate::error::{EngineError, Result};
use crate::models::StructuredDocument;
use async_trait::async_trait;

/// A format-specific text/structure extractor.
#[async_trait]
pub trait DocumentProcessor: Send + Sync {
    /// File extensions this processor claims, lower-case, without the dot.
    fn supported_extensions(&self) -> &[&str];

    /// Best-effort plain text extraction.
    async fn extract_text(&self, path: &std::path::Path) -> Result<String>;

    /// Whether this processor can produce a `StructuredDocument`.
    fn supports_structured_extraction(&self) -> bool;

    /// Ordered element list mirroring the document's visible structure.
    async fn extract_structure(&self, path: &std::path::Path) -> Result<StructuredDocument> {
        let _ = path;
        Ok(StructuredDocument::default())
    }
}

/// Selects the first registered processor that claims a given extension.
pub struct DocumentProcessorRegistry {
    processors: Vec<Box<dyn DocumentProcessor>>,
}

impl DocumentProcessorRegistry {
    /// Registry pre-populated with the built-in Text/Markdown/PDF/Word processors.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(TextProcessor::default()));
        registry.register(Box::new(MarkdownProcessor::default()));
        registry.register(Box::new(PdfProcessor::default()));
        registry.register(Box::new(WordProcessor::default()));
        registry
    }

    pub fn new() -> Self {
        Self {
            processors: Vec::new(),
        }
    }

    pub fn register(&mut self, processor: Box<dyn DocumentProcessor>) {
        self.processors.push(processor);
    }

    /// Returns the first processor claiming `extension`, case-insensitively.
    pub fn find(&self, extension: &str) -> Option<&dyn DocumentProcessor> {
        let ext = extension.to_lowercase();
        self.processors
            .iter()
            .find(|p| p.supported_extensions().contains(&ext.as_str()))
            .map(|p| p.as_ref())
    }

    /// Resolves the processor for `path`'s extension, or `UnsupportedFormat`.
    pub fn for_path(&self, path: &std::path::Path) -> Result<&dyn DocumentProcessor> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| EngineError::UnsupportedFormat("(no extension)".to_string()))?;
        self.find(ext)
            .ok_or_else(|| EngineError::UnsupportedFormat(ext.to_string()))
    }
}

impl Default for DocumentProcessorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Normalizes a run of whitespace the way every processor's `extract_text` does:
/// collapse interior blank-run noise while preserving paragraph breaks.
pub(crate) fn unify_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;
    for line in text.lines() {
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            blank_run += 1;
            if blank_run <= 1 {
                out.push('\n');
            }
        } else {
            blank_run = 0;
            out.push_str(trimmed);
            out.push('\n');
        }
    }
    out.trim().to_string()
}
