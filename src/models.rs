//! Core data model shared by every stage of the ingestion and retrieval pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Opaque, globally unique document identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DocumentId {
    type Err = uuid::Error;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Opaque, globally unique chunk identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkId(pub Uuid);

impl ChunkId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ChunkId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ChunkId {
    type Err = uuid::Error;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Document format, sniffed from the file extension at registration/dispatch time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    Text,
    Markdown,
    Pdf,
    Word,
    Code { language: String },
}

impl DocumentFormat {
    pub fn label(&self) -> String {
        match self {
            DocumentFormat::Text => "text".to_string(),
            DocumentFormat::Markdown => "markdown".to_string(),
            DocumentFormat::Pdf => "pdf".to_string(),
            DocumentFormat::Word => "word".to_string(),
            DocumentFormat::Code { language } => format!("code:{language}"),
        }
    }

    /// Sniffs a format from a lower-cased, dot-free file extension. Falls
    /// back to `Text` for anything not recognized as markdown/PDF/Word/code,
    /// mirroring the registry's own extension-claiming processors.
    pub fn from_extension(extension: &str) -> Self {
        match extension.to_lowercase().as_str() {
            "md" | "markdown" => DocumentFormat::Markdown,
            "pdf" => DocumentFormat::Pdf,
            "docx" => DocumentFormat::Word,
            "rs" => DocumentFormat::Code { language: "rust".to_string() },
            "py" => DocumentFormat::Code { language: "python".to_string() },
            "ts" => DocumentFormat::Code { language: "typescript".to_string() },
            "js" => DocumentFormat::Code { language: "javascript".to_string() },
            "go" => DocumentFormat::Code { language: "go".to_string() },
            "java" => DocumentFormat::Code { language: "java".to_string() },
            "c" => DocumentFormat::Code { language: "c".to_string() },
            "cpp" => DocumentFormat::Code { language: "cpp".to_string() },
            _ => DocumentFormat::Text,
        }
    }
}

/// Lightweight, always-loadable-as-a-batch metadata record for a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub id: DocumentId,
    pub name: String,
    pub file_path: String,
    pub date_added: DateTime<Utc>,
    pub document_type: String,
    pub file_size: u64,
    pub is_processed: bool,
    pub is_selected: bool,
    pub has_embeddings: bool,
}

impl DocumentMetadata {
    pub fn new(name: String, file_path: String, document_type: String, file_size: u64) -> Self {
        Self {
            id: DocumentId::new(),
            name,
            file_path,
            date_added: Utc::now(),
            document_type,
            file_size,
            is_processed: false,
            is_selected: false,
            has_embeddings: false,
        }
    }
}

/// A document with its raw content and, once processed, the chunks derived from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    #[serde(flatten)]
    pub metadata: DocumentMetadata,
    pub content: String,
    #[serde(default)]
    pub chunks: Vec<Chunk>,
}

impl Document {
    pub fn id(&self) -> DocumentId {
        self.metadata.id
    }
}

/// A bounded-length passage of a document with its embedding and provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub document_id: DocumentId,
    pub chunk_index: u64,
    pub content: String,
    pub source: String,
    #[serde(default)]
    pub embedding: Vec<f32>,
    pub chunk_type: String,
    #[serde(default)]
    pub section_path: String,
    #[serde(default)]
    pub heading_level: Option<u8>,
}

impl Chunk {
    pub fn new(document_id: DocumentId, chunk_index: u64, content: String, source: String, chunk_type: impl Into<String>) -> Self {
        Self {
            id: ChunkId::new(),
            document_id,
            chunk_index,
            content,
            source,
            embedding: Vec::new(),
            chunk_type: chunk_type.into(),
            section_path: String::new(),
            heading_level: None,
        }
    }

    pub fn with_section(mut self, section_path: String, heading_level: Option<u8>) -> Self {
        self.section_path = section_path;
        self.heading_level = heading_level;
        self
    }
}

/// Type tag for a structured-document element, mirrored from the visible document structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ElementType {
    Heading1,
    Heading2,
    Heading3,
    Paragraph,
    ListItem,
    CodeBlock,
    Quote,
    Table,
}

/// A single element of a `StructuredDocument`, in document order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentElement {
    pub element_type: ElementType,
    pub text: String,
    pub heading_level: Option<u8>,
    pub section_path: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl DocumentElement {
    pub fn new(element_type: ElementType, text: String, section_path: String) -> Self {
        Self {
            element_type,
            text,
            heading_level: None,
            section_path,
            metadata: HashMap::new(),
        }
    }
}

/// An ordered, typed element list produced by a processor capable of parsing structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StructuredDocument {
    pub title: Option<String>,
    pub elements: Vec<DocumentElement>,
}

impl StructuredDocument {
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Maintains a heading stack so `section_path` can be reconstructed without back-pointers.
#[derive(Debug, Default)]
pub struct HeadingStack {
    stack: Vec<(u8, String)>,
}

impl HeadingStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a heading at `level`, popping any entries at or below it first.
    pub fn push(&mut self, level: u8, title: &str) {
        self.stack.retain(|(l, _)| *l < level);
        self.stack.push((level, title.to_string()));
    }

    /// Current joined path, e.g. `"A / B / C"`.
    pub fn path(&self) -> String {
        self.stack
            .iter()
            .map(|(_, t)| t.as_str())
            .collect::<Vec<_>>()
            .join(" / ")
    }
}
