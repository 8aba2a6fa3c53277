//! External collaborators whose interface, not implementation, is in scope.

mod embedding;

pub use embedding::{EmbeddingProvider, HttpEmbeddingProvider, MockEmbeddingProvider};
