//! Three independent stores composed by `Repository`: a SQLite vector
//! index, a JSON metadata catalog, and file-per-document content/chunks.

mod connection;
mod content_store;
mod metadata_store;
mod vector_store;

pub use connection::ConnectionProvider;
pub use content_store::ContentStore;
pub use metadata_store::MetadataStore;
pub use vector_store::{cosine_similarity, VectorStore};
