//! SQLite-backed transactional vector index with brute-force cosine search.

use super::connection::ConnectionProvider;
use crate::error::{EngineError, Result};
use crate::models::{Chunk, ChunkId, DocumentId};
use sqlx::Row;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

fn db_fail(e: sqlx::Error) -> EngineError {
    EngineError::StorageFailure(e.to_string())
}

pub struct VectorStore {
    connection: Arc<ConnectionProvider>,
}

impl VectorStore {
    pub fn new(connection: Arc<ConnectionProvider>) -> Self {
        Self { connection }
    }

    /// Groups by document, and for each group: upsert the document row,
    /// delete its prior chunk rows, then batch-insert the new ones — all in
    /// one transaction per document.
    pub async fn add_vectors(&self, document_name: &str, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let pool = self.connection.get_connection()?;
        let document_id = chunks[0].document_id;

        let mut tx = pool.begin().await.map_err(db_fail)?;

        sqlx::query("INSERT OR REPLACE INTO Documents (DocumentId, Name) VALUES (?1, ?2)")
            .bind(document_id.to_string())
            .bind(document_name)
            .execute(&mut *tx)
            .await
            .map_err(db_fail)?;

        sqlx::query("DELETE FROM Chunks WHERE DocumentId = ?1")
            .bind(document_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_fail)?;

        for chunk in chunks {
            if chunk.embedding.is_empty() {
                warn!(chunk_id = %chunk.id, "skipping chunk with empty embedding");
                continue;
            }
            let vector_json = serialize_embedding(&chunk.embedding)?;
            sqlx::query(
                "INSERT INTO Chunks (ChunkId, DocumentId, Content, ChunkIndex, Source, VectorJson) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(chunk.id.to_string())
            .bind(chunk.document_id.to_string())
            .bind(&chunk.content)
            .bind(chunk.chunk_index as i64)
            .bind(&chunk.source)
            .bind(vector_json)
            .execute(&mut *tx)
            .await
            .map_err(db_fail)?;
        }

        tx.commit().await.map_err(db_fail)?;
        Ok(())
    }

    pub async fn remove_vectors(&self, document_id: DocumentId) -> Result<()> {
        let pool = self.connection.get_connection()?;
        let mut tx = pool.begin().await.map_err(db_fail)?;
        sqlx::query("DELETE FROM Chunks WHERE DocumentId = ?1")
            .bind(document_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_fail)?;
        sqlx::query("DELETE FROM Documents WHERE DocumentId = ?1")
            .bind(document_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_fail)?;
        tx.commit().await.map_err(db_fail)?;
        Ok(())
    }

    pub async fn count_for_document(&self, document_id: DocumentId) -> Result<usize> {
        let pool = self.connection.get_connection()?;
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM Chunks WHERE DocumentId = ?1")
            .bind(document_id.to_string())
            .fetch_one(pool)
            .await
            .map_err(db_fail)?;
        Ok(row.0 as usize)
    }

    pub async fn get_chunk_by_id(&self, chunk_id: ChunkId) -> Result<Option<Chunk>> {
        let pool = self.connection.get_connection()?;
        let row = sqlx::query("SELECT * FROM Chunks WHERE ChunkId = ?1")
            .bind(chunk_id.to_string())
            .fetch_optional(pool)
            .await
            .map_err(db_fail)?;
        row.map(row_to_chunk).transpose()
    }

    pub async fn search(&self, query: &[f32], k: usize) -> Result<Vec<(Chunk, f32)>> {
        self.search_in_documents(query, None, k).await
    }

    /// `doc_ids = None` searches the whole store; `Some(&[])` matches no rows.
    pub async fn search_in_documents(
        &self,
        query: &[f32],
        doc_ids: Option<&[DocumentId]>,
        k: usize,
    ) -> Result<Vec<(Chunk, f32)>> {
        if let Some(ids) = doc_ids {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
        }

        let pool = self.connection.get_connection()?;
        let rows = if let Some(ids) = doc_ids {
            let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
            let sql = format!("SELECT * FROM Chunks WHERE DocumentId IN ({placeholders})");
            let mut q = sqlx::query(&sql);
            for id in ids {
                q = q.bind(id.to_string());
            }
            q.fetch_all(pool).await.map_err(db_fail)?
        } else {
            sqlx::query("SELECT * FROM Chunks").fetch_all(pool).await.map_err(db_fail)?
        };

        let mut scored: Vec<(Chunk, f32)> = Vec::with_capacity(rows.len());
        for row in rows {
            let chunk = row_to_chunk(row)?;
            let score = cosine_similarity(query, &chunk.embedding);
            scored.push((chunk, score));
        }

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}

fn row_to_chunk(row: sqlx::sqlite::SqliteRow) -> Result<Chunk> {
    let chunk_id: String = row.get("ChunkId");
    let document_id: String = row.get("DocumentId");
    let content: String = row.get("Content");
    let chunk_index: i64 = row.get("ChunkIndex");
    let source: Option<String> = row.get("Source");
    let vector_json: String = row.get("VectorJson");

    Ok(Chunk {
        id: chunk_id.parse().map_err(|e: uuid::Error| crate::error::EngineError::StorageFailure(e.to_string()))?,
        document_id: document_id.parse().map_err(|e: uuid::Error| crate::error::EngineError::StorageFailure(e.to_string()))?,
        chunk_index: chunk_index as u64,
        content,
        source: source.unwrap_or_default(),
        embedding: deserialize_embedding(&vector_json)?,
        chunk_type: String::new(),
        section_path: String::new(),
        heading_level: None,
    })
}

fn serialize_embedding(embedding: &[f32]) -> Result<String> {
    Ok(serde_json::to_string(embedding)?)
}

fn deserialize_embedding(data: &str) -> Result<Vec<f32>> {
    Ok(serde_json::from_str(data)?)
}

/// `dot(a,b) / (|a||b|)`; 0 on zero-norm or length mismatch.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot_product / (norm_a * norm_b)
}

/// Also exported for use in the HashMap-keyed group-by in `Repository`.
pub(crate) fn group_by_document(chunks: Vec<Chunk>) -> HashMap<DocumentId, Vec<Chunk>> {
    let mut groups: HashMap<DocumentId, Vec<Chunk>> = HashMap::new();
    for chunk in chunks {
        groups.entry(chunk.document_id).or_default().push(chunk);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentId;

    async fn store() -> VectorStore {
        let dir = tempfile::tempdir().unwrap();
        let connection = Arc::new(ConnectionProvider::new(dir.path().join("vectors.db"), dir.path().join("embeddings")));
        connection.initialize().await.unwrap();
        std::mem::forget(dir);
        VectorStore::new(connection)
    }

    #[test]
    fn cosine_well_formedness() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        let c = vec![0.0, 1.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 1.0);
        assert_eq!(cosine_similarity(&a, &c), 0.0);
        assert_eq!(cosine_similarity(&a, &[0.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn add_then_search_roundtrips() {
        let store = store().await;
        let document_id = DocumentId::new();
        let mut chunk = Chunk::new(document_id, 0, "hello world".to_string(), "doc".to_string(), "ParagraphGroup");
        chunk.embedding = vec![1.0, 0.0, 0.0];
        store.add_vectors("doc", &[chunk]).await.unwrap();

        let results = store.search(&[1.0, 0.0, 0.0], 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!((results[0].1 - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn add_vectors_clears_prior_chunks_for_document() {
        let store = store().await;
        let document_id = DocumentId::new();
        let mut first = Chunk::new(document_id, 0, "first".to_string(), "doc".to_string(), "ParagraphGroup");
        first.embedding = vec![1.0, 0.0];
        store.add_vectors("doc", &[first]).await.unwrap();

        let mut second = Chunk::new(document_id, 0, "second".to_string(), "doc".to_string(), "ParagraphGroup");
        second.embedding = vec![0.0, 1.0];
        store.add_vectors("doc", &[second]).await.unwrap();

        assert_eq!(store.count_for_document(document_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn search_in_documents_filters_by_allow_list() {
        let store = store().await;
        let doc_a = DocumentId::new();
        let doc_b = DocumentId::new();
        let mut a = Chunk::new(doc_a, 0, "a".to_string(), "a".to_string(), "ParagraphGroup");
        a.embedding = vec![1.0, 0.0];
        let mut b = Chunk::new(doc_b, 0, "b".to_string(), "b".to_string(), "ParagraphGroup");
        b.embedding = vec![1.0, 0.0];
        store.add_vectors("a", &[a]).await.unwrap();
        store.add_vectors("b", &[b]).await.unwrap();

        let results = store.search_in_documents(&[1.0, 0.0], Some(&[doc_a]), 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.document_id, doc_a);
    }
}
