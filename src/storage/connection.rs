//! Owns the single SQLite connection pool: schema creation and one-shot
//! legacy-embeddings migration.

use crate::error::{EngineError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::sync::OnceCell;
use tracing::{info, warn};

fn db_fail(e: sqlx::Error) -> EngineError {
    EngineError::StorageFailure(e.to_string())
}

fn io_fail(e: std::io::Error) -> EngineError {
    EngineError::StorageFailure(e.to_string())
}

pub struct ConnectionProvider {
    db_path: PathBuf,
    legacy_embeddings_dir: PathBuf,
    pool: OnceCell<SqlitePool>,
}

impl ConnectionProvider {
    pub fn new(db_path: impl Into<PathBuf>, legacy_embeddings_dir: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            legacy_embeddings_dir: legacy_embeddings_dir.into(),
            pool: OnceCell::new(),
        }
    }

    /// Creates schema and triggers legacy migration; idempotent, safe to
    /// call from multiple tasks concurrently (only the first wins).
    pub async fn initialize(&self) -> Result<()> {
        self.pool
            .get_or_try_init(|| async {
                info!(path = %self.db_path.display(), "initializing vector store connection");
                if let Some(parent) = self.db_path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent).map_err(io_fail)?;
                    }
                }

                let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", self.db_path.display()))
                    .map_err(|e| EngineError::StorageFailure(e.to_string()))?
                    .create_if_missing(true)
                    .foreign_keys(true);

                let pool = SqlitePoolOptions::new().max_connections(5).connect_with(options).await.map_err(db_fail)?;

                sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await.map_err(db_fail)?;

                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS Documents (
                        DocumentId TEXT PRIMARY KEY,
                        Name TEXT NOT NULL
                    )
                    "#,
                )
                .execute(&pool)
                .await
                .map_err(db_fail)?;

                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS Chunks (
                        ChunkId TEXT PRIMARY KEY,
                        DocumentId TEXT NOT NULL REFERENCES Documents(DocumentId) ON DELETE CASCADE,
                        Content TEXT NOT NULL,
                        ChunkIndex INTEGER NOT NULL,
                        Source TEXT,
                        VectorJson TEXT NOT NULL
                    )
                    "#,
                )
                .execute(&pool)
                .await
                .map_err(db_fail)?;

                sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_document_id ON Chunks(DocumentId)")
                    .execute(&pool)
                    .await
                    .map_err(db_fail)?;
                sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_chunk_index ON Chunks(ChunkIndex)")
                    .execute(&pool)
                    .await
                    .map_err(db_fail)?;

                Ok::<_, EngineError>(pool)
            })
            .await?;

        self.migrate_legacy_embeddings().await?;
        info!("vector store connection initialized");
        Ok(())
    }

    pub fn get_connection(&self) -> Result<&SqlitePool> {
        self.pool.get().ok_or_else(|| EngineError::StorageFailure("connection provider not initialized".to_string()))
    }

    pub async fn close(&self) {
        if let Some(pool) = self.pool.get() {
            pool.close().await;
        }
    }

    /// One-shot: if `Chunks` is empty and the legacy embeddings directory
    /// contains `*.json`/`*.vectors.json` files, ingest each file's chunk
    /// list in its own transaction.
    async fn migrate_legacy_embeddings(&self) -> Result<()> {
        let pool = self.get_connection()?;

        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM Chunks").fetch_one(pool).await.map_err(db_fail)?;
        if row.0 > 0 {
            return Ok(());
        }
        if !self.legacy_embeddings_dir.is_dir() {
            return Ok(());
        }

        let mut entries = match tokio::fs::read_dir(&self.legacy_embeddings_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "failed to read legacy embeddings directory");
                return Ok(());
            }
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if !is_legacy_embeddings_file(&path) {
                continue;
            }
            if let Err(e) = migrate_one_file(pool, &path).await {
                warn!(path = %path.display(), error = %e, "skipping legacy embeddings file");
            }
        }
        Ok(())
    }
}

fn is_legacy_embeddings_file(path: &Path) -> bool {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n,
        None => return false,
    };
    name.ends_with(".vectors.json") || name.ends_with(".json")
}

async fn migrate_one_file(pool: &SqlitePool, path: &Path) -> Result<()> {
    let stem = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.trim_end_matches(".vectors.json").trim_end_matches(".json").to_string())
        .unwrap_or_default();

    let content = tokio::fs::read_to_string(path).await.map_err(io_fail)?;
    let chunks: Vec<crate::models::Chunk> = serde_json::from_str(&content)?;
    if chunks.is_empty() {
        return Ok(());
    }

    let document_id = chunks[0].document_id;
    let mut tx = pool.begin().await.map_err(db_fail)?;

    sqlx::query("INSERT OR IGNORE INTO Documents (DocumentId, Name) VALUES (?1, ?2)")
        .bind(document_id.to_string())
        .bind(&stem)
        .execute(&mut *tx)
        .await
        .map_err(db_fail)?;

    for chunk in &chunks {
        if chunk.embedding.is_empty() {
            continue;
        }
        let vector_json = serde_json::to_string(&chunk.embedding)?;
        sqlx::query(
            "INSERT OR REPLACE INTO Chunks (ChunkId, DocumentId, Content, ChunkIndex, Source, VectorJson) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
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
    info!(path = %path.display(), count = chunks.len(), "migrated legacy embeddings file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn initialize_creates_schema() {
        let dir = tempfile::tempdir().unwrap();
        let provider = ConnectionProvider::new(dir.path().join("vectors.db"), dir.path().join("embeddings"));
        provider.initialize().await.unwrap();
        let pool = provider.get_connection().unwrap();
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM Documents").fetch_one(pool).await.unwrap();
        assert_eq!(row.0, 0);
    }

    #[tokio::test]
    async fn migration_ingests_legacy_json_files() {
        let dir = tempfile::tempdir().unwrap();
        let embeddings_dir = dir.path().join("embeddings");
        std::fs::create_dir_all(&embeddings_dir).unwrap();

        let document_id = crate::models::DocumentId::new();
        let chunk = crate::models::Chunk::new(document_id, 0, "hello".to_string(), "doc".to_string(), "ParagraphGroup");
        let mut chunk = chunk;
        chunk.embedding = vec![0.1, 0.2, 0.3];
        let file_path = embeddings_dir.join(format!("{document_id}.json"));
        std::fs::write(&file_path, serde_json::to_string(&vec![chunk]).unwrap()).unwrap();

        let provider = ConnectionProvider::new(dir.path().join("vectors.db"), embeddings_dir);
        provider.initialize().await.unwrap();

        let pool = provider.get_connection().unwrap();
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM Chunks").fetch_one(pool).await.unwrap();
        assert_eq!(row.0, 1);
        let doc_row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM Documents WHERE DocumentId = ?1")
            .bind(document_id.to_string())
            .fetch_one(pool)
            .await
            .unwrap();
        assert_eq!(doc_row.0, 1);
    }
}
