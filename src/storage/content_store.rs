//! File-per-document content and chunk-list storage, with a per-document-id
//! lock map so concurrent writers to different documents never block.

use crate::error::{EngineError, Result};
use crate::models::Chunk;
use crate::models::DocumentId;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

fn io_fail(e: std::io::Error) -> EngineError {
    EngineError::StorageFailure(e.to_string())
}

pub struct ContentStore {
    documents_dir: PathBuf,
    embeddings_dir: PathBuf,
    locks: Mutex<HashMap<DocumentId, Arc<Mutex<()>>>>,
}

impl ContentStore {
    pub fn new(documents_dir: impl Into<PathBuf>, embeddings_dir: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            documents_dir: documents_dir.into(),
            embeddings_dir: embeddings_dir.into(),
            locks: Mutex::new(HashMap::new()),
        })
    }

    async fn lock_for(&self, id: DocumentId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(id).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    fn content_path(&self, id: DocumentId) -> PathBuf {
        self.documents_dir.join(format!("{id}.txt"))
    }

    fn embeddings_path(&self, id: DocumentId) -> PathBuf {
        self.embeddings_dir.join(format!("{id}.json"))
    }

    pub async fn load_content(&self, id: DocumentId) -> Result<Option<String>> {
        let guard = self.lock_for(id).await;
        let _lock = guard.lock().await;
        let path = self.content_path(id);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(tokio::fs::read_to_string(path).await.map_err(io_fail)?))
    }

    pub async fn save_content(&self, id: DocumentId, content: &str) -> Result<()> {
        let guard = self.lock_for(id).await;
        let _lock = guard.lock().await;
        tokio::fs::create_dir_all(&self.documents_dir).await.map_err(io_fail)?;
        tokio::fs::write(self.content_path(id), content).await.map_err(io_fail)?;
        Ok(())
    }

    pub async fn delete_content(&self, id: DocumentId) -> Result<()> {
        let guard = self.lock_for(id).await;
        let _lock = guard.lock().await;
        let path = self.content_path(id);
        if path.exists() {
            tokio::fs::remove_file(path).await.map_err(io_fail)?;
        }
        Ok(())
    }

    pub async fn load_embeddings(&self, id: DocumentId) -> Result<Vec<Chunk>> {
        let guard = self.lock_for(id).await;
        let _lock = guard.lock().await;
        let path = self.embeddings_path(id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = tokio::fs::read_to_string(path).await.map_err(io_fail)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub async fn save_embeddings(&self, id: DocumentId, chunks: &[Chunk]) -> Result<()> {
        let guard = self.lock_for(id).await;
        let _lock = guard.lock().await;
        tokio::fs::create_dir_all(&self.embeddings_dir).await.map_err(io_fail)?;
        let content = serde_json::to_string(chunks)?;
        tokio::fs::write(self.embeddings_path(id), content).await.map_err(io_fail)?;
        Ok(())
    }

    pub async fn delete_embeddings(&self, id: DocumentId) -> Result<()> {
        let guard = self.lock_for(id).await;
        let _lock = guard.lock().await;
        let path = self.embeddings_path(id);
        if path.exists() {
            tokio::fs::remove_file(path).await.map_err(io_fail)?;
        }
        Ok(())
    }
}
