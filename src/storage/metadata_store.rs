//! Durable `{document_id -> DocumentMetadata}` catalog: rewritten in full
//! under an exclusive lock on every mutation, with an authoritative
//! in-memory cache once loaded.

use crate::error::{EngineError, Result};
use crate::models::{DocumentId, DocumentMetadata};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell, RwLock};

fn io_fail(e: std::io::Error) -> EngineError {
    EngineError::StorageFailure(e.to_string())
}

pub struct MetadataStore {
    catalog_path: PathBuf,
    cache: RwLock<HashMap<DocumentId, DocumentMetadata>>,
    file_lock: Mutex<()>,
    init_lock: OnceCell<()>,
}

impl MetadataStore {
    pub fn new(catalog_path: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            catalog_path: catalog_path.into(),
            cache: RwLock::new(HashMap::new()),
            file_lock: Mutex::new(()),
            init_lock: OnceCell::new(),
        })
    }

    async fn ensure_loaded(&self) -> Result<()> {
        self.init_lock
            .get_or_try_init(|| async {
                if self.catalog_path.exists() {
                    let content = tokio::fs::read_to_string(&self.catalog_path).await.map_err(io_fail)?;
                    let entries: Vec<DocumentMetadata> = if content.trim().is_empty() {
                        Vec::new()
                    } else {
                        serde_json::from_str(&content)?
                    };
                    let mut cache = self.cache.write().await;
                    for entry in entries {
                        cache.insert(entry.id, entry);
                    }
                }
                Ok::<_, crate::error::EngineError>(())
            })
            .await?;
        Ok(())
    }

    pub async fn load_all(&self) -> Result<HashMap<DocumentId, DocumentMetadata>> {
        self.ensure_loaded().await?;
        Ok(self.cache.read().await.clone())
    }

    pub async fn get(&self, id: DocumentId) -> Result<Option<DocumentMetadata>> {
        self.ensure_loaded().await?;
        Ok(self.cache.read().await.get(&id).cloned())
    }

    pub async fn upsert(&self, metadata: DocumentMetadata) -> Result<()> {
        self.ensure_loaded().await?;
        let mut cache = self.cache.write().await;
        cache.insert(metadata.id, metadata);
        let snapshot: Vec<DocumentMetadata> = cache.values().cloned().collect();
        drop(cache);
        self.rewrite(&snapshot).await
    }

    pub async fn delete(&self, id: DocumentId) -> Result<()> {
        self.ensure_loaded().await?;
        let mut cache = self.cache.write().await;
        cache.remove(&id);
        let snapshot: Vec<DocumentMetadata> = cache.values().cloned().collect();
        drop(cache);
        self.rewrite(&snapshot).await
    }

    pub async fn save_all(&self, entries: HashMap<DocumentId, DocumentMetadata>) -> Result<()> {
        self.ensure_loaded().await?;
        let mut cache = self.cache.write().await;
        *cache = entries;
        let snapshot: Vec<DocumentMetadata> = cache.values().cloned().collect();
        drop(cache);
        self.rewrite(&snapshot).await
    }

    async fn rewrite(&self, entries: &[DocumentMetadata]) -> Result<()> {
        let _guard = self.file_lock.lock().await;
        if let Some(parent) = self.catalog_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(io_fail)?;
            }
        }
        let content = serde_json::to_string_pretty(entries)?;
        tokio::fs::write(&self.catalog_path, content).await.map_err(io_fail)?;
        Ok(())
    }
}
