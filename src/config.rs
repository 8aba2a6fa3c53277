//! Configuration for the RAG engine

use serde::{Deserialize, Serialize};

/// Tunables for chunking, batching, and retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Soft maximum character length per chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters re-used across adjacent chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Default retrieval top-K.
    #[serde(default = "default_max_retrieved_chunks")]
    pub max_retrieved_chunks: usize,

    /// Lower bound for retrieval similarity.
    #[serde(default = "default_min_similarity_score")]
    pub min_similarity_score: f32,

    /// Concurrent in-flight embeddings per document batch.
    #[serde(default = "default_embedding_batch_size")]
    pub embedding_batch_size: usize,

    /// Provider-side concurrency limit.
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// Embedding/API retry budget.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base retry delay in milliseconds; actual delay is `retry_delay_ms * attempt`.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Base directory under which `documents/`, `vectors/`, `embeddings/` and
    /// the metadata catalog live.
    #[serde(default = "default_base_path")]
    pub base_path: String,
}

fn default_chunk_size() -> usize {
    500
}

fn default_chunk_overlap() -> usize {
    100
}

fn default_max_retrieved_chunks() -> usize {
    4
}

fn default_min_similarity_score() -> f32 {
    0.1
}

fn default_embedding_batch_size() -> usize {
    8
}

fn default_max_concurrent_requests() -> usize {
    4
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_base_path() -> String {
    "./ragforge-data".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            max_retrieved_chunks: default_max_retrieved_chunks(),
            min_similarity_score: default_min_similarity_score(),
            embedding_batch_size: default_embedding_batch_size(),
            max_concurrent_requests: default_max_concurrent_requests(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            base_path: default_base_path(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON, TOML, or YAML file (by extension).
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        let config = match path.as_ref().extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            Some("yaml") | Some("yml") => serde_yml::from_str(&content)?,
            _ => return Err(anyhow::anyhow!("unsupported config file format")),
        };
        Ok(config)
    }

    /// Save configuration to a JSON, TOML, or YAML file (by extension).
    pub fn to_file<P: AsRef<std::path::Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = match path.as_ref().extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("toml") => toml::to_string(self)?,
            Some("yaml") | Some("yml") => serde_yml::to_string(self)?,
            _ => return Err(anyhow::anyhow!("unsupported config file format")),
        };
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.chunk_size == 0 {
            return Err(anyhow::anyhow!("chunk_size must be greater than 0"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(anyhow::anyhow!("chunk_overlap must be smaller than chunk_size"));
        }
        if self.max_retrieved_chunks == 0 {
            return Err(anyhow::anyhow!("max_retrieved_chunks must be greater than 0"));
        }
        if !(0.0..=1.0).contains(&self.min_similarity_score) {
            return Err(anyhow::anyhow!("min_similarity_score must be between 0.0 and 1.0"));
        }
        if self.embedding_batch_size == 0 {
            return Err(anyhow::anyhow!("embedding_batch_size must be greater than 0"));
        }
        if self.max_concurrent_requests == 0 {
            return Err(anyhow::anyhow!("max_concurrent_requests must be greater than 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.max_retrieved_chunks, 4);
    }

    #[test]
    fn test_invalid_overlap_rejected() {
        let mut config = EngineConfig::default();
        config.chunk_overlap = config.chunk_size;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_round_trip_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = EngineConfig::default();
        config.to_file(&path).unwrap();
        let loaded = EngineConfig::from_file(&path).unwrap();
        assert_eq!(loaded.chunk_size, config.chunk_size);
    }
}
