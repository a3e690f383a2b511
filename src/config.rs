//! TOML configuration, read once at startup.
//!
//! ```toml
//! [storage]
//! backend = "sqlite"            # or "memory"
//! db_path = "./data/askdocs.sqlite"
//! upload_dir = "./data/uploads"
//!
//! [chunking]
//! chunk_size = 1000
//! chunk_overlap = 200
//!
//! [retrieval]
//! max_chunks = 5
//!
//! [embedding]
//! provider = "openai"
//! model = "text-embedding-ada-002"
//!
//! [llm]
//! provider = "openai"
//! model = "gpt-3.5-turbo"
//!
//! [server]
//! bind = "127.0.0.1:8000"
//! ```
//!
//! Every section is optional; missing values take the defaults below.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            db_path: default_db_path(),
            upload_dir: default_upload_dir(),
        }
    }
}

fn default_backend() -> String {
    "sqlite".to_string()
}
fn default_db_path() -> PathBuf {
    PathBuf::from("./data/askdocs.sqlite")
}
fn default_upload_dir() -> PathBuf {
    PathBuf::from("./data/uploads")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_tokenizer")]
    pub tokenizer: String,
    #[serde(default)]
    pub tokenizer_path: Option<PathBuf>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            tokenizer: default_tokenizer(),
            tokenizer_path: None,
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}
fn default_tokenizer() -> String {
    "heuristic".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_chunks: default_max_chunks(),
        }
    }
}

fn default_max_chunks() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Base URL; defaults to the provider's public endpoint.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_embedding_provider() -> String {
    "openai".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}
fn default_batch_size() -> usize {
    512
}
fn default_max_retries() -> u32 {
    2
}
fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Prior conversation turns forwarded to the model (3 exchanges).
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            history_turns: default_history_turns(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_llm_provider() -> String {
    "openai".to_string()
}
fn default_llm_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    500
}
fn default_history_turns() -> usize {
    6
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cors_origins: default_cors_origins(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}
fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
    ]
}
fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

impl Config {
    pub fn uses_sqlite(&self) -> bool {
        self.storage.backend == "sqlite"
    }

    /// Check cross-field constraints. Called by [`load_config`].
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            anyhow::bail!("chunking.chunk_size must be > 0");
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            anyhow::bail!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.chunk_overlap,
                self.chunking.chunk_size
            );
        }

        if self.retrieval.max_chunks == 0 {
            anyhow::bail!("retrieval.max_chunks must be >= 1");
        }

        match self.storage.backend.as_str() {
            "sqlite" | "memory" => {}
            other => anyhow::bail!(
                "Unknown storage backend: '{}'. Must be sqlite or memory.",
                other
            ),
        }

        match self.embedding.provider.as_str() {
            "openai" | "ollama" | "disabled" => {}
            other => anyhow::bail!(
                "Unknown embedding provider: '{}'. Must be openai, ollama, or disabled.",
                other
            ),
        }
        if self.embedding.batch_size == 0 {
            anyhow::bail!("embedding.batch_size must be > 0");
        }

        match self.llm.provider.as_str() {
            "openai" | "disabled" => {}
            other => anyhow::bail!(
                "Unknown llm provider: '{}'. Must be openai or disabled.",
                other
            ),
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            anyhow::bail!("llm.temperature must be in [0.0, 2.0]");
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.chunking.chunk_size, 1000);
        assert_eq!(cfg.chunking.chunk_overlap, 200);
        assert_eq!(cfg.retrieval.max_chunks, 5);
        assert_eq!(cfg.embedding.model, "text-embedding-ada-002");
        assert_eq!(cfg.llm.model, "gpt-3.5-turbo");
        assert_eq!(cfg.llm.history_turns, 6);
        assert_eq!(cfg.server.cors_origins.len(), 2);
        assert!(cfg.uses_sqlite());
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk() {
        let cfg: Config = toml::from_str("[chunking]\nchunk_size = 100\nchunk_overlap = 100\n").unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unknown_provider_rejected() {
        let cfg: Config = toml::from_str("[embedding]\nprovider = \"magic\"\n").unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("magic"));
    }

    #[test]
    fn unknown_backend_rejected() {
        let cfg: Config = toml::from_str("[storage]\nbackend = \"chroma\"\n").unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn load_missing_file_fails_with_path() {
        let err = load_config(Path::new("/nonexistent/askdocs.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/askdocs.toml"));
    }
}
