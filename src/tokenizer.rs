//! Token counting for chunk budgets.
//!
//! The chunker never measures text by itself; it asks a [`Tokenizer`] so that
//! chunk-size and overlap budgets are always counted the same way.
//!
//! | Config value | Implementation |
//! |---|---|
//! | `"heuristic"` | [`HeuristicTokenizer`], ~4 characters per token |
//! | `"whitespace"` | [`WhitespaceTokenizer`], one token per word |
//! | `"huggingface"` | `HfTokenizer`, exact counts from a `tokenizer.json` (feature `hf-tokenizer`) |

use anyhow::{bail, Result};
use std::sync::Arc;

use crate::config::ChunkingConfig;

/// Counts tokens in a span of text.
pub trait Tokenizer: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;
    /// Number of tokens `text` encodes to.
    fn count_tokens(&self, text: &str) -> usize;
}

/// Approximate chars-per-token ratio for English text with BPE vocabularies.
const CHARS_PER_TOKEN: usize = 4;

/// Character-ratio estimate. Needs no model files.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicTokenizer;

impl Tokenizer for HeuristicTokenizer {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn count_tokens(&self, text: &str) -> usize {
        text.chars().count().div_ceil(CHARS_PER_TOKEN)
    }
}

/// One token per whitespace-separated word.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn name(&self) -> &str {
        "whitespace"
    }

    fn count_tokens(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

/// Exact counts using a Hugging Face `tokenizer.json`.
#[cfg(feature = "hf-tokenizer")]
pub struct HfTokenizer {
    inner: tokenizers::Tokenizer,
}

#[cfg(feature = "hf-tokenizer")]
impl HfTokenizer {
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let inner = tokenizers::Tokenizer::from_file(path).map_err(|e| {
            anyhow::anyhow!("Failed to load tokenizer {}: {}", path.display(), e)
        })?;
        Ok(Self { inner })
    }
}

#[cfg(feature = "hf-tokenizer")]
impl Tokenizer for HfTokenizer {
    fn name(&self) -> &str {
        "huggingface"
    }

    fn count_tokens(&self, text: &str) -> usize {
        match self.inner.encode(text, false) {
            Ok(encoding) => encoding.get_ids().len(),
            Err(e) => {
                tracing::warn!(error = %e, "tokenizer encode failed, using heuristic count");
                HeuristicTokenizer.count_tokens(text)
            }
        }
    }
}

/// Build the tokenizer named by `[chunking].tokenizer`.
pub fn create_tokenizer(config: &ChunkingConfig) -> Result<Arc<dyn Tokenizer>> {
    match config.tokenizer.as_str() {
        "heuristic" => Ok(Arc::new(HeuristicTokenizer)),
        "whitespace" => Ok(Arc::new(WhitespaceTokenizer)),
        #[cfg(feature = "hf-tokenizer")]
        "huggingface" => {
            let path = config.tokenizer_path.as_ref().ok_or_else(|| {
                anyhow::anyhow!("chunking.tokenizer_path required for huggingface tokenizer")
            })?;
            Ok(Arc::new(HfTokenizer::from_file(path)?))
        }
        #[cfg(not(feature = "hf-tokenizer"))]
        "huggingface" => bail!("The huggingface tokenizer requires --features hf-tokenizer"),
        other => bail!("Unknown tokenizer: {}", other),
    }
}
