//! Vector store abstraction.
//!
//! The [`VectorStore`] trait is everything the pipelines need from the
//! embedding index: batch add, top-n similarity search, delete-by-document,
//! and count. Ranking is by cosine distance; ties break on chunk id so
//! results are stable.
//!
//! | Backend | Type |
//! |---------|------|
//! | SQLite (`storage.backend = "sqlite"`) | [`sqlite::SqliteVectorStore`] |
//! | In-process (`storage.backend = "memory"`) | [`memory::InMemoryVectorStore`] |

pub mod memory;
pub mod sqlite;

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::cmp::Ordering;

use crate::models::{Chunk, SearchHit};

/// Abstract embedding index keyed by chunk id and document id.
///
/// Implementations must be `Send + Sync`; they are shared across request
/// handlers behind an `Arc`.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Persist chunks with their embeddings, one vector per chunk.
    ///
    /// A duplicate chunk id is an error.
    async fn add(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<()>;

    /// Return up to `n` chunks closest to `query`, nearest first.
    async fn similarity_search(&self, query: &[f32], n: usize) -> Result<Vec<SearchHit>>;

    /// Remove every chunk of `document_id`, returning how many were removed.
    async fn delete(&self, document_id: &str) -> Result<usize>;

    /// Total stored chunks.
    async fn count(&self) -> Result<usize>;
}

/// Check a batch before it is written.
///
/// Chunk and embedding counts must match, every chunk id must be
/// `{document_id}_{chunk_index}`, and all vectors must be non-empty and of
/// one dimensionality.
pub fn validate_batch(chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<()> {
    if chunks.len() != embeddings.len() {
        bail!(
            "got {} chunks but {} embeddings",
            chunks.len(),
            embeddings.len()
        );
    }

    for chunk in chunks {
        let expected = Chunk::make_id(&chunk.metadata.document_id, chunk.metadata.chunk_index);
        if chunk.id != expected {
            bail!("chunk id '{}' does not match its metadata ('{}')", chunk.id, expected);
        }
    }

    if let Some(first) = embeddings.first() {
        let dims = first.len();
        if dims == 0 {
            bail!("embeddings must not be empty");
        }
        if let Some(bad) = embeddings.iter().find(|e| e.len() != dims) {
            bail!(
                "embedding dimensions differ within batch ({} vs {})",
                dims,
                bad.len()
            );
        }
    }

    Ok(())
}

/// Nearest first; equal distances ordered by chunk id.
pub(crate) fn rank_hits(hits: &mut Vec<SearchHit>, n: usize) {
    hits.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    hits.truncate(n);
}
