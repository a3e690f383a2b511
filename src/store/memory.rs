//! In-memory [`VectorStore`] for tests and `storage.backend = "memory"`.
//!
//! Chunks live in a `Vec` behind `std::sync::RwLock`. Search is brute-force
//! cosine distance over every stored vector. Nothing survives a restart.

use std::collections::HashSet;
use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::embedding::cosine_distance;
use crate::models::{Chunk, SearchHit};

use super::{rank_hits, validate_batch, VectorStore};

struct StoredChunk {
    chunk: Chunk,
    vector: Vec<f32>,
}

#[derive(Default)]
pub struct InMemoryVectorStore {
    chunks: RwLock<Vec<StoredChunk>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow::anyhow!("vector store lock poisoned")
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn add(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<()> {
        validate_batch(chunks, embeddings)?;

        let mut stored = self.chunks.write().map_err(poisoned)?;
        let mut ids: HashSet<&str> = stored.iter().map(|s| s.chunk.id.as_str()).collect();
        for chunk in chunks {
            if !ids.insert(chunk.id.as_str()) {
                bail!("duplicate chunk id: {}", chunk.id);
            }
        }

        for (chunk, vector) in chunks.iter().zip(embeddings) {
            stored.push(StoredChunk {
                chunk: chunk.clone(),
                vector: vector.clone(),
            });
        }
        Ok(())
    }

    async fn similarity_search(&self, query: &[f32], n: usize) -> Result<Vec<SearchHit>> {
        let stored = self.chunks.read().map_err(poisoned)?;
        let mut hits: Vec<SearchHit> = stored
            .iter()
            .map(|s| SearchHit {
                id: s.chunk.id.clone(),
                content: s.chunk.content.clone(),
                metadata: s.chunk.metadata.clone(),
                distance: cosine_distance(query, &s.vector),
            })
            .collect();
        rank_hits(&mut hits, n);
        Ok(hits)
    }

    async fn delete(&self, document_id: &str) -> Result<usize> {
        let mut stored = self.chunks.write().map_err(poisoned)?;
        let before = stored.len();
        stored.retain(|s| s.chunk.metadata.document_id != document_id);
        Ok(before - stored.len())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.chunks.read().map_err(poisoned)?.len())
    }
}
