//! SQLite-backed [`VectorStore`].
//!
//! Each chunk is one row of the `chunks` table: content, typed metadata as
//! JSON, and the embedding as a little-endian f32 BLOB. Batch writes run in a
//! single transaction. Similarity search loads every vector and ranks by
//! cosine distance in process.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::embedding::{blob_to_vec, cosine_distance, vec_to_blob};
use crate::models::{Chunk, ChunkMetadata, SearchHit};

use super::{rank_hits, validate_batch, VectorStore};

pub struct SqliteVectorStore {
    pool: SqlitePool,
}

impl SqliteVectorStore {
    /// Wrap a pool whose schema was created by [`crate::migrate::run_migrations`].
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn add(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<()> {
        validate_batch(chunks, embeddings)?;

        let mut tx = self.pool.begin().await?;
        for (chunk, vector) in chunks.iter().zip(embeddings) {
            let metadata_json = serde_json::to_string(&chunk.metadata)?;
            sqlx::query(
                r#"
                INSERT INTO chunks (id, document_id, chunk_index, content, metadata_json, embedding)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&chunk.id)
            .bind(&chunk.metadata.document_id)
            .bind(chunk.metadata.chunk_index as i64)
            .bind(&chunk.content)
            .bind(&metadata_json)
            .bind(vec_to_blob(vector))
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert chunk {}", chunk.id))?;
        }
        tx.commit().await?;

        Ok(())
    }

    async fn similarity_search(&self, query: &[f32], n: usize) -> Result<Vec<SearchHit>> {
        let rows = sqlx::query("SELECT id, content, metadata_json, embedding FROM chunks")
            .fetch_all(&self.pool)
            .await?;

        let mut hits = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: String = row.get("id");
            let metadata_json: String = row.get("metadata_json");
            let metadata: ChunkMetadata = serde_json::from_str(&metadata_json)
                .with_context(|| format!("Corrupt metadata for chunk {}", id))?;
            let blob: Vec<u8> = row.get("embedding");

            hits.push(SearchHit {
                distance: cosine_distance(query, &blob_to_vec(&blob)),
                content: row.get("content"),
                metadata,
                id,
            });
        }

        rank_hits(&mut hits, n);
        Ok(hits)
    }

    async fn delete(&self, document_id: &str) -> Result<usize> {
        let result = sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(document_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() as usize)
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}
