//! Registry of uploaded documents.
//!
//! The orchestrator owns a [`DocumentRegistry`] and only writes to it after
//! a document's chunks are persisted, so anything listed here is fully
//! searchable. Two implementations:
//!
//! - [`InMemoryRegistry`]: `RwLock<HashMap>`; writers are serialized by the lock.
//! - [`SqliteRegistry`]: the `documents` table; survives restarts.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::models::{Document, FileType};

#[async_trait]
pub trait DocumentRegistry: Send + Sync {
    /// Insert or replace a document by id.
    async fn put(&self, doc: Document) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<Document>>;
    /// Remove a document, returning it if it was registered.
    async fn remove(&self, id: &str) -> Result<Option<Document>>;
    /// All documents, oldest upload first.
    async fn list(&self) -> Result<Vec<Document>>;
}

fn by_upload_date(docs: &mut [Document]) {
    docs.sort_by(|a, b| {
        a.upload_date
            .cmp(&b.upload_date)
            .then_with(|| a.id.cmp(&b.id))
    });
}

// ============ In-memory ============

#[derive(Default)]
pub struct InMemoryRegistry {
    docs: RwLock<HashMap<String, Document>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow::anyhow!("document registry lock poisoned")
}

#[async_trait]
impl DocumentRegistry for InMemoryRegistry {
    async fn put(&self, doc: Document) -> Result<()> {
        self.docs
            .write()
            .map_err(poisoned)?
            .insert(doc.id.clone(), doc);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.docs.read().map_err(poisoned)?.get(id).cloned())
    }

    async fn remove(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.docs.write().map_err(poisoned)?.remove(id))
    }

    async fn list(&self) -> Result<Vec<Document>> {
        let mut docs: Vec<Document> = self.docs.read().map_err(poisoned)?.values().cloned().collect();
        by_upload_date(&mut docs);
        Ok(docs)
    }
}

// ============ SQLite ============

pub struct SqliteRegistry {
    pool: SqlitePool,
}

impl SqliteRegistry {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> Result<Document> {
    let id: String = row.get("id");
    let file_type: String = row.get("file_type");
    let upload_date: String = row.get("upload_date");
    let chunk_count: i64 = row.get("chunk_count");
    let size_bytes: i64 = row.get("size_bytes");

    Ok(Document {
        file_type: FileType::from_extension(&file_type)
            .with_context(|| format!("Corrupt file_type for document {}", id))?,
        upload_date: DateTime::parse_from_rfc3339(&upload_date)
            .with_context(|| format!("Corrupt upload_date for document {}", id))?
            .with_timezone(&Utc),
        filename: row.get("filename"),
        chunk_count: chunk_count as usize,
        size_bytes: size_bytes as u64,
        id,
    })
}

#[async_trait]
impl DocumentRegistry for SqliteRegistry {
    async fn put(&self, doc: Document) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (id, filename, file_type, upload_date, chunk_count, size_bytes)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                filename = excluded.filename,
                file_type = excluded.file_type,
                upload_date = excluded.upload_date,
                chunk_count = excluded.chunk_count,
                size_bytes = excluded.size_bytes
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.filename)
        .bind(doc.file_type.as_str())
        .bind(doc.upload_date.to_rfc3339())
        .bind(doc.chunk_count as i64)
        .bind(doc.size_bytes as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query(
            "SELECT id, filename, file_type, upload_date, chunk_count, size_bytes FROM documents WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_document).transpose()
    }

    async fn remove(&self, id: &str) -> Result<Option<Document>> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(
            "SELECT id, filename, file_type, upload_date, chunk_count, size_bytes FROM documents WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let doc = row.as_ref().map(row_to_document).transpose()?;

        if doc.is_some() {
            sqlx::query("DELETE FROM documents WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(doc)
    }

    async fn list(&self) -> Result<Vec<Document>> {
        let rows = sqlx::query(
            "SELECT id, filename, file_type, upload_date, chunk_count, size_bytes FROM documents",
        )
        .fetch_all(&self.pool)
        .await?;
        let mut docs = rows.iter().map(row_to_document).collect::<Result<Vec<_>>>()?;
        by_upload_date(&mut docs);
        Ok(docs)
    }
}
