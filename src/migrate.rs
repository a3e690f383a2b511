use anyhow::Result;
use sqlx::SqlitePool;

/// Create the `documents` and `chunks` tables. Idempotent.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // Registered documents
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            filename TEXT NOT NULL,
            file_type TEXT NOT NULL,
            upload_date TEXT NOT NULL,
            chunk_count INTEGER NOT NULL,
            size_bytes INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Chunks with their metadata and embedding vector. No foreign key to
    // documents: chunks are written before the document is registered.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            document_id TEXT NOT NULL,
            chunk_index INTEGER NOT NULL,
            content TEXT NOT NULL,
            metadata_json TEXT NOT NULL,
            embedding BLOB NOT NULL,
            UNIQUE(document_id, chunk_index)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_document_id ON chunks(document_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_upload_date ON documents(upload_date)")
        .execute(pool)
        .await?;

    Ok(())
}
