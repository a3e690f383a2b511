//! Human-readable CLI commands.
//!
//! Each `run_*` function backs one `askdocs` subcommand: it builds a
//! [`RagService`] from the config, performs one operation, and prints the
//! result to stdout. Failures are returned as `anyhow` errors so `main`
//! exits non-zero.

use anyhow::{bail, Result};
use std::path::Path;

use crate::config::Config;
use crate::rag::RagService;

/// Create the SQLite schema. A no-op for the in-memory backend.
pub async fn run_init(config: &Config) -> Result<()> {
    if !config.uses_sqlite() {
        println!("Storage backend is '{}'; nothing to initialize.", config.storage.backend);
        return Ok(());
    }

    let pool = crate::db::connect(config).await?;
    crate::migrate::run_migrations(&pool).await?;
    pool.close().await;

    println!(
        "Knowledge base initialized at {}",
        config.storage.db_path.display()
    );
    Ok(())
}

pub async fn run_upload(config: &Config, path: &Path) -> Result<()> {
    let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
        bail!("Not a file path: {}", path.display());
    };

    let service = RagService::from_config(config).await?;
    let resp = service.upload_document(path, filename).await?;

    println!("{}", resp.message);
    println!("  Document:  {}", resp.document_id);
    println!("  File:      {}", resp.filename);
    println!("  Chunks:    {}", resp.chunk_count);
    Ok(())
}

pub async fn run_query(config: &Config, query: &str, max_chunks: Option<usize>) -> Result<()> {
    let service = RagService::from_config(config).await?;
    let resp = service.query(query, max_chunks, &[]).await?;

    println!("{}", resp.answer);
    println!();

    if !resp.sources.is_empty() {
        println!("Sources:");
        for (i, source) in resp.sources.iter().enumerate() {
            println!(
                "  [{}] {} (chunk {}, distance {:.3})",
                i + 1,
                source.metadata.filename,
                source.chunk_index,
                source.distance
            );
            println!("      {}", preview(&source.content, 120));
        }
        println!();
    }

    println!("Answered in {:.2}s", resp.processing_time);
    Ok(())
}

pub async fn run_list(config: &Config) -> Result<()> {
    let service = RagService::from_config(config).await?;
    let list = service.list_documents().await?;

    if list.documents.is_empty() {
        println!("No documents.");
        return Ok(());
    }

    println!(
        "{:<36}  {:<28} {:<5} {:>6} {:>9}  {}",
        "ID", "FILENAME", "TYPE", "CHUNKS", "SIZE", "UPLOADED"
    );
    println!("{}", "-".repeat(110));
    for doc in &list.documents {
        println!(
            "{:<36}  {:<28} {:<5} {:>6} {:>9}  {}",
            doc.id,
            preview(&doc.filename, 28),
            doc.file_type,
            doc.chunk_count,
            format_bytes(doc.size_bytes),
            doc.upload_date.format("%Y-%m-%d %H:%M")
        );
    }
    println!();
    println!("{} document(s)", list.total_count);
    Ok(())
}

pub async fn run_delete(config: &Config, id: &str) -> Result<()> {
    let service = RagService::from_config(config).await?;
    if !service.delete_document(id).await {
        bail!("Document not found: {}", id);
    }
    println!("Document {} deleted successfully", id);
    Ok(())
}

pub async fn run_stats(config: &Config) -> Result<()> {
    let service = RagService::from_config(config).await?;
    let stats = service.stats().await?;

    let types: Vec<&str> = stats.document_types.iter().map(|t| t.as_str()).collect();

    println!("askdocs: Knowledge Base Stats");
    println!("=============================");
    println!();
    println!("  Backend:     {}", config.storage.backend);
    if config.uses_sqlite() {
        let db_size = std::fs::metadata(&config.storage.db_path)
            .map(|m| m.len())
            .unwrap_or(0);
        println!("  Database:    {}", config.storage.db_path.display());
        println!("  Size:        {}", format_bytes(db_size));
    }
    println!();
    println!("  Documents:   {}", stats.total_documents);
    println!("  Chunks:      {}", stats.total_chunks);
    println!(
        "  Types:       {}",
        if types.is_empty() {
            "-".to_string()
        } else {
            types.join(", ")
        }
    );
    println!();
    Ok(())
}

/// First `max` characters of `text` on one line, with `...` if cut.
fn preview(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        flat
    } else {
        let cut: String = flat.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
