//! Core data models used throughout askdocs.
//!
//! These types represent the documents, chunks, and retrieval results that
//! flow through the upload and query pipelines, plus the response shapes
//! returned by the HTTP API and CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::RagError;

/// Document formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Docx,
    Txt,
    Md,
}

impl FileType {
    /// All accepted extensions, in the order they are reported to clients.
    pub const ALLOWED: [&'static str; 4] = ["pdf", "txt", "md", "docx"];

    /// Parse a bare extension tag (case-insensitive, no leading dot).
    pub fn from_extension(ext: &str) -> Result<Self, RagError> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Ok(FileType::Pdf),
            "docx" => Ok(FileType::Docx),
            "txt" => Ok(FileType::Txt),
            "md" => Ok(FileType::Md),
            other => Err(RagError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Derive the type from the text after the last `.` of a filename, so
    /// `.txt` counts as a text file. A filename without a `.` is rejected
    /// with the whole name as the offending type.
    pub fn from_filename(filename: &str) -> Result<Self, RagError> {
        let ext = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .unwrap_or(filename);
        Self::from_extension(ext)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Pdf => "pdf",
            FileType::Docx => "docx",
            FileType::Txt => "txt",
            FileType::Md => "md",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered document. Only exists once every upload stage succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub filename: String,
    pub file_type: FileType,
    pub upload_date: DateTime<Utc>,
    pub chunk_count: usize,
    pub size_bytes: u64,
}

/// Metadata stored alongside every chunk in the vector store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub document_id: String,
    pub filename: String,
    pub file_type: FileType,
    pub chunk_index: usize,
    /// Number of chunks the parent document was split into.
    pub chunk_count: usize,
    pub upload_date: DateTime<Utc>,
    pub token_count: usize,
}

/// A token-bounded span of a document's text, the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// `{document_id}_{chunk_index}`.
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// The id a chunk must carry for the given parent and position.
    pub fn make_id(document_id: &str, chunk_index: usize) -> String {
        format!("{}_{}", document_id, chunk_index)
    }
}

/// A chunk returned from similarity search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
    /// Cosine distance (`1 - cosine similarity`); smaller is closer.
    pub distance: f32,
}

/// A retrieved chunk cited in a query answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Source {
    pub id: String,
    pub document_id: String,
    pub content: String,
    pub chunk_index: usize,
    pub distance: f32,
    pub metadata: ChunkMetadata,
}

impl From<SearchHit> for Source {
    fn from(hit: SearchHit) -> Self {
        Source {
            id: hit.id,
            document_id: hit.metadata.document_id.clone(),
            content: hit.content,
            chunk_index: hit.metadata.chunk_index,
            distance: hit.distance,
            metadata: hit.metadata,
        }
    }
}

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message in a chat-completion exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Result of a successful upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub document_id: String,
    pub filename: String,
    pub chunk_count: usize,
    pub message: String,
}

/// Result of a knowledge-base query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub query: String,
    pub answer: String,
    pub sources: Vec<Source>,
    /// Wall-clock seconds spent answering.
    pub processing_time: f64,
}

/// All registered documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentListResponse {
    pub documents: Vec<Document>,
    pub total_count: usize,
}

/// Knowledge-base totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBaseStats {
    pub total_documents: usize,
    pub total_chunks: usize,
    pub document_types: Vec<FileType>,
}
