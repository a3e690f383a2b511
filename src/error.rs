//! Error taxonomy for the upload and query pipelines.
//!
//! Every [`RagService`](crate::rag::RagService) operation fails with a
//! [`RagError`]. The variant decides how the failure is reported: the HTTP
//! layer maps each one to a status code and a machine-readable error code,
//! the CLI prints the message and exits non-zero.

use thiserror::Error;

use crate::extract::ExtractError;
use crate::models::FileType;

/// A request-level failure. None of these are retried by the orchestrator.
#[derive(Debug, Error)]
pub enum RagError {
    /// The file extension is not one of the supported document types.
    #[error("unsupported file type: '{0}' (allowed: {allowed})", allowed = FileType::ALLOWED.join(", "))]
    UnsupportedFormat(String),

    /// Reading or parsing the uploaded file failed.
    #[error("text extraction failed: {0}")]
    ExtractionFailure(String),

    /// The embedding model call failed.
    #[error("embedding request failed: {0}")]
    EmbeddingFailure(String),

    /// The chat-completion model call failed.
    #[error("answer generation failed: {0}")]
    GenerationFailure(String),

    /// A vector store or registry write/read failed.
    #[error("storage failure: {0}")]
    PersistenceFailure(String),

    /// The request itself is malformed (empty query, empty document, ...).
    #[error("{0}")]
    ValidationFailure(String),

    /// No document with the given id is registered.
    #[error("document not found: {0}")]
    NotFound(String),
}

impl RagError {
    /// Machine-readable code used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            RagError::UnsupportedFormat(_) => "unsupported_format",
            RagError::ExtractionFailure(_) => "extraction_failed",
            RagError::EmbeddingFailure(_) => "embedding_failed",
            RagError::GenerationFailure(_) => "generation_failed",
            RagError::PersistenceFailure(_) => "persistence_failed",
            RagError::ValidationFailure(_) => "bad_request",
            RagError::NotFound(_) => "not_found",
        }
    }

    /// True for errors caused by the caller's input rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RagError::UnsupportedFormat(_)
                | RagError::ValidationFailure(_)
                | RagError::NotFound(_)
                | RagError::ExtractionFailure(_)
        )
    }
}

impl From<ExtractError> for RagError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::UnsupportedFormat(ext) => RagError::UnsupportedFormat(ext),
            other => RagError::ExtractionFailure(other.to_string()),
        }
    }
}

/// Convenience alias for orchestrator results.
pub type RagResult<T> = std::result::Result<T, RagError>;
