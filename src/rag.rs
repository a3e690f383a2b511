//! The retrieval-augmented generation orchestrator.
//!
//! [`RagService`] owns the four seams of the system (embedder, chat model,
//! vector store, document registry) plus the chunker, and runs the two
//! pipelines every surface shares:
//!
//! ```text
//! upload: file type → extract → chunk → embed → store.add → registry.put
//! query:  validate → embed query → similarity search → prompt → chat
//! ```
//!
//! An upload either registers a fully searchable document or leaves nothing
//! behind: when persistence or registration fails the document's chunks are
//! deleted again before the error is returned.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use chrono::Utc;
use uuid::Uuid;

use crate::chunk::{build_chunks, SentenceChunker};
use crate::config::Config;
use crate::embedding::{create_embedder, Embedder};
use crate::error::{RagError, RagResult};
use crate::extract::extract_path;
use crate::llm::{create_chat_model, ChatModel};
use crate::models::{
    ChatMessage, Document, DocumentListResponse, FileType, KnowledgeBaseStats, QueryResponse,
    SearchHit, Source, UploadResponse,
};
use crate::registry::{DocumentRegistry, InMemoryRegistry, SqliteRegistry};
use crate::store::memory::InMemoryVectorStore;
use crate::store::sqlite::SqliteVectorStore;
use crate::store::VectorStore;
use crate::tokenizer::create_tokenizer;

/// Answer returned when retrieval finds nothing; the chat model is not called.
pub const FALLBACK_ANSWER: &str = "I couldn't find any relevant information in the knowledge base to answer your question. Please try rephrasing your query or upload relevant documents first.";

pub const UPLOAD_MESSAGE: &str = "Document uploaded and processed successfully";

const DEFAULT_MAX_CHUNKS: usize = 5;
const DEFAULT_HISTORY_TURNS: usize = 6;

pub struct RagService {
    embedder: Arc<dyn Embedder>,
    chat: Arc<dyn ChatModel>,
    store: Arc<dyn VectorStore>,
    registry: Arc<dyn DocumentRegistry>,
    chunker: SentenceChunker,
    max_chunks: usize,
    history_turns: usize,
}

impl RagService {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        chat: Arc<dyn ChatModel>,
        store: Arc<dyn VectorStore>,
        registry: Arc<dyn DocumentRegistry>,
        chunker: SentenceChunker,
    ) -> Self {
        Self {
            embedder,
            chat,
            store,
            registry,
            chunker,
            max_chunks: DEFAULT_MAX_CHUNKS,
            history_turns: DEFAULT_HISTORY_TURNS,
        }
    }

    /// Number of chunks retrieved when a query does not ask for a count.
    pub fn with_max_chunks(mut self, max_chunks: usize) -> Self {
        self.max_chunks = max_chunks.max(1);
        self
    }

    /// How many trailing history messages are forwarded to the chat model.
    pub fn with_history_turns(mut self, history_turns: usize) -> Self {
        self.history_turns = history_turns;
        self
    }

    /// Wire up providers and storage from configuration.
    ///
    /// With `storage.backend = "sqlite"` the database is opened and migrated
    /// here, so both the registry and the chunks survive restarts.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let tokenizer = create_tokenizer(&config.chunking)?;
        let chunker = SentenceChunker::new(
            tokenizer,
            config.chunking.chunk_size,
            config.chunking.chunk_overlap,
        );
        let embedder = create_embedder(&config.embedding)?;
        let chat = create_chat_model(&config.llm)?;

        let (store, registry): (Arc<dyn VectorStore>, Arc<dyn DocumentRegistry>) =
            if config.uses_sqlite() {
                let pool = crate::db::connect(config)
                    .await
                    .context("Failed to open knowledge base database")?;
                crate::migrate::run_migrations(&pool).await?;
                (
                    Arc::new(SqliteVectorStore::new(pool.clone())),
                    Arc::new(SqliteRegistry::new(pool)),
                )
            } else {
                (
                    Arc::new(InMemoryVectorStore::new()),
                    Arc::new(InMemoryRegistry::new()),
                )
            };

        tracing::info!(
            backend = %config.storage.backend,
            embedding_model = embedder.model_name(),
            chat_model = chat.model_name(),
            tokenizer = chunker.tokenizer().name(),
            "knowledge base ready"
        );

        Ok(Self::new(embedder, chat, store, registry, chunker)
            .with_max_chunks(config.retrieval.max_chunks)
            .with_history_turns(config.llm.history_turns))
    }

    // ============ Upload ============

    /// Ingest the file at `path`, which was uploaded as `filename`.
    ///
    /// The type comes from `filename`'s extension, never from `path`, so
    /// callers may store uploads under generated names.
    pub async fn upload_document(&self, path: &Path, filename: &str) -> RagResult<UploadResponse> {
        let file_type = FileType::from_filename(filename)?;
        let size_bytes = tokio::fs::metadata(path)
            .await
            .map_err(|e| RagError::ExtractionFailure(format!("{}: {}", filename, e)))?
            .len();

        let owned = path.to_path_buf();
        let text = tokio::task::spawn_blocking(move || extract_path(&owned, file_type))
            .await
            .map_err(|e| RagError::ExtractionFailure(format!("extraction task failed: {}", e)))??;

        let pieces = self.chunker.split(&text);
        if pieces.is_empty() {
            return Err(RagError::ValidationFailure(format!(
                "document contains no extractable text: {}",
                filename
            )));
        }

        let document_id = Uuid::new_v4().to_string();
        let upload_date = Utc::now();
        let chunks = build_chunks(
            &document_id,
            filename,
            file_type,
            upload_date,
            pieces,
            self.chunker.tokenizer(),
        );

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self
            .embedder
            .embed(&texts)
            .await
            .map_err(|e| RagError::EmbeddingFailure(format!("{:#}", e)))?;

        if let Err(e) = self.store.add(&chunks, &embeddings).await {
            self.rollback(&document_id).await;
            return Err(RagError::PersistenceFailure(format!("{:#}", e)));
        }

        let document = Document {
            id: document_id.clone(),
            filename: filename.to_string(),
            file_type,
            upload_date,
            chunk_count: chunks.len(),
            size_bytes,
        };
        if let Err(e) = self.registry.put(document).await {
            self.rollback(&document_id).await;
            return Err(RagError::PersistenceFailure(format!("{:#}", e)));
        }

        tracing::info!(
            document_id = %document_id,
            filename,
            file_type = %file_type,
            chunks = chunks.len(),
            size_bytes,
            "document uploaded"
        );

        Ok(UploadResponse {
            document_id,
            filename: filename.to_string(),
            chunk_count: chunks.len(),
            message: UPLOAD_MESSAGE.to_string(),
        })
    }

    /// Best-effort removal of chunks written by a failed upload.
    async fn rollback(&self, document_id: &str) {
        match self.store.delete(document_id).await {
            Ok(removed) => {
                tracing::warn!(document_id, removed, "upload rolled back");
            }
            Err(e) => {
                tracing::error!(document_id, error = %format!("{:#}", e), "upload rollback failed");
            }
        }
    }

    // ============ Query ============

    /// Answer `query` from the knowledge base.
    ///
    /// `max_chunks` of `None` or `0` uses the configured default. Only the
    /// last `history_turns` messages of `history` are forwarded.
    pub async fn query(
        &self,
        query: &str,
        max_chunks: Option<usize>,
        history: &[ChatMessage],
    ) -> RagResult<QueryResponse> {
        let started = Instant::now();

        if query.trim().is_empty() {
            return Err(RagError::ValidationFailure(
                "query must not be empty".to_string(),
            ));
        }
        let n = max_chunks.filter(|&n| n > 0).unwrap_or(self.max_chunks);

        let query_vector = self
            .embedder
            .embed_query(query)
            .await
            .map_err(|e| RagError::EmbeddingFailure(format!("{:#}", e)))?;
        let hits = self
            .store
            .similarity_search(&query_vector, n)
            .await
            .map_err(|e| RagError::PersistenceFailure(format!("{:#}", e)))?;

        if hits.is_empty() {
            tracing::info!(query, "no relevant chunks; returning fallback answer");
            return Ok(QueryResponse {
                query: query.to_string(),
                answer: FALLBACK_ANSWER.to_string(),
                sources: Vec::new(),
                processing_time: started.elapsed().as_secs_f64(),
            });
        }

        let messages = build_messages(&hits, history, self.history_turns, query);
        let answer = self
            .chat
            .complete(&messages)
            .await
            .map_err(|e| RagError::GenerationFailure(format!("{:#}", e)))?;

        let processing_time = started.elapsed().as_secs_f64();
        tracing::info!(
            query,
            sources = hits.len(),
            processing_time,
            "query answered"
        );

        Ok(QueryResponse {
            query: query.to_string(),
            answer,
            sources: hits.into_iter().map(Source::from).collect(),
            processing_time,
        })
    }

    // ============ Documents ============

    pub async fn list_documents(&self) -> RagResult<DocumentListResponse> {
        let documents = self
            .registry
            .list()
            .await
            .map_err(|e| RagError::PersistenceFailure(format!("{:#}", e)))?;
        Ok(DocumentListResponse {
            total_count: documents.len(),
            documents,
        })
    }

    /// Remove a document and all of its chunks.
    ///
    /// Returns `true` if the document was registered or any of its chunks
    /// were stored. Storage failures are logged and reported as `false`.
    pub async fn delete_document(&self, document_id: &str) -> bool {
        let removed_chunks = match self.store.delete(document_id).await {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(document_id, error = %format!("{:#}", e), "chunk delete failed");
                return false;
            }
        };
        let removed_doc = match self.registry.remove(document_id).await {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(document_id, error = %format!("{:#}", e), "registry delete failed");
                return false;
            }
        };

        let found = removed_doc.is_some() || removed_chunks > 0;
        if found {
            tracing::info!(document_id, removed_chunks, "document deleted");
        }
        found
    }

    pub async fn stats(&self) -> RagResult<KnowledgeBaseStats> {
        let documents = self
            .registry
            .list()
            .await
            .map_err(|e| RagError::PersistenceFailure(format!("{:#}", e)))?;
        let total_chunks = self
            .store
            .count()
            .await
            .map_err(|e| RagError::PersistenceFailure(format!("{:#}", e)))?;
        let document_types: BTreeSet<FileType> = documents.iter().map(|d| d.file_type).collect();

        Ok(KnowledgeBaseStats {
            total_documents: documents.len(),
            total_chunks,
            document_types: document_types.into_iter().collect(),
        })
    }
}

// ============ Prompt ============

/// Retrieved chunks as `Source N:` blocks, 1-indexed, in retrieval order.
pub fn format_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| format!("Source {}:\n{}", i + 1, hit.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn system_prompt(context: &str) -> String {
    format!(
        "You are a helpful AI assistant that answers questions based on the provided context.

Rules:
1. Answer questions using ONLY the information provided in the context
2. If the context doesn't contain enough information to answer the question, say so clearly
3. Always cite which source(s) you used by referring to \"Source X\"
4. Be concise and accurate
5. If asked about something not in the context, politely explain you can only answer based on the provided documents

Context:
{}",
        context
    )
}

/// System prompt, then the tail of `history`, then the query.
fn build_messages(
    hits: &[SearchHit],
    history: &[ChatMessage],
    history_turns: usize,
    query: &str,
) -> Vec<ChatMessage> {
    let recent = &history[history.len().saturating_sub(history_turns)..];

    let mut messages = Vec::with_capacity(recent.len() + 2);
    messages.push(ChatMessage::system(system_prompt(&format_context(hits))));
    messages.extend(recent.iter().cloned());
    messages.push(ChatMessage::user(query));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::tokenizer::WhitespaceTokenizer;
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Letter-frequency vectors: deterministic and similar for similar text.
    struct FakeEmbedder {
        calls: AtomicUsize,
        fail: AtomicBool,
    }

    #[async_trait]
    impl Embedder for FakeEmbedder {
        fn model_name(&self) -> &str {
            "fake-embed"
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                bail!("connection refused");
            }
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0f32; 26];
                    for c in t.to_ascii_lowercase().bytes().filter(u8::is_ascii_lowercase) {
                        v[(c - b'a') as usize] += 1.0;
                    }
                    v[0] += 0.01;
                    v
                })
                .collect())
        }
    }

    #[derive(Default)]
    struct FakeChat {
        requests: Mutex<Vec<Vec<ChatMessage>>>,
        fail: AtomicBool,
    }

    #[async_trait]
    impl ChatModel for FakeChat {
        fn model_name(&self) -> &str {
            "fake-chat"
        }

        async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
            self.requests.lock().unwrap().push(messages.to_vec());
            if self.fail.load(Ordering::SeqCst) {
                bail!("rate limited after 2 retries");
            }
            Ok("According to Source 1, it works.".to_string())
        }
    }

    /// Counts searches so tests can assert the store was never consulted.
    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryVectorStore,
        searches: AtomicUsize,
    }

    #[async_trait]
    impl VectorStore for CountingStore {
        async fn add(&self, chunks: &[crate::models::Chunk], embeddings: &[Vec<f32>]) -> Result<()> {
            self.inner.add(chunks, embeddings).await
        }
        async fn similarity_search(&self, query: &[f32], n: usize) -> Result<Vec<SearchHit>> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            self.inner.similarity_search(query, n).await
        }
        async fn delete(&self, document_id: &str) -> Result<usize> {
            self.inner.delete(document_id).await
        }
        async fn count(&self) -> Result<usize> {
            self.inner.count().await
        }
    }

    struct BrokenRegistry;

    #[async_trait]
    impl DocumentRegistry for BrokenRegistry {
        async fn put(&self, _doc: Document) -> Result<()> {
            bail!("disk full")
        }
        async fn get(&self, _id: &str) -> Result<Option<Document>> {
            Ok(None)
        }
        async fn remove(&self, _id: &str) -> Result<Option<Document>> {
            Ok(None)
        }
        async fn list(&self) -> Result<Vec<Document>> {
            Ok(Vec::new())
        }
    }

    struct Harness {
        service: RagService,
        embedder: Arc<FakeEmbedder>,
        chat: Arc<FakeChat>,
        store: Arc<CountingStore>,
        dir: TempDir,
    }

    fn harness_with(registry: Arc<dyn DocumentRegistry>) -> Harness {
        let embedder = Arc::new(FakeEmbedder {
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        });
        let chat = Arc::new(FakeChat::default());
        let store = Arc::new(CountingStore::default());
        let chunker = SentenceChunker::new(Arc::new(WhitespaceTokenizer), 12, 3);
        let service = RagService::new(
            embedder.clone(),
            chat.clone(),
            store.clone(),
            registry,
            chunker,
        );
        Harness {
            service,
            embedder,
            chat,
            store,
            dir: TempDir::new().unwrap(),
        }
    }

    fn harness() -> Harness {
        harness_with(Arc::new(InMemoryRegistry::new()))
    }

    impl Harness {
        fn write(&self, name: &str, content: &str) -> std::path::PathBuf {
            let path = self.dir.path().join(name);
            std::fs::write(&path, content).unwrap();
            path
        }
    }

    const RUST_TEXT: &str = "Rust guarantees memory safety without a garbage collector. \
        The borrow checker enforces ownership rules at compile time. \
        Cargo is the package manager and build tool. \
        Crates are published to crates.io for sharing.";

    #[tokio::test]
    async fn upload_registers_document_with_chunks() {
        let h = harness();
        let path = h.write("upload-1", RUST_TEXT);

        let resp = h.service.upload_document(&path, "rust.md").await.unwrap();
        assert_eq!(resp.filename, "rust.md");
        assert_eq!(resp.message, UPLOAD_MESSAGE);
        assert!(resp.chunk_count >= 2);
        assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 1);

        let list = h.service.list_documents().await.unwrap();
        assert_eq!(list.total_count, 1);
        let doc = &list.documents[0];
        assert_eq!(doc.id, resp.document_id);
        assert_eq!(doc.file_type, FileType::Md);
        assert_eq!(doc.chunk_count, resp.chunk_count);
        assert_eq!(doc.size_bytes, RUST_TEXT.len() as u64);
        assert_eq!(h.store.count().await.unwrap(), resp.chunk_count);
    }

    #[tokio::test]
    async fn unsupported_extension_rejected_before_extraction() {
        let h = harness();
        // The path does not exist: rejection must happen first.
        let err = h
            .service
            .upload_document(&h.dir.path().join("missing"), "setup.exe")
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::UnsupportedFormat(ref e) if e == "exe"));
        assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_document_rejected() {
        let h = harness();
        let path = h.write("blank", "   \n  ");
        let err = h.service.upload_document(&path, "blank.txt").await.unwrap_err();
        assert!(matches!(err, RagError::ValidationFailure(_)));
        assert_eq!(h.service.list_documents().await.unwrap().total_count, 0);
        assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_registration_rolls_back_chunks() {
        let h = harness_with(Arc::new(BrokenRegistry));
        let path = h.write("upload", RUST_TEXT);

        let err = h.service.upload_document(&path, "rust.txt").await.unwrap_err();
        assert!(matches!(err, RagError::PersistenceFailure(ref m) if m.contains("disk full")));
        assert_eq!(h.store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_query_rejected_without_store_call() {
        let h = harness();
        for q in ["", "   "] {
            let err = h.service.query(q, None, &[]).await.unwrap_err();
            assert!(matches!(err, RagError::ValidationFailure(_)));
        }
        assert_eq!(h.store.searches.load(Ordering::SeqCst), 0);
        assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_knowledge_base_returns_fallback_without_llm() {
        let h = harness();
        let resp = h.service.query("what is rust?", None, &[]).await.unwrap();
        assert_eq!(resp.answer, FALLBACK_ANSWER);
        assert!(resp.sources.is_empty());
        assert!(h.chat.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn query_builds_prompt_from_ranked_sources() {
        let h = harness();
        let path = h.write("upload", RUST_TEXT);
        h.service.upload_document(&path, "rust.md").await.unwrap();

        let history = vec![
            ChatMessage::user("hi"),
            ChatMessage::assistant("hello"),
        ];
        let resp = h
            .service
            .query("How does the borrow checker work?", Some(2), &history)
            .await
            .unwrap();

        assert_eq!(resp.answer, "According to Source 1, it works.");
        assert_eq!(resp.sources.len(), 2);
        assert!(resp.sources[0].distance <= resp.sources[1].distance);

        let requests = h.chat.requests.lock().unwrap();
        let messages = &requests[0];
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0]
            .content
            .contains(&format!("Source 1:\n{}", resp.sources[0].content)));
        assert!(messages[0]
            .content
            .contains(&format!("Source 2:\n{}", resp.sources[1].content)));
        assert_eq!(messages[1], ChatMessage::user("hi"));
        assert_eq!(messages[3], ChatMessage::user("How does the borrow checker work?"));
    }

    #[tokio::test]
    async fn chat_failure_is_a_generation_failure() {
        let h = harness();
        let path = h.write("upload", RUST_TEXT);
        h.service.upload_document(&path, "rust.md").await.unwrap();

        h.chat.fail.store(true, Ordering::SeqCst);
        let err = h.service.query("cargo", None, &[]).await.unwrap_err();
        assert!(
            matches!(err, RagError::GenerationFailure(ref m) if m.contains("rate limited")),
            "got {:?}",
            err
        );
        assert_eq!(err.code(), "generation_failed");
        assert_eq!(h.chat.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn query_embedding_failure_skips_search_and_chat() {
        let h = harness();
        let path = h.write("upload", RUST_TEXT);
        h.service.upload_document(&path, "rust.md").await.unwrap();

        h.embedder.fail.store(true, Ordering::SeqCst);
        let err = h.service.query("cargo", None, &[]).await.unwrap_err();
        assert!(
            matches!(err, RagError::EmbeddingFailure(ref m) if m.contains("connection refused")),
            "got {:?}",
            err
        );
        assert_eq!(h.store.searches.load(Ordering::SeqCst), 0);
        assert!(h.chat.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn upload_embedding_failure_stores_nothing() {
        let h = harness();
        h.embedder.fail.store(true, Ordering::SeqCst);
        let path = h.write("upload", RUST_TEXT);

        let err = h.service.upload_document(&path, "rust.md").await.unwrap_err();
        assert!(matches!(err, RagError::EmbeddingFailure(_)), "got {:?}", err);
        assert_eq!(h.store.count().await.unwrap(), 0);
        assert_eq!(h.service.list_documents().await.unwrap().total_count, 0);
    }

    #[tokio::test]
    async fn zero_max_chunks_uses_default() {
        let h = harness();
        let path = h.write("upload", RUST_TEXT);
        let uploaded = h.service.upload_document(&path, "rust.md").await.unwrap();

        let service = h.service.with_max_chunks(1);
        let resp = service.query("cargo", Some(0), &[]).await.unwrap();
        assert_eq!(resp.sources.len(), 1);
        let resp = service.query("cargo", Some(50), &[]).await.unwrap();
        assert_eq!(resp.sources.len(), uploaded.chunk_count);
    }

    #[tokio::test]
    async fn only_recent_history_is_forwarded() {
        let h = harness();
        let path = h.write("upload", RUST_TEXT);
        h.service.upload_document(&path, "rust.md").await.unwrap();

        let history: Vec<ChatMessage> = (0..10)
            .map(|i| ChatMessage::user(format!("turn {}", i)))
            .collect();
        h.service.query("cargo", None, &history).await.unwrap();

        let requests = h.chat.requests.lock().unwrap();
        let messages = &requests[0];
        // system + 6 history + query
        assert_eq!(messages.len(), 8);
        assert_eq!(messages[1].content, "turn 4");
        assert_eq!(messages[6].content, "turn 9");
    }

    #[tokio::test]
    async fn delete_removes_document_and_chunks() {
        let h = harness();
        let a = h.write("a", RUST_TEXT);
        let b = h.write("b", "Tokio is an async runtime. It schedules tasks.");
        let first = h.service.upload_document(&a, "a.md").await.unwrap();
        let second = h.service.upload_document(&b, "b.txt").await.unwrap();

        let before = h.store.count().await.unwrap();
        assert!(h.service.delete_document(&first.document_id).await);
        assert_eq!(
            h.store.count().await.unwrap(),
            before - first.chunk_count
        );

        let resp = h.service.query("borrow checker", Some(10), &[]).await.unwrap();
        assert!(resp
            .sources
            .iter()
            .all(|s| s.document_id == second.document_id));

        assert!(!h.service.delete_document(&first.document_id).await);
        assert!(!h.service.delete_document("no-such-id").await);
    }

    #[tokio::test]
    async fn stats_report_totals_and_types() {
        let h = harness();
        let a = h.write("a", RUST_TEXT);
        let b = h.write("b", "Plain text. Nothing more.");
        let first = h.service.upload_document(&a, "a.md").await.unwrap();
        let second = h.service.upload_document(&b, "b.txt").await.unwrap();

        let stats = h.service.stats().await.unwrap();
        assert_eq!(stats.total_documents, 2);
        assert_eq!(stats.total_chunks, first.chunk_count + second.chunk_count);
        assert_eq!(stats.document_types, vec![FileType::Txt, FileType::Md]);
    }

    #[test]
    fn context_labels_sources_in_order() {
        let hits: Vec<SearchHit> = crate::store::test_support::chunks_for("d", 2)
            .into_iter()
            .map(|c| SearchHit {
                id: c.id,
                content: c.content,
                metadata: c.metadata,
                distance: 0.1,
            })
            .collect();
        assert_eq!(
            format_context(&hits),
            "Source 1:\nd chunk 0\n\nSource 2:\nd chunk 1"
        );
        assert!(system_prompt("CTX").ends_with("Context:\nCTX"));
    }
}
