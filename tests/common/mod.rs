//! Shared fakes for integration tests: a deterministic embedder and a chat
//! model that records what it was asked.

#![allow(dead_code)]

use anyhow::{bail, Result};
use askdocs::chunk::SentenceChunker;
use askdocs::config::Config;
use askdocs::embedding::Embedder;
use askdocs::llm::ChatModel;
use askdocs::models::ChatMessage;
use askdocs::rag::RagService;
use askdocs::registry::{DocumentRegistry, InMemoryRegistry, SqliteRegistry};
use askdocs::store::memory::InMemoryVectorStore;
use askdocs::store::sqlite::SqliteVectorStore;
use askdocs::store::VectorStore;
use askdocs::tokenizer::WhitespaceTokenizer;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const CANNED_ANSWER: &str = "Based on Source 1, the answer is in the documents.";

const DIMS: usize = 256;

/// FNV-1a bucket for a lowercase word.
fn bucket(word: &str) -> usize {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in word.bytes() {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    (hash % DIMS as u64) as usize
}

/// Hashed bag-of-words embedding: texts sharing words land close together.
#[derive(Default)]
pub struct FakeEmbedder {
    pub calls: AtomicUsize,
    /// When set, every call fails as an unreachable provider would.
    pub fail: AtomicBool,
}

impl FakeEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    fn model_name(&self) -> &str {
        "fake-embed"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            bail!("embedding provider unreachable");
        }
        Ok(texts
            .iter()
            .map(|t| {
                // The extra dimension keeps word-less texts off the zero vector.
                let mut v = vec![0.0f32; DIMS + 1];
                v[DIMS] = 0.1;
                for word in t
                    .to_lowercase()
                    .split(|c: char| !c.is_alphanumeric())
                    .filter(|w| !w.is_empty())
                {
                    v[bucket(word)] += 1.0;
                }
                v
            })
            .collect())
    }
}

#[derive(Default)]
pub struct FakeChat {
    pub requests: Mutex<Vec<Vec<ChatMessage>>>,
    /// When set, completions fail after the request is recorded.
    pub fail: AtomicBool,
}

impl FakeChat {
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChatModel for FakeChat {
    fn model_name(&self) -> &str {
        "fake-chat"
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.requests.lock().unwrap().push(messages.to_vec());
        if self.fail.load(Ordering::SeqCst) {
            bail!("chat model returned 503 Service Unavailable");
        }
        Ok(CANNED_ANSWER.to_string())
    }
}

pub struct TestService {
    pub service: Arc<RagService>,
    pub embedder: Arc<FakeEmbedder>,
    pub chat: Arc<FakeChat>,
}

fn assemble(store: Arc<dyn VectorStore>, registry: Arc<dyn DocumentRegistry>) -> TestService {
    let embedder = Arc::new(FakeEmbedder::default());
    let chat = Arc::new(FakeChat::default());
    let chunker = SentenceChunker::new(Arc::new(WhitespaceTokenizer), 20, 5);
    let service = RagService::new(embedder.clone(), chat.clone(), store, registry, chunker)
        .with_max_chunks(3);
    TestService {
        service: Arc::new(service),
        embedder,
        chat,
    }
}

/// In-memory store and registry.
pub fn memory_service() -> TestService {
    assemble(
        Arc::new(InMemoryVectorStore::new()),
        Arc::new(InMemoryRegistry::new()),
    )
}

/// SQLite store and registry at `config.storage.db_path`.
pub async fn sqlite_service(config: &Config) -> TestService {
    let pool = askdocs::db::connect(config).await.unwrap();
    askdocs::migrate::run_migrations(&pool).await.unwrap();
    assemble(
        Arc::new(SqliteVectorStore::new(pool.clone())),
        Arc::new(SqliteRegistry::new(pool)),
    )
}

pub const RUST_DOC: &str = "Rust is a systems programming language. \
    The borrow checker enforces ownership and lifetimes at compile time. \
    Cargo builds crates and resolves dependencies. \
    Traits describe shared behavior across types. \
    Async functions return futures that an executor polls.";

pub const GARDEN_DOC: &str = "Tomatoes need full sun and regular watering. \
    Mulch keeps soil moist during hot weeks. \
    Prune basil often so it keeps producing leaves.";

/// PDF with one Helvetica text line per page, laid out with a correct
/// xref table so pdf-extract can parse it.
pub fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        String::new(),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];
    let mut kids = Vec::new();
    for text in pages {
        let page_id = objects.len() + 1;
        kids.push(format!("{} 0 R", page_id));
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents {} 0 R /Resources << /Font << /F1 3 0 R >> >> >>",
            page_id + 1
        ));
        let stream = format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET", text);
        objects.push(format!(
            "<< /Length {} >> stream\n{}\nendstream",
            stream.len(),
            stream
        ));
    }
    objects[1] = format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        pages.len()
    );

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj {} endobj\n", i + 1, body).as_bytes());
    }
    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer << /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_start
        )
        .as_bytes(),
    );
    out
}
