//! End-to-end upload and query pipelines over the SQLite backend with
//! fake model providers.

mod common;

use askdocs::config::Config;
use askdocs::error::RagError;
use askdocs::models::FileType;
use askdocs::rag::FALLBACK_ANSWER;
use common::{pdf_with_pages, sqlite_service, CANNED_ANSWER, GARDEN_DOC, RUST_DOC};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn test_config(tmp: &TempDir) -> Config {
    let mut cfg = Config::default();
    cfg.storage.db_path = tmp.path().join("data").join("askdocs.sqlite");
    cfg.storage.upload_dir = tmp.path().join("uploads");
    cfg
}

fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// A minimal DOCX: just `word/document.xml` with one `<w:p>` per paragraph.
fn write_docx(dir: &Path, name: &str, paragraphs: &[&str]) -> PathBuf {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
        .collect();
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
        body
    );

    let path = dir.join(name);
    let file = std::fs::File::create(&path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
        .unwrap();
    zip.write_all(xml.as_bytes()).unwrap();
    zip.finish().unwrap();
    path
}

#[tokio::test]
async fn upload_then_query_returns_cited_answer() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    let t = sqlite_service(&cfg).await;

    let rust = write_file(tmp.path(), "rust.md", RUST_DOC);
    let garden = write_file(tmp.path(), "garden.txt", GARDEN_DOC);
    let rust_doc = t.service.upload_document(&rust, "rust.md").await.unwrap();
    t.service.upload_document(&garden, "garden.txt").await.unwrap();

    let resp = t
        .service
        .query("What does the borrow checker enforce?", None, &[])
        .await
        .unwrap();

    assert_eq!(resp.answer, CANNED_ANSWER);
    assert_eq!(resp.query, "What does the borrow checker enforce?");
    assert!(!resp.sources.is_empty() && resp.sources.len() <= 3);
    assert_eq!(resp.sources[0].document_id, rust_doc.document_id);
    for pair in resp.sources.windows(2) {
        assert!(pair[0].distance <= pair[1].distance);
    }
    assert!(resp.processing_time >= 0.0);
    assert_eq!(t.chat.calls(), 1);
}

#[tokio::test]
async fn documents_survive_reopening_the_database() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);

    let uploaded = {
        let t = sqlite_service(&cfg).await;
        let path = write_file(tmp.path(), "rust.md", RUST_DOC);
        t.service.upload_document(&path, "rust.md").await.unwrap()
    };

    let t = sqlite_service(&cfg).await;
    let list = t.service.list_documents().await.unwrap();
    assert_eq!(list.total_count, 1);
    assert_eq!(list.documents[0].id, uploaded.document_id);
    assert_eq!(list.documents[0].chunk_count, uploaded.chunk_count);

    let stats = t.service.stats().await.unwrap();
    assert_eq!(stats.total_chunks, uploaded.chunk_count);
    assert_eq!(stats.document_types, vec![FileType::Md]);

    let resp = t.service.query("cargo crates", None, &[]).await.unwrap();
    assert!(resp
        .sources
        .iter()
        .all(|s| s.document_id == uploaded.document_id));
}

#[tokio::test]
async fn docx_upload_is_chunked_by_paragraph_text() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    let t = sqlite_service(&cfg).await;

    let path = write_docx(
        tmp.path(),
        "policy.docx",
        &[
            "Employees accrue leave every month.",
            "Unused leave carries over once.",
        ],
    );
    let resp = t
        .service
        .upload_document(&path, "policy.docx")
        .await
        .unwrap();
    assert_eq!(resp.chunk_count, 1);

    let answer = t.service.query("leave", None, &[]).await.unwrap();
    assert_eq!(answer.sources.len(), 1);
    let content = &answer.sources[0].content;
    assert!(content.contains("Employees accrue leave every month."));
    assert!(content.contains("Unused leave carries over once."));
    assert_eq!(answer.sources[0].metadata.file_type, FileType::Docx);
}

#[tokio::test]
async fn pdf_upload_keeps_page_order() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    let t = sqlite_service(&cfg).await;

    let path = tmp.path().join("handbook.pdf");
    std::fs::write(
        &path,
        pdf_with_pages(&[
            "Refunds are issued within thirty days",
            "Shipping takes five business days",
        ]),
    )
    .unwrap();

    let resp = t
        .service
        .upload_document(&path, "handbook.pdf")
        .await
        .unwrap();
    assert_eq!(resp.chunk_count, 1);

    let answer = t.service.query("refunds", None, &[]).await.unwrap();
    assert_eq!(answer.sources.len(), 1);
    let source = &answer.sources[0];
    assert_eq!(source.metadata.file_type, FileType::Pdf);
    let refunds = source.content.find("Refunds are issued").unwrap();
    let shipping = source.content.find("Shipping takes five").unwrap();
    assert!(refunds < shipping);

    let stats = t.service.stats().await.unwrap();
    assert_eq!(stats.document_types, vec![FileType::Pdf]);
}

#[tokio::test]
async fn corrupt_pdf_is_an_extraction_failure_and_leaves_nothing() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    let t = sqlite_service(&cfg).await;

    let path = write_file(tmp.path(), "broken.pdf", "definitely not a pdf");
    let err = t
        .service
        .upload_document(&path, "broken.pdf")
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::ExtractionFailure(_)), "got {:?}", err);
    assert_eq!(t.embedder.calls(), 0);
    assert_eq!(t.service.list_documents().await.unwrap().total_count, 0);
}

#[tokio::test]
async fn delete_removes_only_that_documents_chunks() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    let t = sqlite_service(&cfg).await;

    let rust = write_file(tmp.path(), "rust.md", RUST_DOC);
    let garden = write_file(tmp.path(), "garden.txt", GARDEN_DOC);
    let rust_doc = t.service.upload_document(&rust, "rust.md").await.unwrap();
    let garden_doc = t
        .service
        .upload_document(&garden, "garden.txt")
        .await
        .unwrap();

    let before = t.service.stats().await.unwrap();
    assert!(t.service.delete_document(&rust_doc.document_id).await);

    let after = t.service.stats().await.unwrap();
    assert_eq!(after.total_documents, 1);
    assert_eq!(
        after.total_chunks,
        before.total_chunks - rust_doc.chunk_count
    );
    assert_eq!(after.document_types, vec![FileType::Txt]);

    let resp = t
        .service
        .query("borrow checker ownership", Some(10), &[])
        .await
        .unwrap();
    assert!(resp
        .sources
        .iter()
        .all(|s| s.document_id == garden_doc.document_id));

    // Second delete finds nothing.
    assert!(!t.service.delete_document(&rust_doc.document_id).await);
}

#[tokio::test]
async fn empty_knowledge_base_falls_back_without_llm() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    let t = sqlite_service(&cfg).await;

    let resp = t.service.query("anything at all?", None, &[]).await.unwrap();
    assert_eq!(resp.answer, FALLBACK_ANSWER);
    assert!(resp.sources.is_empty());
    assert_eq!(t.chat.calls(), 0);
}
