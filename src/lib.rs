//! # askdocs
//!
//! A document question-answering service built on retrieval-augmented
//! generation.
//!
//! Documents (PDF, DOCX, plain text, markdown) are uploaded, converted to
//! text, split into overlapping sentence-aligned chunks, embedded, and
//! stored in a vector index. Questions are answered by retrieving the
//! closest chunks and asking a chat model to answer from them, citing each
//! chunk as `Source N`.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────────────┐   ┌──────────────┐
//! │ Extract  │──▶│ Chunk → Embed → Add  │──▶│ VectorStore  │
//! │ pdf/docx │   │      (RagService)    │   │ + Registry   │
//! └──────────┘   └──────────┬───────────┘   └──────┬───────┘
//!                           │                      │
//!                ┌──────────┴──────────┐   search  │
//!                ▼                     ▼ ◀─────────┘
//!           ┌──────────┐         ┌──────────┐
//!           │   CLI    │         │   HTTP   │
//!           │(askdocs) │         │  (axum)  │
//!           └──────────┘         └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! askdocs init                          # create the database
//! askdocs upload ./handbook.pdf         # ingest a document
//! askdocs query "What is the leave policy?"
//! askdocs serve                         # start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types and response shapes |
//! | [`error`] | Request-level error taxonomy |
//! | [`extract`] | PDF / DOCX / text extraction |
//! | [`tokenizer`] | Token counting for chunk budgets |
//! | [`chunk`] | Sentence-aware chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`llm`] | Chat-completion client |
//! | [`store`] | Vector store trait and backends |
//! | [`registry`] | Registered-document bookkeeping |
//! | [`rag`] | Upload and query orchestration |
//! | [`server`] | HTTP API |
//! | [`commands`] | CLI command output |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod chunk;
pub mod commands;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod http;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod rag;
pub mod registry;
pub mod server;
pub mod store;
pub mod tokenizer;
