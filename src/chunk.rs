//! Sentence-aware, token-budgeted text chunker.
//!
//! Text is split into sentences on the literal sequence `". "`. Sentences are
//! accumulated greedily into a chunk until the next one would push the
//! chunk's token count past `chunk_size`; the chunk is then emitted and the
//! next one is seeded with an overlap prefix: as many trailing sentences of
//! the finished chunk as fit within `chunk_overlap` tokens.
//!
//! Each sentence is tokenized once. A chunk's size is the sum of its
//! sentences' counts plus the count of a `" "` separator between neighbors,
//! which for the bundled tokenizers never undercounts the joined text.
//!
//! A single sentence that is larger than `chunk_size` on its own is emitted
//! whole. Every other chunk measures at most `chunk_size` tokens.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::models::{Chunk, ChunkMetadata, FileType};
use crate::tokenizer::Tokenizer;

/// Splits text into overlapping chunks with a shared tokenizer.
#[derive(Clone)]
pub struct SentenceChunker {
    tokenizer: Arc<dyn Tokenizer>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl SentenceChunker {
    pub fn new(tokenizer: Arc<dyn Tokenizer>, chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            tokenizer,
            chunk_size,
            chunk_overlap,
        }
    }

    pub fn tokenizer(&self) -> &dyn Tokenizer {
        self.tokenizer.as_ref()
    }

    /// Split `text` into ordered chunk strings. Empty input yields no chunks.
    pub fn split(&self, text: &str) -> Vec<String> {
        let sentences = split_sentences(text);
        let counts: Vec<usize> = sentences
            .iter()
            .map(|s| self.tokenizer.count_tokens(s))
            .collect();
        let separator = self.tokenizer.count_tokens(" ");
        let mut chunks = Vec::new();

        // The current chunk is sentences[start..i]; `size` is its token count.
        let mut start = 0;
        let mut size = 0;

        for (i, &count) in counts.iter().enumerate() {
            if i == start {
                size = count;
                continue;
            }
            if size + separator + count <= self.chunk_size {
                size += separator + count;
                continue;
            }

            chunks.push(sentences[start..i].join(" "));

            let (taken, mut tail) = self.overlap_tail(&counts[start..i], separator);
            let mut seed = i - taken;
            // The overlap must not push the new chunk over budget.
            while seed < i && tail + separator + count > self.chunk_size {
                tail = if seed + 1 == i {
                    0
                } else {
                    tail - counts[seed] - separator
                };
                seed += 1;
            }

            start = seed;
            size = if seed < i { tail + separator + count } else { count };
        }

        if start < sentences.len() {
            chunks.push(sentences[start..].join(" "));
        }

        chunks
    }

    /// How many trailing sentences fit within the overlap budget, and their
    /// combined token count.
    fn overlap_tail(&self, counts: &[usize], separator: usize) -> (usize, usize) {
        let mut taken = 0;
        let mut tokens = 0;
        for &count in counts.iter().rev() {
            let grown = if taken == 0 {
                count
            } else {
                tokens + separator + count
            };
            if grown > self.chunk_overlap {
                break;
            }
            tokens = grown;
            taken += 1;
        }
        (taken, tokens)
    }
}

/// Break text on `". "`, restoring each sentence's period and dropping
/// empty fragments. The final fragment keeps whatever ending it had.
fn split_sentences(text: &str) -> Vec<String> {
    let pieces: Vec<&str> = text.split(". ").collect();
    let last = pieces.len().saturating_sub(1);

    pieces
        .iter()
        .enumerate()
        .filter_map(|(i, piece)| {
            let trimmed = piece.trim();
            if trimmed.is_empty() {
                None
            } else if i < last {
                Some(format!("{}.", trimmed))
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

/// Turn chunk strings into [`Chunk`]s with ids `{document_id}_{index}` and
/// per-chunk metadata. Indices are dense and follow `pieces` order.
pub fn build_chunks(
    document_id: &str,
    filename: &str,
    file_type: FileType,
    upload_date: DateTime<Utc>,
    pieces: Vec<String>,
    tokenizer: &dyn Tokenizer,
) -> Vec<Chunk> {
    let chunk_count = pieces.len();
    pieces
        .into_iter()
        .enumerate()
        .map(|(index, content)| Chunk {
            id: Chunk::make_id(document_id, index),
            metadata: ChunkMetadata {
                document_id: document_id.to_string(),
                filename: filename.to_string(),
                file_type,
                chunk_index: index,
                chunk_count,
                upload_date,
                token_count: tokenizer.count_tokens(&content),
            },
            content,
        })
        .collect()
}
