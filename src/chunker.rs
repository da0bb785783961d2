//! Token-window text chunker.
//!
//! Splits each page's extracted text into overlapping windows of
//! `window_tokens` tokens advancing by `window_tokens - overlap_tokens`,
//! so consecutive chunks share `overlap_tokens` tokens of context. Windows
//! never cross page boundaries, which keeps every chunk attributable to a
//! single page for citations.
//!
//! Each chunk receives a deterministic id derived from its document, page,
//! and index, plus a SHA-256 hash of its text for idempotent upserts.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tiktoken_rs::{cl100k_base, CoreBPE};

use crate::config::ChunkingConfig;
use crate::models::{Chunk, PageText};

pub struct Chunker {
    bpe: CoreBPE,
    window: usize,
    stride: usize,
}

impl Chunker {
    pub fn new(config: &ChunkingConfig) -> Result<Self> {
        let bpe = cl100k_base().context("failed to load cl100k_base tokenizer")?;
        Ok(Self {
            bpe,
            window: config.window_tokens,
            // overlap < window is enforced by config validation, so stride >= 1
            stride: config.window_tokens - config.overlap_tokens,
        })
    }

    /// Chunk every page of a document. Empty pages contribute no chunks;
    /// `chunk_index` runs contiguously across the whole document.
    pub fn chunk_document(&self, document_name: &str, pages: &[PageText]) -> Result<Vec<Chunk>> {
        let mut chunks = Vec::new();
        let mut index: i64 = 0;

        for page in pages {
            if page.text.trim().is_empty() {
                continue;
            }

            let tokens = self.bpe.encode_ordinary(&page.text);
            let mut start = 0usize;
            while start < tokens.len() {
                let end = (start + self.window).min(tokens.len());
                let text = self
                    .bpe
                    .decode(tokens[start..end].to_vec())
                    .with_context(|| {
                        format!("failed to decode chunk {} of {}", index, document_name)
                    })?;

                chunks.push(make_chunk(document_name, page.page, index, &text));
                index += 1;
                start += self.stride;
            }
        }

        Ok(chunks)
    }

    /// Number of tokens in a text, as the chunker counts them.
    pub fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

fn make_chunk(document_name: &str, page: u32, index: i64, text: &str) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: format!("{}:{}:{}", document_name, page, index),
        document_name: document_name.to_string(),
        page,
        chunk_index: index,
        text: text.to_string(),
        hash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(window: usize, overlap: usize) -> Chunker {
        Chunker::new(&ChunkingConfig {
            window_tokens: window,
            overlap_tokens: overlap,
        })
        .unwrap()
    }

    fn page(n: u32, text: &str) -> PageText {
        PageText {
            page: n,
            text: text.to_string(),
        }
    }

    /// Windows start at every multiple of the stride below `n`.
    fn expected_windows(n: usize, stride: usize) -> usize {
        n.div_ceil(stride)
    }

    #[test]
    fn short_page_yields_single_chunk() {
        let c = chunker(1000, 200);
        let chunks = c
            .chunk_document("tender.pdf", &[page(1, "Supply of diesel generators.")])
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].page, 1);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].id, "tender.pdf:1:0");
        assert_eq!(chunks[0].text, "Supply of diesel generators.");
    }

    #[test]
    fn empty_and_whitespace_pages_yield_nothing() {
        let c = chunker(1000, 200);
        let chunks = c
            .chunk_document("tender.pdf", &[page(1, ""), page(2, "   \n  ")])
            .unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn long_page_splits_into_overlapping_windows() {
        let c = chunker(8, 2);
        let text = (0..40).map(|i| format!("word{}", i)).collect::<Vec<_>>().join(" ");
        let n_tokens = c.count_tokens(&text);
        assert!(n_tokens > 8, "test text must exceed one window");

        let chunks = c.chunk_document("t.pdf", &[page(1, &text)]).unwrap();
        assert_eq!(chunks.len(), expected_windows(n_tokens, 6));

        // Decoding a token sub-window yields a contiguous slice of the page,
        // so every chunk is a substring and consecutive chunks overlap.
        let positions: Vec<usize> = chunks
            .iter()
            .map(|chunk| {
                assert!(c.count_tokens(&chunk.text) <= 8);
                text.find(&chunk.text).expect("chunk must be a page substring")
            })
            .collect();
        for (i, pair) in chunks.windows(2).enumerate() {
            assert!(positions[i + 1] > positions[i]);
            assert!(
                positions[i + 1] < positions[i] + pair[0].text.len(),
                "consecutive windows must overlap"
            );
        }
    }

    #[test]
    fn chunk_index_runs_across_pages() {
        let c = chunker(8, 2);
        let long = (0..30).map(|i| format!("item{}", i)).collect::<Vec<_>>().join(" ");
        let chunks = c
            .chunk_document("t.pdf", &[page(1, &long), page(2, "short tail page")])
            .unwrap();

        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i as i64);
        }
        assert_eq!(chunks.last().unwrap().page, 2);

        // Windows never span pages: all but the last chunk of page 1 carry page 1.
        let last_p1 = chunks.iter().rposition(|c| c.page == 1).unwrap();
        assert!(chunks[..=last_p1].iter().all(|c| c.page == 1));
    }

    #[test]
    fn ids_are_unique_and_deterministic() {
        let c = chunker(8, 2);
        let text = (0..30).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
        let a = c.chunk_document("t.pdf", &[page(1, &text)]).unwrap();
        let b = c.chunk_document("t.pdf", &[page(1, &text)]).unwrap();

        let mut ids: Vec<&str> = a.iter().map(|c| c.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), a.len());

        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.id, y.id);
            assert_eq!(x.hash, y.hash);
            assert_eq!(x.text, y.text);
        }
    }
}
