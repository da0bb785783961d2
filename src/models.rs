//! Core data models used throughout tenderdesk.
//!
//! These types represent the pages, chunks, and retrieval results that flow
//! through the ingestion, fill, and chat pipelines.

/// Text extracted from a single PDF page. Page numbers are 1-based so they
/// match what a PDF viewer displays.
#[derive(Debug, Clone)]
pub struct PageText {
    pub page: u32,
    pub text: String,
}

/// A token-bounded slice of one page's text, the unit of embedding and
/// retrieval.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Deterministic id: `"{document_name}:{page}:{chunk_index}"`.
    pub id: String,
    pub document_name: String,
    pub page: u32,
    /// 0-based running index across the whole document.
    pub chunk_index: i64,
    pub text: String,
    /// SHA-256 of `text`, used for idempotent upserts.
    pub hash: String,
}

/// A chunk paired with its embedding vector, ready for the vector store.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// A chunk returned by k-nearest-neighbor retrieval.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub document_name: String,
    pub page: u32,
    pub text: String,
    /// Cosine similarity against the query, higher = closer.
    pub score: f64,
}

/// Supporting pages of one source document, reconciled from retrieved chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    pub document_name: String,
    /// Sorted, deduplicated page numbers.
    pub pages: Vec<u32>,
}

/// One completed question/answer exchange in a chat session.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub question: String,
    pub answer: String,
}

/// The answer to a chat question plus the sources that grounded it.
#[derive(Debug, Clone)]
pub struct ChatAnswer {
    pub answer: String,
    pub sources: Vec<SourceRef>,
}
