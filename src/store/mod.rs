//! Vector store abstraction.
//!
//! Two interchangeable backends hold chunk embeddings:
//! - **[`sqlite`]** — a local on-disk index (chunk rows + vector BLOBs,
//!   cosine ranking in process). Zero external services.
//! - **[`astra`]** — a managed cloud vector database reached over its JSON
//!   document HTTP API.
//!
//! Both store the same per-chunk payload (text, document name, page) so
//! retrieval results can be cited regardless of backend.

pub mod astra;
pub mod sqlite;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::config::Config;
use crate::models::{ChunkRecord, RetrievedChunk};

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Backend name for status output (`"sqlite"` or `"astra"`).
    fn backend_name(&self) -> &str;

    /// Create the schema / collection if it does not exist. Idempotent.
    async fn ensure_ready(&self) -> Result<()>;

    /// Upsert chunk records. Re-inserting a chunk id replaces its payload
    /// and vector, so re-ingesting a document is idempotent.
    async fn insert(&self, records: &[ChunkRecord]) -> Result<()>;

    /// The `k` stored chunks nearest to `query` by cosine similarity,
    /// best first.
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievedChunk>>;

    /// Remove every stored chunk.
    async fn clear(&self) -> Result<()>;

    /// Number of stored chunks.
    async fn count(&self) -> Result<u64>;
}

/// Open the vector store selected by `store.backend` and make sure its
/// schema / collection exists (collections are created on demand, so a
/// fresh workspace needs no separate setup step).
pub async fn open_store(config: &Config) -> Result<Box<dyn VectorStore>> {
    let store: Box<dyn VectorStore> = match config.store.backend.as_str() {
        "sqlite" => Box::new(sqlite::SqliteStore::connect(&config.storage.db_path).await?),
        "astra" => Box::new(astra::AstraStore::new(&config.store, config.embedding.dims)?),
        other => bail!("Unknown store backend: {}", other),
    };
    store.ensure_ready().await?;
    Ok(store)
}
