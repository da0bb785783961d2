//! Ingestion pipeline orchestration.
//!
//! Coordinates the full flow for each PDF: permanent storage copy →
//! dedup-ledger check → page extraction → chunking → embedding → vector
//! store insert → ledger mark. A file that fails extraction or embedding is
//! reported and skipped without touching the ledger, so the next run retries
//! it; files the ledger already records are skipped unless `--force`.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use crate::chunker::Chunker;
use crate::config::Config;
use crate::embedding;
use crate::ledger::{content_hash, Ledger};
use crate::models::{Chunk, ChunkRecord};
use crate::pdf;
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::store::VectorStore;

pub async fn run_ingest(
    config: &Config,
    store: &dyn VectorStore,
    paths: &[PathBuf],
    dry_run: bool,
    force: bool,
    reporter: &dyn ProgressReporter,
) -> Result<()> {
    if paths.is_empty() {
        bail!("No PDF files given");
    }
    if !dry_run && !config.embedding.is_enabled() {
        bail!("Embedding provider is disabled. Set [embedding] provider in config.");
    }

    let chunker = Chunker::new(&config.chunking)?;
    let mut ledger = Ledger::load(&config.storage.ledger_path);

    let mut ingested = 0u64;
    let mut skipped = 0u64;
    let mut failed = 0u64;
    let mut chunks_written = 0u64;

    for path in paths {
        let document_name = document_name_of(path)?;
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let hash = content_hash(&bytes);

        if !force && ledger.contains(&document_name, &hash) {
            println!("skip {} (already ingested)", document_name);
            skipped += 1;
            continue;
        }

        if dry_run {
            reporter.report(ProgressEvent::Extracting {
                document: document_name.clone(),
            });
            match extract_and_chunk(&chunker, path, &document_name) {
                Ok((pages, chunks)) => {
                    println!("{} (dry-run)", document_name);
                    println!("  pages: {}", pages);
                    println!("  estimated chunks: {}", chunks.len());
                }
                Err(e) => {
                    tracing::warn!("extraction failed for {}: {e:#}", document_name);
                    eprintln!("Warning: skipping {}: {e:#}", document_name);
                    failed += 1;
                }
            }
            continue;
        }

        // Store the PDF permanently first so citation links resolve even if
        // a later stage fails and the file is retried.
        std::fs::create_dir_all(&config.storage.pdf_dir)?;
        let stored_path = config.storage.pdf_dir.join(&document_name);
        std::fs::write(&stored_path, &bytes)
            .with_context(|| format!("failed to store {}", stored_path.display()))?;

        reporter.report(ProgressEvent::Extracting {
            document: document_name.clone(),
        });
        let chunks = match extract_and_chunk(&chunker, &stored_path, &document_name) {
            Ok((_, chunks)) => chunks,
            Err(e) => {
                tracing::warn!("extraction failed for {}: {e:#}", document_name);
                eprintln!("Warning: skipping {}: {e:#}", document_name);
                failed += 1;
                continue;
            }
        };

        match embed_and_insert(config, store, &chunks, &document_name, reporter).await {
            Ok(inserted) => {
                ledger.mark(&document_name, &hash);
                ledger.save()?;
                ingested += 1;
                chunks_written += inserted;
            }
            Err(e) => {
                tracing::warn!("ingest failed for {}: {e:#}", document_name);
                eprintln!("Warning: skipping {}: {e:#}", document_name);
                failed += 1;
            }
        }
    }

    println!("ingest");
    println!("  files: {}", paths.len());
    if dry_run {
        println!("  skipped (already ingested): {}", skipped);
        if failed > 0 {
            println!("  failed: {}", failed);
        }
        println!("  (dry-run, nothing written)");
    } else {
        println!("  ingested: {}", ingested);
        println!("  skipped (already ingested): {}", skipped);
        if failed > 0 {
            println!("  failed: {}", failed);
        }
        println!("  chunks written: {}", chunks_written);
    }
    println!("ok");

    Ok(())
}

fn document_name_of(path: &Path) -> Result<String> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow::anyhow!("not a file path: {}", path.display()))?;
    if !name.to_lowercase().ends_with(".pdf") {
        bail!("not a PDF file: {}", path.display());
    }
    Ok(name)
}

fn extract_and_chunk(
    chunker: &Chunker,
    path: &Path,
    document_name: &str,
) -> Result<(usize, Vec<Chunk>)> {
    let pages = pdf::extract_pages(path)?;
    let chunks = chunker.chunk_document(document_name, &pages)?;
    Ok((pages.len(), chunks))
}

async fn embed_and_insert(
    config: &Config,
    store: &dyn VectorStore,
    chunks: &[Chunk],
    document_name: &str,
    reporter: &dyn ProgressReporter,
) -> Result<u64> {
    let provider = embedding::create_provider(&config.embedding)?;
    let total = chunks.len() as u64;
    let mut records: Vec<ChunkRecord> = Vec::with_capacity(chunks.len());
    let mut embedded = 0u64;

    for batch in chunks.chunks(config.embedding.batch_size) {
        reporter.report(ProgressEvent::Embedding {
            document: document_name.to_string(),
            n: embedded,
            total,
        });

        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = embedding::embed_texts(provider.as_ref(), &config.embedding, &texts).await?;
        if vectors.len() != batch.len() {
            bail!(
                "embedding returned {} vectors for {} chunks",
                vectors.len(),
                batch.len()
            );
        }

        for (chunk, vector) in batch.iter().zip(vectors.into_iter()) {
            records.push(ChunkRecord {
                chunk: chunk.clone(),
                embedding: vector,
            });
        }
        embedded += batch.len() as u64;
    }

    reporter.report(ProgressEvent::Uploading {
        document: document_name.to_string(),
        n: 0,
        total,
    });
    store.insert(&records).await?;

    Ok(records.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_name_requires_pdf_extension() {
        assert_eq!(
            document_name_of(Path::new("/tmp/Tender Spec.PDF")).unwrap(),
            "Tender Spec.PDF"
        );
        assert!(document_name_of(Path::new("/tmp/notes.txt")).is_err());
    }
}
