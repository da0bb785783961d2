//! Query-time retrieval and source reconciliation.
//!
//! A retrieval hit knows which chunk matched; the user-facing surfaces
//! (chat citations, spreadsheet cells) need the originating document and
//! page instead. [`collect_sources`] folds retrieved chunks back into
//! per-document page sets, and [`citation_link`] turns one of those pages
//! into a URL the PDF server resolves to the right file and page.

use anyhow::Result;

use crate::config::Config;
use crate::embedding;
use crate::models::{RetrievedChunk, SourceRef};
use crate::store::VectorStore;

pub struct Retriever<'a> {
    config: &'a Config,
    store: &'a dyn VectorStore,
}

impl<'a> Retriever<'a> {
    pub fn new(config: &'a Config, store: &'a dyn VectorStore) -> Self {
        Self { config, store }
    }

    /// Top-`k` stored chunks most similar to `query`.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        let provider = embedding::create_provider(&self.config.embedding)?;
        let query_vec =
            embedding::embed_query(provider.as_ref(), &self.config.embedding, query).await?;
        self.store.search(&query_vec, k).await
    }
}

/// Reconcile retrieved chunks into per-document source references:
/// pages deduplicated and sorted within a document, documents sorted by name.
/// Chunks without a usable page (page 0) still pin their document.
pub fn collect_sources(chunks: &[RetrievedChunk]) -> Vec<SourceRef> {
    let mut sources: Vec<SourceRef> = Vec::new();

    for chunk in chunks {
        let idx = match sources
            .iter()
            .position(|s| s.document_name == chunk.document_name)
        {
            Some(i) => i,
            None => {
                sources.push(SourceRef {
                    document_name: chunk.document_name.clone(),
                    pages: Vec::new(),
                });
                sources.len() - 1
            }
        };
        if chunk.page > 0 && !sources[idx].pages.contains(&chunk.page) {
            sources[idx].pages.push(chunk.page);
        }
    }

    for source in &mut sources {
        source.pages.sort_unstable();
    }
    sources.sort_by(|a, b| a.document_name.cmp(&b.document_name));
    sources
}

/// All pages across all sources, deduplicated and sorted; the flat list
/// shown in the spreadsheet's pages cell.
pub fn all_pages(sources: &[SourceRef]) -> Vec<u32> {
    let mut pages: Vec<u32> = sources.iter().flat_map(|s| s.pages.iter().copied()).collect();
    pages.sort_unstable();
    pages.dedup();
    pages
}

/// Comma-separated page list, e.g. `"3, 7, 12"`.
pub fn pages_display(pages: &[u32]) -> String {
    pages
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Citation back-link understood by the PDF server and PDF viewers:
/// `{public_url}/pdf/{document}#page={page}`.
pub fn citation_link(public_url: &str, document: &str, page: u32) -> String {
    format!(
        "{}/pdf/{}#page={}",
        public_url.trim_end_matches('/'),
        document,
        page
    )
}

/// Run `tdk search`: retrieve and print raw chunks with scores.
pub async fn run_search(
    config: &Config,
    store: &dyn VectorStore,
    query: &str,
    limit: Option<usize>,
) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let k = limit.unwrap_or(config.retrieval.search_k);
    let retriever = Retriever::new(config, store);
    let hits = retriever.retrieve(query, k).await?;

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        let excerpt: String = hit.text.chars().take(240).collect();
        println!(
            "{}. [{:.3}] {} p.{}",
            i + 1,
            hit.score,
            hit.document_name,
            hit.page
        );
        println!("    excerpt: \"{}\"", excerpt.replace('\n', " ").trim());
        println!(
            "    link: {}",
            citation_link(&config.server.public_url, &hit.document_name, hit.page)
        );
        println!();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(document: &str, page: u32, score: f64) -> RetrievedChunk {
        RetrievedChunk {
            document_name: document.to_string(),
            page,
            text: String::new(),
            score,
        }
    }

    #[test]
    fn collect_sources_groups_and_sorts() {
        let chunks = vec![
            hit("b.pdf", 7, 0.9),
            hit("a.pdf", 12, 0.8),
            hit("b.pdf", 3, 0.7),
            hit("a.pdf", 12, 0.6),
        ];
        let sources = collect_sources(&chunks);
        assert_eq!(
            sources,
            vec![
                SourceRef {
                    document_name: "a.pdf".to_string(),
                    pages: vec![12],
                },
                SourceRef {
                    document_name: "b.pdf".to_string(),
                    pages: vec![3, 7],
                },
            ]
        );
    }

    #[test]
    fn collect_sources_keeps_document_without_page() {
        let sources = collect_sources(&[hit("a.pdf", 0, 0.9)]);
        assert_eq!(sources.len(), 1);
        assert!(sources[0].pages.is_empty());
    }

    #[test]
    fn collect_sources_empty() {
        assert!(collect_sources(&[]).is_empty());
    }

    #[test]
    fn all_pages_flattens_across_documents() {
        let sources = collect_sources(&[hit("b.pdf", 7, 0.9), hit("a.pdf", 3, 0.8), hit("c.pdf", 7, 0.7)]);
        assert_eq!(all_pages(&sources), vec![3, 7]);
    }

    #[test]
    fn pages_display_format() {
        assert_eq!(pages_display(&[3, 7, 12]), "3, 7, 12");
        assert_eq!(pages_display(&[]), "");
    }

    #[test]
    fn citation_link_format() {
        assert_eq!(
            citation_link("http://localhost:5001", "tender.pdf", 4),
            "http://localhost:5001/pdf/tender.pdf#page=4"
        );
        assert_eq!(
            citation_link("http://localhost:5001/", "tender.pdf", 4),
            "http://localhost:5001/pdf/tender.pdf#page=4"
        );
    }
}
