//! Managed cloud vector store backend (DataStax Astra DB).
//!
//! Talks to the Astra Data API: one JSON command per request against
//! `{endpoint}/api/json/v1/{keyspace}[/{collection}]`, authenticated with an
//! application token from `ASTRA_DB_APPLICATION_TOKEN`. Embeddings are
//! computed client-side and shipped in the `$vector` field; retrieval sorts
//! by `$vector` with `includeSimilarity` so scores line up with the sqlite
//! backend's cosine scores.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

use crate::config::StoreConfig;
use crate::models::{ChunkRecord, RetrievedChunk};
use crate::store::VectorStore;

const TOKEN_ENV: &str = "ASTRA_DB_APPLICATION_TOKEN";

pub struct AstraStore {
    http: reqwest::Client,
    keyspace_url: String,
    collection_url: String,
    collection: String,
    token: String,
    dims: usize,
    insert_batch: usize,
}

impl AstraStore {
    pub fn new(config: &StoreConfig, dims: usize) -> Result<Self> {
        let endpoint = config
            .api_endpoint
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("store.api_endpoint required for the astra backend"))?
            .trim_end_matches('/')
            .to_string();
        let collection = config
            .collection
            .clone()
            .ok_or_else(|| anyhow::anyhow!("store.collection required for the astra backend"))?;
        let token = std::env::var(TOKEN_ENV)
            .map_err(|_| anyhow::anyhow!("{} environment variable not set", TOKEN_ENV))?;

        let keyspace_url = format!("{}/api/json/v1/{}", endpoint, config.keyspace);
        let collection_url = format!("{}/{}", keyspace_url, collection);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            keyspace_url,
            collection_url,
            collection,
            token,
            dims,
            insert_batch: config.insert_batch,
        })
    }

    async fn command(&self, url: &str, body: serde_json::Value) -> Result<serde_json::Value> {
        let response = self
            .http
            .post(url)
            .header("Token", &self.token)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Astra request failed")?;

        let status = response.status();
        let json: serde_json::Value = response
            .json()
            .await
            .with_context(|| format!("Astra returned a non-JSON response (status {})", status))?;

        if !status.is_success() {
            bail!("Astra API error {}: {}", status, json);
        }
        if let Some(errors) = json.get("errors").and_then(|e| e.as_array()) {
            if !errors.is_empty() {
                bail!("Astra command failed: {}", serde_json::Value::Array(errors.clone()));
            }
        }

        Ok(json)
    }
}

#[async_trait]
impl VectorStore for AstraStore {
    fn backend_name(&self) -> &str {
        "astra"
    }

    async fn ensure_ready(&self) -> Result<()> {
        // createCollection is idempotent for matching options.
        self.command(
            &self.keyspace_url,
            json!({
                "createCollection": {
                    "name": self.collection,
                    "options": {
                        "vector": { "dimension": self.dims, "metric": "cosine" }
                    }
                }
            }),
        )
        .await?;
        Ok(())
    }

    async fn insert(&self, records: &[ChunkRecord]) -> Result<()> {
        for batch in records.chunks(self.insert_batch) {
            let documents: Vec<serde_json::Value> = batch
                .iter()
                .map(|record| {
                    json!({
                        "_id": record.chunk.id,
                        "$vector": record.embedding,
                        "content": record.chunk.text,
                        "page": record.chunk.page,
                        "document_name": record.chunk.document_name,
                        "chunk_index": record.chunk.chunk_index,
                        "hash": record.chunk.hash,
                    })
                })
                .collect();

            self.command(
                &self.collection_url,
                json!({
                    "insertMany": {
                        "documents": documents,
                        "options": { "ordered": false }
                    }
                }),
            )
            .await?;
        }
        Ok(())
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        let json = self
            .command(
                &self.collection_url,
                json!({
                    "find": {
                        "sort": { "$vector": query },
                        "projection": { "content": 1, "page": 1, "document_name": 1 },
                        "options": { "limit": k, "includeSimilarity": true }
                    }
                }),
            )
            .await?;

        parse_find_response(&json)
    }

    async fn clear(&self) -> Result<()> {
        // deleteMany removes pages of documents per call; loop until done.
        loop {
            let json = self
                .command(&self.collection_url, json!({ "deleteMany": { "filter": {} } }))
                .await?;
            let more = json
                .get("status")
                .and_then(|s| s.get("moreData"))
                .and_then(|m| m.as_bool())
                .unwrap_or(false);
            if !more {
                return Ok(());
            }
        }
    }

    async fn count(&self) -> Result<u64> {
        let json = self
            .command(&self.collection_url, json!({ "estimatedDocumentCount": {} }))
            .await?;
        json.get("status")
            .and_then(|s| s.get("count"))
            .and_then(|c| c.as_u64())
            .ok_or_else(|| anyhow::anyhow!("Invalid Astra response: missing status.count"))
    }
}

fn parse_find_response(json: &serde_json::Value) -> Result<Vec<RetrievedChunk>> {
    let documents = json
        .get("data")
        .and_then(|d| d.get("documents"))
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid Astra response: missing data.documents"))?;

    let mut results = Vec::with_capacity(documents.len());

    for doc in documents {
        let text = doc
            .get("content")
            .and_then(|c| c.as_str())
            .unwrap_or_default()
            .to_string();
        let document_name = doc
            .get("document_name")
            .and_then(|n| n.as_str())
            .unwrap_or("unknown")
            .to_string();
        let page = doc.get("page").and_then(|p| p.as_u64()).unwrap_or(0) as u32;
        let score = doc
            .get("$similarity")
            .and_then(|s| s.as_f64())
            .unwrap_or(0.0);

        results.push(RetrievedChunk {
            document_name,
            page,
            text,
            score,
        });
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_find_documents() {
        let json = serde_json::json!({
            "data": {
                "documents": [
                    {
                        "_id": "tender.pdf:3:7",
                        "content": "Delivery within 60 days.",
                        "page": 3,
                        "document_name": "tender.pdf",
                        "$similarity": 0.91
                    },
                    {
                        "_id": "annex.pdf:1:0",
                        "content": "Warranty terms.",
                        "page": 1,
                        "document_name": "annex.pdf",
                        "$similarity": 0.84
                    }
                ]
            }
        });

        let hits = parse_find_response(&json).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].document_name, "tender.pdf");
        assert_eq!(hits[0].page, 3);
        assert!((hits[0].score - 0.91).abs() < 1e-9);
        assert_eq!(hits[1].text, "Warranty terms.");
    }

    #[test]
    fn parse_find_rejects_wrong_shape() {
        assert!(parse_find_response(&serde_json::json!({"data": {}})).is_err());
        assert!(parse_find_response(&serde_json::json!({})).is_err());
    }
}
