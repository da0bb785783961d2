use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub sheet: SheetConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Permanent home of ingested PDFs, also the directory `tdk serve` exposes.
    #[serde(default = "default_pdf_dir")]
    pub pdf_dir: PathBuf,
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            pdf_dir: default_pdf_dir(),
            ledger_path: default_ledger_path(),
            db_path: default_db_path(),
        }
    }
}

fn default_pdf_dir() -> PathBuf {
    PathBuf::from("stored_pdfs")
}
fn default_ledger_path() -> PathBuf {
    PathBuf::from("data/ledger.json")
}
fn default_db_path() -> PathBuf {
    PathBuf::from("data/tenderdesk.sqlite")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Tokens per chunk window.
    #[serde(default = "default_window_tokens")]
    pub window_tokens: usize,
    /// Tokens shared between consecutive windows. Must be < window_tokens.
    #[serde(default = "default_overlap_tokens")]
    pub overlap_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            window_tokens: default_window_tokens(),
            overlap_tokens: default_overlap_tokens(),
        }
    }
}

fn default_window_tokens() -> usize {
    1000
}
fn default_overlap_tokens() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `local`, `openai`, `ollama`, or `disabled`.
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_dims")]
    pub dims: usize,
    /// Base URL for the ollama provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embed_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: default_dims(),
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_embed_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_embedding_provider() -> String {
    "local".to_string()
}
fn default_dims() -> usize {
    384
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_embed_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    /// `openai` or `ollama`.
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Base URL override (defaults: `http://localhost:11434` for ollama,
    /// `https://api.openai.com/v1` for openai).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            url: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            max_retries: default_max_retries(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

fn default_llm_provider() -> String {
    "ollama".to_string()
}
fn default_llm_model() -> String {
    "gemma2".to_string()
}
fn default_max_tokens() -> u32 {
    512
}
fn default_temperature() -> f64 {
    0.7
}
fn default_llm_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// `sqlite` (local on-disk index) or `astra` (managed cloud vector DB).
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Astra Data API endpoint, e.g. `https://<id>-<region>.apps.astra.datastax.com`.
    #[serde(default)]
    pub api_endpoint: Option<String>,
    #[serde(default = "default_keyspace")]
    pub keyspace: String,
    #[serde(default)]
    pub collection: Option<String>,
    /// Documents per insertMany call against the remote backend.
    #[serde(default = "default_insert_batch")]
    pub insert_batch: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            api_endpoint: None,
            keyspace: default_keyspace(),
            collection: None,
            insert_batch: default_insert_batch(),
        }
    }
}

fn default_backend() -> String {
    "sqlite".to_string()
}
fn default_keyspace() -> String {
    "default_keyspace".to_string()
}
fn default_insert_batch() -> usize {
    20
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Chunks retrieved per chat question.
    #[serde(default = "default_chat_k")]
    pub chat_k: usize,
    /// Chunks retrieved per spreadsheet row.
    #[serde(default = "default_fill_k")]
    pub fill_k: usize,
    /// Chunks shown by `tdk search`.
    #[serde(default = "default_search_k")]
    pub search_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chat_k: default_chat_k(),
            fill_k: default_fill_k(),
            search_k: default_search_k(),
        }
    }
}

fn default_chat_k() -> usize {
    2
}
fn default_fill_k() -> usize {
    4
}
fn default_search_k() -> usize {
    8
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    /// How many recent turns are replayed to the model.
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_turns: default_history_turns(),
        }
    }
}

fn default_history_turns() -> usize {
    5
}

/// Where the fill command reads items from and writes answers to.
/// Columns are 1-based to match how spreadsheets number them.
#[derive(Debug, Deserialize, Clone)]
pub struct SheetConfig {
    /// Header text of the item description column.
    #[serde(default = "default_item_header")]
    pub item_header: String,
    /// Fallback item column when no header matches.
    #[serde(default = "default_item_column")]
    pub item_column: usize,
    #[serde(default = "default_document_column")]
    pub document_column: usize,
    #[serde(default = "default_pages_column")]
    pub pages_column: usize,
    #[serde(default = "default_details_column")]
    pub details_column: usize,
    #[serde(default = "default_header_rows")]
    pub header_rows: usize,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            item_header: default_item_header(),
            item_column: default_item_column(),
            document_column: default_document_column(),
            pages_column: default_pages_column(),
            details_column: default_details_column(),
            header_rows: default_header_rows(),
        }
    }
}

fn default_item_header() -> String {
    "Item Description".to_string()
}
fn default_item_column() -> usize {
    1
}
fn default_document_column() -> usize {
    2
}
fn default_pages_column() -> usize {
    3
}
fn default_details_column() -> usize {
    5
}
fn default_header_rows() -> usize {
    1
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Base URL used when building citation links, normally where `tdk serve`
    /// is reachable from a browser.
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            public_url: default_public_url(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:5001".to_string()
}
fn default_public_url() -> String {
    "http://localhost:5001".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.window_tokens == 0 {
        anyhow::bail!("chunking.window_tokens must be > 0");
    }
    if config.chunking.overlap_tokens >= config.chunking.window_tokens {
        anyhow::bail!("chunking.overlap_tokens must be < chunking.window_tokens");
    }

    match config.embedding.provider.as_str() {
        "disabled" | "local" | "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, local, openai, or ollama.",
            other
        ),
    }
    if config.embedding.is_enabled() && config.embedding.dims == 0 {
        anyhow::bail!(
            "embedding.dims must be > 0 when provider is '{}'",
            config.embedding.provider
        );
    }
    if matches!(config.embedding.provider.as_str(), "openai" | "ollama")
        && config.embedding.model.is_none()
    {
        anyhow::bail!(
            "embedding.model must be specified when provider is '{}'",
            config.embedding.provider
        );
    }

    match config.llm.provider.as_str() {
        "openai" | "ollama" => {}
        other => anyhow::bail!("Unknown llm provider: '{}'. Must be openai or ollama.", other),
    }

    match config.store.backend.as_str() {
        "sqlite" => {}
        "astra" => {
            if config.store.api_endpoint.is_none() {
                anyhow::bail!("store.api_endpoint must be set for the astra backend");
            }
            if config.store.collection.is_none() {
                anyhow::bail!("store.collection must be set for the astra backend");
            }
            if config.store.insert_batch == 0 {
                anyhow::bail!("store.insert_batch must be > 0");
            }
        }
        other => anyhow::bail!("Unknown store backend: '{}'. Must be sqlite or astra.", other),
    }

    for (name, k) in [
        ("retrieval.chat_k", config.retrieval.chat_k),
        ("retrieval.fill_k", config.retrieval.fill_k),
        ("retrieval.search_k", config.retrieval.search_k),
    ] {
        if k == 0 {
            anyhow::bail!("{} must be >= 1", name);
        }
    }

    if config.chat.history_turns == 0 {
        anyhow::bail!("chat.history_turns must be >= 1");
    }

    for (name, col) in [
        ("sheet.item_column", config.sheet.item_column),
        ("sheet.document_column", config.sheet.document_column),
        ("sheet.pages_column", config.sheet.pages_column),
        ("sheet.details_column", config.sheet.details_column),
    ] {
        if col == 0 {
            anyhow::bail!("{} is 1-based and must be >= 1", name);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_str)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.chunking.window_tokens, 1000);
        assert_eq!(config.chunking.overlap_tokens, 200);
        assert_eq!(config.embedding.provider, "local");
        assert_eq!(config.embedding.dims, 384);
        assert_eq!(config.store.backend, "sqlite");
        assert_eq!(config.retrieval.chat_k, 2);
        assert_eq!(config.retrieval.fill_k, 4);
        assert_eq!(config.chat.history_turns, 5);
        assert_eq!(config.server.bind, "127.0.0.1:5001");
    }

    #[test]
    fn overlap_must_be_smaller_than_window() {
        let err = parse("[chunking]\nwindow_tokens = 100\noverlap_tokens = 100\n").unwrap_err();
        assert!(err.to_string().contains("overlap_tokens"));
    }

    #[test]
    fn unknown_embedding_provider_rejected() {
        let err = parse("[embedding]\nprovider = \"cohere\"\n").unwrap_err();
        assert!(err.to_string().contains("Unknown embedding provider"));
    }

    #[test]
    fn remote_embedding_requires_model() {
        let err = parse("[embedding]\nprovider = \"openai\"\n").unwrap_err();
        assert!(err.to_string().contains("embedding.model"));
    }

    #[test]
    fn astra_backend_requires_endpoint_and_collection() {
        let err = parse("[store]\nbackend = \"astra\"\n").unwrap_err();
        assert!(err.to_string().contains("api_endpoint"));

        let config = parse(
            "[store]\nbackend = \"astra\"\napi_endpoint = \"https://db.example.com\"\ncollection = \"tenders\"\n",
        )
        .unwrap();
        assert_eq!(config.store.keyspace, "default_keyspace");
        assert_eq!(config.store.insert_batch, 20);
    }

    #[test]
    fn unknown_backend_rejected() {
        let err = parse("[store]\nbackend = \"pinecone\"\n").unwrap_err();
        assert!(err.to_string().contains("Unknown store backend"));
    }

    #[test]
    fn zero_retrieval_k_rejected() {
        let err = parse("[retrieval]\nchat_k = 0\n").unwrap_err();
        assert!(err.to_string().contains("chat_k"));
    }

    #[test]
    fn sheet_columns_are_one_based() {
        let err = parse("[sheet]\npages_column = 0\n").unwrap_err();
        assert!(err.to_string().contains("pages_column"));
    }
}
