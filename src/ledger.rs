//! Dedup ledger: the persisted record of already-ingested documents.
//!
//! A flat JSON file of `{document, sha256, ingested_at}` entries keyed by
//! filename plus content hash. Re-ingesting identical bytes under the same
//! name is skipped; changed bytes under the same name hash differently and
//! are ingested again. A missing or corrupt ledger file reads as empty so
//! a fresh workspace needs no setup step.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub document: String,
    pub sha256: String,
    pub ingested_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    pub fn load(path: &Path) -> Self {
        let entries = std::fs::read_to_string(path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default();

        Self {
            path: path.to_path_buf(),
            entries,
        }
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Write-then-rename so a crash mid-write cannot truncate the ledger.
        let json = serde_json::to_string_pretty(&self.entries)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("failed to write ledger: {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace ledger: {}", self.path.display()))?;
        Ok(())
    }

    pub fn contains(&self, document: &str, sha256: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.document == document && e.sha256 == sha256)
    }

    pub fn mark(&mut self, document: &str, sha256: &str) {
        if self.contains(document, sha256) {
            return;
        }
        self.entries.push(LedgerEntry {
            document: document.to_string(),
            sha256: sha256.to_string(),
            ingested_at: Utc::now(),
        });
    }

    /// Distinct document names, sorted.
    pub fn documents(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.iter().map(|e| e.document.clone()).collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Hex SHA-256 of a file's bytes, the content half of the dedup identity.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let ledger = Ledger::load(&tmp.path().join("ledger.json"));
        assert!(ledger.is_empty());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ledger.json");
        std::fs::write(&path, "{not json").unwrap();
        let ledger = Ledger::load(&path);
        assert!(ledger.is_empty());
    }

    #[test]
    fn mark_save_reload_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data").join("ledger.json");

        let mut ledger = Ledger::load(&path);
        let hash = content_hash(b"tender body");
        ledger.mark("tender.pdf", &hash);
        ledger.mark("annex.pdf", &content_hash(b"annex body"));
        ledger.save().unwrap();

        let reloaded = Ledger::load(&path);
        assert!(reloaded.contains("tender.pdf", &hash));
        assert_eq!(reloaded.documents(), vec!["annex.pdf", "tender.pdf"]);
    }

    #[test]
    fn same_name_different_bytes_is_new() {
        let tmp = TempDir::new().unwrap();
        let mut ledger = Ledger::load(&tmp.path().join("ledger.json"));
        ledger.mark("tender.pdf", &content_hash(b"v1"));
        assert!(!ledger.contains("tender.pdf", &content_hash(b"v2")));
    }

    #[test]
    fn mark_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let mut ledger = Ledger::load(&tmp.path().join("ledger.json"));
        let hash = content_hash(b"v1");
        ledger.mark("tender.pdf", &hash);
        ledger.mark("tender.pdf", &hash);
        assert_eq!(ledger.entries().len(), 1);
    }

    #[test]
    fn clear_then_save_leaves_empty_ledger() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ledger.json");
        let mut ledger = Ledger::load(&path);
        ledger.mark("tender.pdf", &content_hash(b"v1"));
        ledger.save().unwrap();

        ledger.clear();
        ledger.save().unwrap();
        assert!(Ledger::load(&path).is_empty());
    }
}
