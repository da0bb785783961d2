//! End-to-end CLI tests driving the compiled `tdk` binary in a temp
//! workspace. Embeddings stay disabled, so ingest is exercised through
//! `--dry-run` (extract + chunk, nothing written) and the error path.

mod common;

use common::{run_tdk, setup_workspace, two_page_pdf};
use std::fs;

#[test]
fn init_creates_sqlite_store() {
    let (tmp, config) = setup_workspace();

    let (stdout, stderr, ok) = run_tdk(&config, &["init"]);
    assert!(ok, "init failed: {}", stderr);
    assert!(stdout.contains("Vector store initialized (sqlite)"));
    assert!(tmp.path().join("data/tenderdesk.sqlite").exists());

    // Idempotent.
    let (_, stderr, ok) = run_tdk(&config, &["init"]);
    assert!(ok, "second init failed: {}", stderr);
}

#[test]
fn ledger_starts_empty() {
    let (_tmp, config) = setup_workspace();
    let (stdout, _, ok) = run_tdk(&config, &["ledger", "list"]);
    assert!(ok);
    assert!(stdout.contains("No documents ingested yet."));
}

#[test]
fn dry_run_ingest_reports_pages_and_chunks() {
    let (tmp, config) = setup_workspace();
    let pdf_path = tmp.path().join("tender.pdf");
    fs::write(
        &pdf_path,
        two_page_pdf("Supply of diesel generators", "Delivery within 60 days"),
    )
    .unwrap();

    let (stdout, stderr, ok) = run_tdk(
        &config,
        &["ingest", "--dry-run", pdf_path.to_str().unwrap()],
    );
    assert!(ok, "dry-run ingest failed: {}", stderr);
    assert!(stdout.contains("tender.pdf (dry-run)"), "stdout: {}", stdout);
    assert!(stdout.contains("pages: 2"), "stdout: {}", stdout);
    assert!(stdout.contains("estimated chunks: 2"), "stdout: {}", stdout);
    assert!(stdout.contains("(dry-run, nothing written)"));

    // Dry run must not touch the ledger or store the PDF.
    let (stdout, _, _) = run_tdk(&config, &["ledger", "list"]);
    assert!(stdout.contains("No documents ingested yet."));
    assert!(!tmp.path().join("stored_pdfs/tender.pdf").exists());
}

#[test]
fn real_ingest_requires_embedding_provider() {
    let (tmp, config) = setup_workspace();
    let pdf_path = tmp.path().join("tender.pdf");
    fs::write(&pdf_path, two_page_pdf("alpha", "beta")).unwrap();

    let (_, stderr, ok) = run_tdk(&config, &["ingest", pdf_path.to_str().unwrap()]);
    assert!(!ok);
    assert!(
        stderr.contains("Embedding provider is disabled"),
        "stderr: {}",
        stderr
    );
}

#[test]
fn ingest_rejects_non_pdf_arguments() {
    let (tmp, config) = setup_workspace();
    let txt_path = tmp.path().join("notes.txt");
    fs::write(&txt_path, "not a pdf").unwrap();

    let (_, stderr, ok) = run_tdk(&config, &["ingest", txt_path.to_str().unwrap()]);
    assert!(!ok);
    assert!(stderr.contains("not a PDF file"), "stderr: {}", stderr);
}

#[test]
fn dry_run_skips_malformed_pdf_with_warning() {
    let (tmp, config) = setup_workspace();
    let pdf_path = tmp.path().join("broken.pdf");
    fs::write(&pdf_path, b"%PDF-1.4 garbage").unwrap();

    let (stdout, stderr, ok) = run_tdk(
        &config,
        &["ingest", "--dry-run", pdf_path.to_str().unwrap()],
    );
    assert!(ok, "malformed file should be skipped, not fatal: {}", stderr);
    assert!(stderr.contains("skipping broken.pdf"), "stderr: {}", stderr);
    assert!(stdout.contains("failed: 1"), "stdout: {}", stdout);
}

#[test]
fn ledger_clear_reports() {
    let (_tmp, config) = setup_workspace();
    let (stdout, _, ok) = run_tdk(&config, &["ledger", "clear"]);
    assert!(ok);
    assert!(stdout.contains("Ledger cleared."));
}

#[test]
fn invalid_config_is_rejected() {
    let (tmp, _) = setup_workspace();
    let bad_config = tmp.path().join("bad.toml");
    fs::write(
        &bad_config,
        "[chunking]\nwindow_tokens = 100\noverlap_tokens = 200\n",
    )
    .unwrap();

    let (_, stderr, ok) = run_tdk(&bad_config, &["init"]);
    assert!(!ok);
    assert!(stderr.contains("overlap_tokens"), "stderr: {}", stderr);
}

#[test]
fn search_requires_embeddings() {
    let (_tmp, config) = setup_workspace();
    run_tdk(&config, &["init"]);
    let (_, stderr, ok) = run_tdk(&config, &["search", "delivery period"]);
    assert!(!ok);
    assert!(
        stderr.contains("Embedding provider is disabled"),
        "stderr: {}",
        stderr
    );
}
