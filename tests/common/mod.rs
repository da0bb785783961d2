//! Shared helpers for CLI integration tests: locating the `tdk` binary,
//! writing a test config, and hand-building a minimal two-page PDF that
//! pdf-extract can parse.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub fn tdk_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("tdk");
    path
}

/// A workspace with a config pointing all paths into the temp dir.
/// Embeddings are disabled so no test touches a model or the network.
pub fn setup_workspace() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();

    let config_content = format!(
        r#"[storage]
pdf_dir = "{root}/stored_pdfs"
ledger_path = "{root}/data/ledger.json"
db_path = "{root}/data/tenderdesk.sqlite"

[chunking]
window_tokens = 1000
overlap_tokens = 200

[embedding]
provider = "disabled"

[server]
bind = "127.0.0.1:5001"
"#,
        root = root.display()
    );

    let config_path = root.join("tenderdesk.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

pub fn run_tdk(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = tdk_binary();
    let output = std::process::Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run tdk binary at {:?}: {}", binary, e));

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

/// Minimal valid two-page PDF with one text phrase per page. Builds the body
/// then the xref with correct byte offsets so pdf-extract can parse it.
pub fn two_page_pdf(page1_text: &str, page2_text: &str) -> Vec<u8> {
    let stream1 = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", page1_text);
    let stream2 = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", page2_text);

    let mut out = Vec::new();
    let mut offsets = Vec::new();

    out.extend_from_slice(b"%PDF-1.4\n");

    offsets.push(out.len());
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");

    offsets.push(out.len());
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 >> endobj\n");

    offsets.push(out.len());
    out.extend_from_slice(
        b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 5 0 R /Resources << /Font << /F1 7 0 R >> >> >> endobj\n",
    );

    offsets.push(out.len());
    out.extend_from_slice(
        b"4 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 6 0 R /Resources << /Font << /F1 7 0 R >> >> >> endobj\n",
    );

    offsets.push(out.len());
    out.extend_from_slice(
        format!(
            "5 0 obj << /Length {} >> stream\n{}\nendstream endobj\n",
            stream1.len(),
            stream1
        )
        .as_bytes(),
    );

    offsets.push(out.len());
    out.extend_from_slice(
        format!(
            "6 0 obj << /Length {} >> stream\n{}\nendstream endobj\n",
            stream2.len(),
            stream2
        )
        .as_bytes(),
    );

    offsets.push(out.len());
    out.extend_from_slice(
        b"7 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );

    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", offsets.len() + 1).as_bytes());
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in &offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer << /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            offsets.len() + 1,
            xref_start
        )
        .as_bytes(),
    );

    out
}
