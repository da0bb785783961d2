//! Page-level text extraction for tender PDFs.
//!
//! Extraction is pipeline-layer: the ingest command supplies a stored file
//! path and this module returns plain UTF-8 text per page. Extraction never
//! panics; a malformed file yields an error and the pipeline skips it.

use std::path::Path;

use crate::models::PageText;

/// Extraction error. Carries the underlying parser message.
#[derive(Debug)]
pub enum PdfError {
    Parse(String),
    /// The file parsed but contained no extractable text on any page.
    NoText,
}

impl std::fmt::Display for PdfError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PdfError::Parse(e) => write!(f, "PDF extraction failed: {}", e),
            PdfError::NoText => write!(f, "PDF contains no extractable text"),
        }
    }
}

impl std::error::Error for PdfError {}

/// Extracts per-page text from a PDF on disk. Page numbers are 1-based.
///
/// Pages that exist but carry no text (scanned images, separators) are kept
/// in the result with an empty body so page numbering stays aligned with the
/// viewer; the chunker produces nothing for them.
pub fn extract_pages(path: &Path) -> Result<Vec<PageText>, PdfError> {
    let pages =
        pdf_extract::extract_text_by_pages(path).map_err(|e| PdfError::Parse(e.to_string()))?;

    let out: Vec<PageText> = pages
        .into_iter()
        .enumerate()
        .map(|(idx, text)| PageText {
            page: idx as u32 + 1,
            text,
        })
        .collect();

    if out.iter().all(|p| p.text.trim().is_empty()) {
        return Err(PdfError::NoText);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_returns_parse_error() {
        let err = extract_pages(Path::new("/nonexistent/tender.pdf")).unwrap_err();
        assert!(matches!(err, PdfError::Parse(_)));
    }

    #[test]
    fn invalid_pdf_returns_parse_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf").unwrap();
        let err = extract_pages(&path).unwrap_err();
        assert!(matches!(err, PdfError::Parse(_)));
    }
}
