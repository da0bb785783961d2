//! Ingest and fill progress reporting.
//!
//! Long commands report observable progress so users see which document or
//! row is being worked on and how much is left. Progress is emitted on
//! **stderr** so stdout remains parseable for scripts.

use std::io::Write;

/// A single progress event.
#[derive(Clone, Debug)]
pub enum ProgressEvent {
    /// Extracting page text from a document. Page count unknown until done.
    Extracting { document: String },
    /// Embedding chunks: n of total for a document.
    Embedding { document: String, n: u64, total: u64 },
    /// Uploading chunk records to the vector store: n of total.
    Uploading { document: String, n: u64, total: u64 },
    /// Filling a spreadsheet row: n of total, with a short item excerpt.
    FillingRow { n: u64, total: u64, item: String },
}

/// Reports progress. Implementations write to stderr.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Human-friendly progress: `"ingest tender.pdf  embedding  120 / 412 chunks"`.
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::Extracting { document } => {
                format!("ingest {}  extracting pages...\n", document)
            }
            ProgressEvent::Embedding { document, n, total } => format!(
                "ingest {}  embedding  {} / {} chunks\n",
                document,
                format_number(*n),
                format_number(*total)
            ),
            ProgressEvent::Uploading { document, n, total } => format!(
                "ingest {}  uploading  {} / {} chunks\n",
                document,
                format_number(*n),
                format_number(*total)
            ),
            ProgressEvent::FillingRow { n, total, item } => {
                let excerpt: String = item.chars().take(50).collect();
                format!("fill  item {} / {}  {}\n", n, total, excerpt)
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// No-op reporter when progress is disabled (non-TTY stderr, tests).
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Default reporter: human progress when stderr is a TTY, otherwise off.
pub fn default_reporter() -> Box<dyn ProgressReporter> {
    if atty::is(atty::Stream::Stderr) {
        Box::new(StderrProgress)
    } else {
        Box::new(NoProgress)
    }
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }
}
