//! Retrieval-augmented spreadsheet filler.
//!
//! Walks the line items of an input workbook, retrieves supporting context
//! for each item description, asks the language model to summarize only that
//! context, and writes the answer plus the supporting document name and page
//! numbers into the designated columns of an output workbook.
//!
//! Tender templates lean heavily on merged cells, so the filler reads the
//! input's merged regions and routes every read and write through the
//! region's top-left anchor, then re-creates the merges in the output.

use anyhow::{bail, Context, Result};
use calamine::{open_workbook, Data as DataType, Reader, Xlsx};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::llm;
use crate::models::RetrievedChunk;
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::retrieval::{self, Retriever};
use crate::store::VectorStore;

/// A merged cell range, 0-based and inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedRegion {
    pub first_row: u32,
    pub first_col: u16,
    pub last_row: u32,
    pub last_col: u16,
}

impl MergedRegion {
    pub fn contains(&self, row: u32, col: u16) -> bool {
        row >= self.first_row && row <= self.last_row && col >= self.first_col && col <= self.last_col
    }

    fn anchor(&self) -> (u32, u16) {
        (self.first_row, self.first_col)
    }
}

/// Resolve a cell target through the merged regions: a cell inside a region
/// maps to the region's top-left anchor, any other cell maps to itself.
pub fn anchor_of(regions: &[MergedRegion], row: u32, col: u16) -> (u32, u16) {
    regions
        .iter()
        .find(|r| r.contains(row, col))
        .map(|r| r.anchor())
        .unwrap_or((row, col))
}

/// The first worksheet of a workbook as an absolute grid of display strings
/// plus its merged regions.
pub struct SheetData {
    pub rows: Vec<Vec<String>>,
    pub merges: Vec<MergedRegion>,
}

impl SheetData {
    pub fn value(&self, row: u32, col: u16) -> &str {
        let (row, col) = anchor_of(&self.merges, row, col);
        self.rows
            .get(row as usize)
            .and_then(|r| r.get(col as usize))
            .map(|s| s.as_str())
            .unwrap_or("")
    }

    pub fn set_value(&mut self, row: u32, col: u16, value: String) {
        let (row, col) = anchor_of(&self.merges, row, col);
        let row = row as usize;
        let col = col as usize;
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        if self.rows[row].len() <= col {
            self.rows[row].resize(col + 1, String::new());
        }
        self.rows[row][col] = value;
    }
}

fn cell_to_string(cell: &DataType) -> String {
    match cell {
        DataType::Empty => String::new(),
        DataType::String(s) => s.clone(),
        DataType::Int(i) => i.to_string(),
        DataType::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        DataType::Float(f) => f.to_string(),
        DataType::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Read the first worksheet of an xlsx file into a [`SheetData`] grid.
pub fn read_sheet(path: &Path) -> Result<SheetData> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .with_context(|| format!("failed to open workbook: {}", path.display()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("workbook contains no worksheets"))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .with_context(|| format!("failed to read worksheet '{}'", sheet_name))?;

    // The used range may not start at A1; rebuild an absolute grid so row
    // and column indexes line up with the configured target columns.
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let mut rows: Vec<Vec<String>> = Vec::new();
    for (r, row) in range.rows().enumerate() {
        let abs_row = start_row as usize + r;
        if rows.len() <= abs_row {
            rows.resize_with(abs_row + 1, Vec::new);
        }
        let mut cells = vec![String::new(); start_col as usize];
        cells.extend(row.iter().map(cell_to_string));
        rows[abs_row] = cells;
    }

    workbook.load_merged_regions()?;
    let merges: Vec<MergedRegion> = workbook
        .merged_regions()
        .iter()
        .filter(|(sheet, _, _)| sheet == &sheet_name)
        .map(|(_, _, dims)| MergedRegion {
            first_row: dims.start.0,
            first_col: dims.start.1 as u16,
            last_row: dims.end.0,
            last_col: dims.end.1 as u16,
        })
        .collect();

    Ok(SheetData { rows, merges })
}

/// Write a [`SheetData`] grid to an xlsx file, re-creating merged regions.
pub fn write_sheet(sheet: &SheetData, path: &Path) -> Result<()> {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let worksheet = workbook.add_worksheet();
    let format = rust_xlsxwriter::Format::new();

    for region in &sheet.merges {
        let (row, col) = region.anchor();
        worksheet.merge_range(
            region.first_row,
            region.first_col,
            region.last_row,
            region.last_col,
            sheet.value(row, col),
            &format,
        )?;
    }

    for (r, row) in sheet.rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            let (r, c) = (r as u32, c as u16);
            if sheet.merges.iter().any(|m| m.contains(r, c)) {
                continue;
            }
            worksheet.write_string(r, c, value.as_str())?;
        }
    }

    workbook
        .save(path)
        .with_context(|| format!("failed to save workbook: {}", path.display()))?;
    Ok(())
}

/// Locate the item description column in the header row: case-insensitive
/// header match first, configured column as fallback.
pub fn find_item_column(header: &[String], item_header: &str, fallback_column: usize) -> u16 {
    header
        .iter()
        .position(|cell| cell.trim().eq_ignore_ascii_case(item_header))
        .map(|idx| idx as u16)
        .unwrap_or((fallback_column - 1) as u16)
}

fn extraction_prompt(item: &str, context: &[RetrievedChunk]) -> String {
    let rule = "-".repeat(40);
    let joined: Vec<&str> = context.iter().map(|c| c.text.trim()).collect();
    format!(
        "Given the following context extracted from a tender PDF, extract a concise \
         description for the item only from the context below. Do not explain the \
         item: \"{}\".\n\n\
         Return only the relevant technical and commercial information related to \
         the item.\n\
         Do not explain the item.\n\
         If no information relevant to the item is found, say \"No information found \
         in context\".\n\n\
         Context:\n{}\n{}\n{}\n",
        item,
        rule,
        joined.join("\n\n"),
        rule
    )
}

/// Default output path: `tender_data.xlsx` → `tender_data_filled.xlsx`.
pub fn output_path_for(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "workbook".to_string());
    input.with_file_name(format!("{}_filled.xlsx", stem))
}

pub struct FillSummary {
    pub rows_filled: u64,
    pub rows_skipped: u64,
    pub output_path: PathBuf,
}

/// Run `tdk fill`: answer every line item of the workbook from the store.
pub async fn run_fill(
    config: &Config,
    store: &dyn VectorStore,
    input: &Path,
    output: Option<PathBuf>,
    reporter: &dyn ProgressReporter,
) -> Result<FillSummary> {
    let extension = input
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    if extension.as_deref() != Some("xlsx") {
        bail!("fill expects an .xlsx workbook: {}", input.display());
    }

    let mut sheet = read_sheet(input)?;
    let header_rows = config.sheet.header_rows;

    let item_col = if header_rows > 0 {
        let header = sheet.rows.get(header_rows - 1).cloned().unwrap_or_default();
        find_item_column(&header, &config.sheet.item_header, config.sheet.item_column)
    } else {
        (config.sheet.item_column - 1) as u16
    };

    let doc_col = (config.sheet.document_column - 1) as u16;
    let pages_col = (config.sheet.pages_column - 1) as u16;
    let details_col = (config.sheet.details_column - 1) as u16;

    let retriever = Retriever::new(config, store);
    let total_rows = sheet.rows.len().saturating_sub(header_rows) as u64;
    let mut rows_filled = 0u64;
    let mut rows_skipped = 0u64;

    for r in header_rows..sheet.rows.len() {
        let row = r as u32;
        let item = sheet.value(row, item_col).trim().to_string();
        if item.is_empty() {
            rows_skipped += 1;
            continue;
        }

        reporter.report(ProgressEvent::FillingRow {
            n: (r - header_rows + 1) as u64,
            total: total_rows,
            item: item.clone(),
        });

        let chunks = retriever.retrieve(&item, config.retrieval.fill_k).await?;
        let sources = retrieval::collect_sources(&chunks);
        let document_name = sources
            .first()
            .map(|s| s.document_name.clone())
            .unwrap_or_default();
        let pages = retrieval::pages_display(&retrieval::all_pages(&sources));

        let details = match llm::generate(&config.llm, &extraction_prompt(&item, &chunks)).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("fill row {} failed: {e:#}", row + 1);
                format!("ERROR: {e:#}")
            }
        };

        sheet.set_value(row, doc_col, document_name);
        sheet.set_value(row, pages_col, pages);
        sheet.set_value(row, details_col, details);
        rows_filled += 1;
    }

    let output_path = output.unwrap_or_else(|| output_path_for(input));
    write_sheet(&sheet, &output_path)?;

    Ok(FillSummary {
        rows_filled,
        rows_skipped,
        output_path,
    })
}
