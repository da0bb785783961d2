//! # tenderdesk
//!
//! A retrieval-augmented assistant for tender documents: ingest PDF tenders,
//! auto-fill a spreadsheet of line items from retrieved context, chat over
//! the corpus with page-level citations, and serve the stored PDFs so
//! citation links open the right document and page.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────────┐   ┌─────────────┐
//! │   PDFs   │──▶│    Pipeline      │──▶│ Vector store │
//! │ (ingest) │   │ Extract+Chunk    │   │ SQLite/Astra │
//! └──────────┘   │ +Embed (+ledger) │   └──────┬──────┘
//!                └──────────────────┘          │
//!                      ┌───────────────────────┤
//!                      ▼                       ▼
//!                ┌──────────┐            ┌──────────┐
//!                │   fill   │            │ ask/chat │──▶ citations
//!                │  (xlsx)  │            │  (RAG)   │       │
//!                └──────────┘            └──────────┘       ▼
//!                                                     ┌──────────┐
//!                                                     │  serve   │
//!                                                     │ (PDFs)   │
//!                                                     └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! tdk init                          # create the local vector store
//! tdk ingest tender.pdf annex.pdf   # extract, chunk, embed, store
//! tdk fill tender_data.xlsx         # auto-fill the line-item workbook
//! tdk ask "What is the delivery period?"
//! tdk serve                         # serve stored PDFs for citation links
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`pdf`] | Page-level PDF text extraction |
//! | [`chunker`] | Token-window chunking |
//! | [`ledger`] | Dedup ledger of ingested documents |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`llm`] | Language-model client |
//! | [`store`] | Vector store backends (sqlite, astra) |
//! | [`retrieval`] | Retrieval + source reconciliation |
//! | [`chat`] | Conversational retrieval chain |
//! | [`filler`] | Spreadsheet auto-fill |
//! | [`ingest`] | Ingestion pipeline |
//! | [`server`] | PDF file server |
//! | [`progress`] | Progress reporting on stderr |

pub mod chat;
pub mod chunker;
pub mod config;
pub mod embedding;
pub mod filler;
pub mod ingest;
pub mod ledger;
pub mod llm;
pub mod models;
pub mod pdf;
pub mod progress;
pub mod retrieval;
pub mod server;
pub mod store;
