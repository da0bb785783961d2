//! # tenderdesk CLI (`tdk`)
//!
//! The `tdk` binary is the interface to tenderdesk. It provides commands for
//! store initialization, PDF ingestion, spreadsheet auto-fill, retrieval
//! inspection, conversational Q&A, dedup-ledger management, and the PDF
//! file server.
//!
//! ## Usage
//!
//! ```bash
//! tdk --config ./tenderdesk.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tdk init` | Create the vector store schema / remote collection |
//! | `tdk ingest <pdf>...` | Extract, chunk, embed, and store tender PDFs |
//! | `tdk fill <xlsx>` | Auto-fill a line-item workbook from the corpus |
//! | `tdk search "<query>"` | Show raw top-k retrieved chunks |
//! | `tdk ask "<question>"` | One-shot question with citations |
//! | `tdk chat` | Multi-turn chat REPL |
//! | `tdk ledger list` | List ingested documents |
//! | `tdk ledger clear` | Forget ingested documents |
//! | `tdk serve` | Start the PDF file server |

mod chat;
mod chunker;
mod config;
mod embedding;
mod filler;
mod ingest;
mod ledger;
mod llm;
mod models;
mod pdf;
mod progress;
mod retrieval;
mod server;
mod store;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// tenderdesk — a retrieval-augmented assistant for tender PDFs.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `tenderdesk.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "tdk",
    about = "tenderdesk — ingest tender PDFs, auto-fill spreadsheets, chat with citations",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./tenderdesk.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the vector store.
    ///
    /// Creates the SQLite schema (or the remote collection for the astra
    /// backend). Idempotent — running it multiple times is safe.
    Init,

    /// Ingest tender PDFs.
    ///
    /// Stores each PDF permanently, skips files the dedup ledger already
    /// records, extracts text per page, chunks into overlapping token
    /// windows, embeds every chunk, and upserts into the vector store.
    Ingest {
        /// PDF files to ingest.
        pdfs: Vec<PathBuf>,

        /// Show page and chunk counts without embedding or writing anything.
        #[arg(long)]
        dry_run: bool,

        /// Re-ingest even if the ledger already records the file.
        #[arg(long)]
        force: bool,
    },

    /// Auto-fill a line-item workbook.
    ///
    /// For each data row, retrieves context for the item description,
    /// summarizes it with the language model, and writes the answer plus the
    /// supporting document and pages into the configured columns.
    Fill {
        /// Input workbook (.xlsx).
        workbook: PathBuf,

        /// Output path. Defaults to `<input>_filled.xlsx`.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show the raw top-k retrieved chunks for a query.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of chunks to show.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Ask a single question and print the answer with citations.
    Ask {
        /// The question.
        question: String,
    },

    /// Start a multi-turn chat REPL over the ingested tenders.
    Chat,

    /// Manage the dedup ledger of ingested documents.
    Ledger {
        #[command(subcommand)]
        action: LedgerAction,
    },

    /// Start the PDF file server.
    ///
    /// Serves stored PDFs with permissive CORS so citation links
    /// (`/pdf/<doc>#page=<n>`) open directly in a browser viewer.
    Serve,
}

/// Ledger management subcommands.
#[derive(Subcommand)]
enum LedgerAction {
    /// List ingested documents.
    List,

    /// Forget all ingested documents so they can be re-ingested.
    Clear {
        /// Also delete every chunk from the vector store.
        #[arg(long)]
        store: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tenderdesk=info,tdk=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let store = store::open_store(&cfg).await?;
            println!("Vector store initialized ({}).", store.backend_name());
        }
        Commands::Ingest {
            pdfs,
            dry_run,
            force,
        } => {
            let store = store::open_store(&cfg).await?;
            let reporter = progress::default_reporter();
            ingest::run_ingest(&cfg, store.as_ref(), &pdfs, dry_run, force, reporter.as_ref())
                .await?;
        }
        Commands::Fill { workbook, output } => {
            let store = store::open_store(&cfg).await?;
            let reporter = progress::default_reporter();
            let summary =
                filler::run_fill(&cfg, store.as_ref(), &workbook, output, reporter.as_ref())
                    .await?;
            println!("fill");
            println!("  rows filled: {}", summary.rows_filled);
            println!("  rows skipped (no item): {}", summary.rows_skipped);
            println!("  output: {}", summary.output_path.display());
            println!("ok");
        }
        Commands::Search { query, limit } => {
            let store = store::open_store(&cfg).await?;
            retrieval::run_search(&cfg, store.as_ref(), &query, limit).await?;
        }
        Commands::Ask { question } => {
            let store = store::open_store(&cfg).await?;
            chat::run_ask(&cfg, store.as_ref(), &question).await?;
        }
        Commands::Chat => {
            let store = store::open_store(&cfg).await?;
            chat::run_repl(&cfg, store.as_ref()).await?;
        }
        Commands::Ledger { action } => match action {
            LedgerAction::List => {
                let ledger = ledger::Ledger::load(&cfg.storage.ledger_path);
                if ledger.is_empty() {
                    println!("No documents ingested yet.");
                } else {
                    for entry in ledger.entries() {
                        println!(
                            "{}  {}  {}",
                            entry.document,
                            &entry.sha256[..12.min(entry.sha256.len())],
                            entry.ingested_at.format("%Y-%m-%d %H:%M")
                        );
                    }
                }
            }
            LedgerAction::Clear { store: clear_store } => {
                let mut ledger = ledger::Ledger::load(&cfg.storage.ledger_path);
                ledger.clear();
                ledger.save()?;
                println!("Ledger cleared.");
                if clear_store {
                    let store = store::open_store(&cfg).await?;
                    store.clear().await?;
                    println!("Vector store cleared ({}).", store.backend_name());
                }
            }
        },
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
