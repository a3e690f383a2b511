//! # askdocs CLI
//!
//! The `askdocs` binary runs the HTTP API or performs one knowledge-base
//! operation from the shell.
//!
//! ## Usage
//!
//! ```bash
//! askdocs --config ./config/askdocs.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `askdocs init` | Create the SQLite database and run schema migrations |
//! | `askdocs serve` | Start the HTTP API |
//! | `askdocs upload <file>` | Extract, chunk, embed, and store a document |
//! | `askdocs query "<q>"` | Answer a question from the knowledge base |
//! | `askdocs list` | List registered documents |
//! | `askdocs delete <id>` | Remove a document and its chunks |
//! | `askdocs stats` | Show knowledge-base totals |
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use askdocs::{commands, config, server};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// askdocs: ask questions about your documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/askdocs.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "askdocs",
    about = "askdocs: retrieval-augmented question answering over your documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/askdocs.toml`. A missing file means all defaults.
    #[arg(long, global = true, default_value = "./config/askdocs.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Start the HTTP API on `[server].bind`.
    Serve,

    /// Upload a document (pdf, txt, md, docx).
    Upload {
        /// Path to the document.
        file: PathBuf,
    },

    /// Ask a question.
    Query {
        /// The question text.
        query: String,

        /// Number of chunks to retrieve. Defaults to `[retrieval].max_chunks`.
        #[arg(long)]
        max_chunks: Option<usize>,
    },

    /// List registered documents.
    List,

    /// Delete a document by id.
    Delete {
        /// Document UUID as shown by `askdocs list`.
        id: String,
    },

    /// Show document and chunk totals.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cfg = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else {
        tracing::info!(path = %cli.config.display(), "config file not found, using defaults");
        config::Config::default()
    };

    match cli.command {
        Commands::Init => commands::run_init(&cfg).await?,
        Commands::Serve => server::run_server(&cfg).await?,
        Commands::Upload { file } => commands::run_upload(&cfg, &file).await?,
        Commands::Query { query, max_chunks } => {
            commands::run_query(&cfg, &query, max_chunks).await?
        }
        Commands::List => commands::run_list(&cfg).await?,
        Commands::Delete { id } => commands::run_delete(&cfg, &id).await?,
        Commands::Stats => commands::run_stats(&cfg).await?,
    }

    Ok(())
}
