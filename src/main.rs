//! # Review Radar CLI (`rvr`)
//!
//! The `rvr` binary is the primary interface for Review Radar. It provides
//! commands for ingesting scraper exports, classifying a day's reviews,
//! inspecting topic trends, asking questions over the history, and starting
//! the HTTP service.
//!
//! ## Usage
//!
//! ```bash
//! rvr --config ./config/rvr.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rvr ingest <export.json>` | Convert a scraper export into the raw batch CSV |
//! | `rvr simulate --date 2024-06-01` | Classify one day's reviews into history |
//! | `rvr trends` | Print the date-by-topic trend pivot |
//! | `rvr ask "<question>"` | Ask a question over the classified history |
//! | `rvr range` | Show the date range covered by the raw batch |
//! | `rvr serve` | Start the HTTP service |
//!
//! ## Examples
//!
//! ```bash
//! # Convert a scraper export, keeping reviews from June onward
//! rvr ingest export.json --cutoff 2024-06-01
//!
//! # Classify one day into history
//! rvr simulate --date 2024-06-01 --config ./config/rvr.toml
//!
//! # Trend pivot as JSON records
//! rvr trends --json
//!
//! # Ask about the data
//! rvr ask "Which topic spiked last week?"
//!
//! # Start the HTTP service
//! rvr serve --config ./config/rvr.toml
//! ```

mod chat;
mod classifier;
mod config;
mod ingest;
#[allow(dead_code)]
mod models;
mod pipeline;
mod server;
#[allow(dead_code)]
mod store;
mod trends;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Review Radar CLI — app-store review trend analysis with LLM topic
/// classification.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/rvr.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "rvr",
    about = "Review Radar — app-store review trend analysis with LLM topic classification",
    version,
    long_about = "Review Radar ingests scraped app-store reviews, classifies them into a fixed \
    topic set with an LLM, accumulates a persistent history, and exposes trend pivots and \
    natural-language Q&A via a CLI and a JSON HTTP API."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/rvr.toml`. All storage, classifier, pipeline,
    /// and server settings are read from this file.
    #[arg(long, global = true, default_value = "./config/rvr.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Convert a scraper export into the raw batch CSV.
    ///
    /// Reads a JSON export of app-store reviews (`at` / `content` / `score`
    /// / `userName` records) and writes the four-column batch file the
    /// pipeline reads. Works without a configuration file.
    Ingest {
        /// Path to the JSON export.
        input: PathBuf,

        /// Keep only reviews dated on or after this date (YYYY-MM-DD).
        #[arg(long)]
        cutoff: Option<String>,

        /// Maximum number of reviews to write.
        #[arg(long)]
        max: Option<usize>,

        /// Output path. Defaults to the configured raw batch location.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Classify one day's reviews into the history file.
    ///
    /// Fetches the raw reviews attributed to the date, classifies each one
    /// with the configured chat model, appends the results to history, and
    /// flushes once. Failures are per-record; the batch always completes.
    Simulate {
        /// Day to simulate (YYYY-MM-DD). Defaults to the configured date.
        #[arg(long)]
        date: Option<String>,
    },

    /// Print the date-by-topic trend pivot.
    Trends {
        /// Emit the pivot as JSON records instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Ask a natural-language question over the classified history.
    Ask {
        /// The question to ask.
        question: String,
    },

    /// Show the date range covered by the raw batch.
    Range,

    /// Start the HTTP service.
    ///
    /// Binds to the address configured in `[server].bind` and serves the
    /// simulate-day, trends, chat, and raw-date-range endpoints.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Ingest works without a config file; everything else requires one.
    if let Commands::Ingest {
        input,
        cutoff,
        max,
        output,
    } = &cli.command
    {
        let cfg = config::load_config(&cli.config).unwrap_or_else(|_| config::Config::minimal());
        server::init_tracing(&cfg.server.log_level);
        ingest::run_ingest(&cfg, input, cutoff.as_deref(), *max, output.as_deref())?;
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;
    server::init_tracing(&cfg.server.log_level);

    match cli.command {
        Commands::Ingest { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
        Commands::Simulate { date } => {
            pipeline::run_simulate(&cfg, date.as_deref()).await?;
        }
        Commands::Trends { json } => {
            trends::run_trends(&cfg, json)?;
        }
        Commands::Ask { question } => {
            chat::run_ask(&cfg, &question).await?;
        }
        Commands::Range => {
            store::run_range(&cfg)?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
