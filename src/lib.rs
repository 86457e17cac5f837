//! # Review Radar
//!
//! App-store review trend analysis with LLM topic classification.
//!
//! Review Radar ingests scraped app-store reviews, classifies each one into
//! a fixed six-topic set with a chat model, accumulates a persistent
//! classified history, and exposes date-by-topic trend pivots and
//! natural-language Q&A via a CLI and a JSON HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌───────────┐
//! │  Raw batch  │──▶│   Pipeline   │──▶│  History  │
//! │    (CSV)    │   │ LLM classify │   │   (CSV)   │
//! └─────────────┘   └──────────────┘   └─────┬─────┘
//!                                            │
//!                        ┌───────────────────┤
//!                        ▼                   ▼
//!                   ┌──────────┐       ┌──────────┐
//!                   │   CLI    │       │   HTTP   │
//!                   │  (rvr)   │       │  (JSON)  │
//!                   └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! rvr ingest export.json        # convert a scraper export to the raw batch
//! rvr simulate --date 2024-06-01
//! rvr trends                    # date-by-topic pivot
//! rvr ask "Which topic spiked?" # Q&A over the history
//! rvr serve                     # start the HTTP service
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types and the closed topic set |
//! | [`store`] | CSV-backed raw-review and history stores |
//! | [`ingest`] | Scraper-export conversion |
//! | [`classifier`] | Chat model abstraction and review classification |
//! | [`pipeline`] | Daily simulation: fetch, classify, append, persist |
//! | [`trends`] | Date-by-topic trend pivot |
//! | [`chat`] | Natural-language Q&A over the history |
//! | [`server`] | JSON HTTP service |

pub mod chat;
pub mod classifier;
pub mod config;
pub mod ingest;
pub mod models;
pub mod pipeline;
pub mod server;
pub mod store;
pub mod trends;
