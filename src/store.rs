//! CSV-backed raw-review and history stores.
//!
//! Both tables are loaded once at startup and held in memory. The raw batch
//! is read-only after load; the history table is rewritten in full on every
//! flush, matching the append-then-save lifecycle of the pipeline. A missing
//! or corrupt file degrades to an empty table, never an error: emptiness is
//! a valid state for every downstream operation.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::Config;
use crate::models::{HistoryRow, RawReview, Topic};

/// Parse a date cell leniently: ISO date, ISO datetime with a space or `T`
/// separator (optional fractional seconds), or RFC 3339.
pub fn parse_date_cell(cell: &str) -> Option<NaiveDate> {
    let cell = cell.trim();
    if let Ok(d) = NaiveDate::parse_from_str(cell, "%Y-%m-%d") {
        return Some(d);
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(cell, fmt) {
            return Some(dt.date());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(cell) {
        return Some(dt.date_naive());
    }
    None
}

/// Lenient rating parser. Accepts integers and floats; anything else is
/// treated as absent rather than discarding the record.
fn parse_rating(cell: &str) -> Option<i64> {
    let cell = cell.trim();
    if let Ok(n) = cell.parse::<i64>() {
        return Some(n);
    }
    cell.parse::<f64>().ok().map(|f| f as i64)
}

// ============ Raw Review Store ============

/// In-memory copy of the scraped review batch. Immutable after load.
#[derive(Debug, Default)]
pub struct RawStore {
    reviews: Vec<RawReview>,
}

impl RawStore {
    /// Load the raw batch from `path`.
    ///
    /// A missing or unreadable file yields an empty store; rows whose date
    /// cell does not parse are dropped, per the batch file contract.
    pub fn load(path: &Path) -> Self {
        #[derive(serde::Deserialize)]
        struct CsvRow {
            #[serde(rename = "Date")]
            date: String,
            #[serde(rename = "Review_Text")]
            review_text: Option<String>,
            #[serde(rename = "Rating")]
            rating: Option<String>,
            #[serde(rename = "User")]
            user: Option<String>,
        }

        if !path.exists() {
            info!("no raw batch at {}, starting empty", path.display());
            return Self::default();
        }

        let mut reader = match csv::Reader::from_path(path) {
            Ok(reader) => reader,
            Err(e) => {
                warn!("failed to open raw batch {}: {}", path.display(), e);
                return Self::default();
            }
        };

        let mut reviews = Vec::new();
        let mut bad_rows = 0usize;
        let mut bad_dates = 0usize;

        for result in reader.deserialize::<CsvRow>() {
            let row = match result {
                Ok(row) => row,
                Err(_) => {
                    bad_rows += 1;
                    continue;
                }
            };
            let date = match parse_date_cell(&row.date) {
                Some(date) => date,
                None => {
                    bad_dates += 1;
                    continue;
                }
            };
            reviews.push(RawReview {
                date,
                review_text: row.review_text.unwrap_or_default(),
                rating: row.rating.as_deref().and_then(parse_rating),
                user: row.user.unwrap_or_default(),
            });
        }

        if bad_rows > 0 {
            warn!("skipped {} malformed rows in raw batch", bad_rows);
        }
        if bad_dates > 0 {
            warn!("dropped {} raw rows with unparseable dates", bad_dates);
        }
        info!("loaded {} reviews from raw batch", reviews.len());

        Self { reviews }
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }

    pub fn len(&self) -> usize {
        self.reviews.len()
    }

    /// All reviews whose date equals `date` exactly (time-of-day was already
    /// stripped at load). Empty when the store is empty or nothing matches.
    pub fn for_date(&self, date: NaiveDate) -> Vec<RawReview> {
        self.reviews
            .iter()
            .filter(|r| r.date == date)
            .cloned()
            .collect()
    }

    /// Minimum and maximum dates in the batch, or `None` when empty.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.reviews.iter().map(|r| r.date).min()?;
        let max = self.reviews.iter().map(|r| r.date).max()?;
        Some((min, max))
    }
}

// ============ History Store ============

/// In-memory history table plus the path it persists to.
///
/// Rows accumulate without bound. Every mutation is in memory only until
/// [`HistoryStore::flush`] rewrites the whole file.
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    rows: Vec<HistoryRow>,
}

impl HistoryStore {
    /// Load the history table from `path`.
    ///
    /// A missing or unreadable file yields an empty store. Rows whose date
    /// cell does not parse are retained (they keep their original cell text
    /// and stay out of the trend matrix); rows whose topic cell does not
    /// resolve against the closed set are dropped.
    pub fn load(path: &Path) -> Self {
        #[derive(serde::Deserialize)]
        struct CsvRow {
            #[serde(rename = "Date")]
            date: String,
            #[serde(rename = "Topic")]
            topic: String,
            #[serde(rename = "Review")]
            review: Option<String>,
            #[serde(rename = "Original_Topic")]
            original_topic: Option<String>,
        }

        let mut store = Self {
            path: path.to_path_buf(),
            rows: Vec::new(),
        };

        if !path.exists() {
            return store;
        }

        let mut reader = match csv::Reader::from_path(path) {
            Ok(reader) => reader,
            Err(e) => {
                warn!("failed to open history {}: {}", path.display(), e);
                return store;
            }
        };

        let mut bad_rows = 0usize;
        let mut damaged_dates = 0usize;
        let mut dropped_topics = 0usize;

        for result in reader.deserialize::<CsvRow>() {
            let row = match result {
                Ok(row) => row,
                Err(_) => {
                    bad_rows += 1;
                    continue;
                }
            };
            let topic = match Topic::resolve(&row.topic) {
                Some(topic) => topic,
                None => {
                    dropped_topics += 1;
                    continue;
                }
            };
            let date = parse_date_cell(&row.date);
            let date_text = match date {
                Some(date) => date.format("%Y-%m-%d").to_string(),
                None => {
                    damaged_dates += 1;
                    row.date.clone()
                }
            };
            store.rows.push(HistoryRow {
                date,
                date_text,
                topic,
                review: row.review.unwrap_or_default(),
                original_topic: row
                    .original_topic
                    .unwrap_or_else(|| topic.label().to_string()),
            });
        }

        if bad_rows > 0 {
            warn!("skipped {} malformed rows in history", bad_rows);
        }
        if damaged_dates > 0 {
            warn!(
                "{} history rows have unparseable dates and stay out of the trend matrix",
                damaged_dates
            );
        }
        if dropped_topics > 0 {
            warn!(
                "dropped {} history rows with labels outside the topic set",
                dropped_topics
            );
        }
        info!("loaded {} history rows", store.rows.len());

        store
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[HistoryRow] {
        &self.rows
    }

    /// The most recent `n` rows in storage order (all rows when fewer).
    pub fn recent(&self, n: usize) -> &[HistoryRow] {
        &self.rows[self.rows.len().saturating_sub(n)..]
    }

    pub fn append(&mut self, new_rows: Vec<HistoryRow>) {
        self.rows.extend(new_rows);
    }

    /// Remove every row attributed to `date`. Rows with an unparseable
    /// stored date are never removed. Returns the number removed.
    pub fn remove_date(&mut self, date: NaiveDate) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| row.date != Some(date));
        before - self.rows.len()
    }

    /// Rewrite the whole table to durable storage.
    pub fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create history directory: {}", parent.display())
                })?;
            }
        }

        let mut writer = csv::Writer::from_path(&self.path)
            .with_context(|| format!("Failed to open history for writing: {}", self.path.display()))?;

        writer.write_record(["Date", "Topic", "Review", "Original_Topic"])?;
        for row in &self.rows {
            writer.write_record([
                row.date_text.as_str(),
                row.topic.label(),
                row.review.as_str(),
                row.original_topic.as_str(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}

// ============ CLI: range command ============

/// Print the date range covered by the raw review batch.
pub fn run_range(config: &Config) -> Result<()> {
    let raw = RawStore::load(&config.storage.raw_path);

    println!("raw batch {}", config.storage.raw_path.display());
    println!("  rows: {}", raw.len());
    match raw.date_bounds() {
        Some((min, max)) => {
            println!("  min date: {}", min.format("%Y-%m-%d"));
            println!("  max date: {}", max.format("%Y-%m-%d"));
        }
        None => {
            println!("  no raw data loaded");
        }
    }
    println!("ok");
    Ok(())
}
