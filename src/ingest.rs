//! Scraper-export ingestion.
//!
//! Converts a JSON export of app-store reviews (the `at` / `content` /
//! `score` / `userName` shape produced by store scrapers) into the raw
//! batch CSV the pipeline reads. Date cells are written verbatim so
//! time-of-day survives in the batch file; the cutoff keeps a record when
//! its date is on or after the given day.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::Path;
use tracing::warn;

use crate::config::Config;
use crate::store::parse_date_cell;

/// One record in the scraper export.
#[derive(Debug, serde::Deserialize)]
pub struct ExportRecord {
    pub at: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default, rename = "userName")]
    pub user_name: Option<String>,
}

/// One row of the raw batch CSV, cells already stringified.
#[derive(Debug, PartialEq)]
pub struct RawCsvRow {
    pub date: String,
    pub review_text: String,
    pub rating: String,
    pub user: String,
}

/// Counters for one conversion.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub total: usize,
    pub kept: usize,
    pub skipped_undated: usize,
    pub cut_by_date: usize,
    pub truncated: usize,
}

fn format_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{}", score as i64)
    } else {
        format!("{}", score)
    }
}

/// Convert export records into batch rows, preserving export order.
///
/// Records without a parseable date are skipped; `cutoff` keeps records
/// dated on or after it; `max` caps the row count after filtering.
pub fn convert_export(
    records: Vec<ExportRecord>,
    cutoff: Option<NaiveDate>,
    max: Option<usize>,
) -> (Vec<RawCsvRow>, IngestReport) {
    let mut report = IngestReport {
        total: records.len(),
        ..Default::default()
    };
    let mut rows = Vec::new();

    for record in records {
        let date = match parse_date_cell(&record.at) {
            Some(date) => date,
            None => {
                report.skipped_undated += 1;
                warn!("skipping export record with unparseable date: {:?}", record.at);
                continue;
            }
        };
        if let Some(cutoff) = cutoff {
            if date < cutoff {
                report.cut_by_date += 1;
                continue;
            }
        }
        rows.push(RawCsvRow {
            date: record.at,
            review_text: record.content.unwrap_or_default(),
            rating: record.score.map(format_score).unwrap_or_default(),
            user: record.user_name.unwrap_or_default(),
        });
    }

    if let Some(max) = max {
        if rows.len() > max {
            report.truncated = rows.len() - max;
            rows.truncate(max);
        }
    }

    report.kept = rows.len();
    (rows, report)
}

/// Write batch rows as the raw review CSV.
pub fn write_raw_csv(path: &Path, rows: &[RawCsvRow]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to open output: {}", path.display()))?;
    writer.write_record(["Date", "Review_Text", "Rating", "User"])?;
    for row in rows {
        writer.write_record([
            row.date.as_str(),
            row.review_text.as_str(),
            row.rating.as_str(),
            row.user.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

// ============ CLI: ingest command ============

/// Convert a scraper export into the raw batch CSV.
///
/// The output path defaults to the configured raw batch location.
pub fn run_ingest(
    config: &Config,
    input: &Path,
    cutoff: Option<&str>,
    max: Option<usize>,
    output: Option<&Path>,
) -> Result<()> {
    let cutoff = match cutoff {
        Some(s) => Some(
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .with_context(|| format!("Invalid cutoff date: '{}'. Expected YYYY-MM-DD.", s))?,
        ),
        None => None,
    };

    let data = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read export: {}", input.display()))?;
    let records: Vec<ExportRecord> = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse export JSON: {}", input.display()))?;

    let (rows, report) = convert_export(records, cutoff, max);

    let output = output.unwrap_or(&config.storage.raw_path);
    write_raw_csv(output, &rows)?;

    println!("ingest {}", input.display());
    println!("  records in export: {}", report.total);
    if report.skipped_undated > 0 {
        println!("  skipped undated: {}", report.skipped_undated);
    }
    if report.cut_by_date > 0 {
        println!("  before cutoff: {}", report.cut_by_date);
    }
    if report.truncated > 0 {
        println!("  over cap: {}", report.truncated);
    }
    println!("  written: {}", report.kept);
    println!("  output: {}", output.display());
    println!("ok");
    Ok(())
}
