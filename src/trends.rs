//! Date-by-topic trend aggregation over the history table.
//!
//! The pivot counts history rows per (date, topic) cell. Output order is
//! deterministic regardless of storage order: dates ascend, topics sort by
//! label. Only topics and dates that actually occur get a row or column,
//! and rows whose stored date never parsed are left out entirely.

use anyhow::Result;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::config::Config;
use crate::models::{HistoryRow, Topic};
use crate::store::HistoryStore;

/// One pivot row: a topic and its count per date column.
#[derive(Debug, PartialEq, Eq)]
pub struct TrendRow {
    pub topic: Topic,
    /// Aligned with [`TrendMatrix::dates`].
    pub counts: Vec<u64>,
}

/// The full pivot: date columns ascending, topic rows sorted by label.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TrendMatrix {
    pub dates: Vec<NaiveDate>,
    pub rows: Vec<TrendRow>,
}

/// Build the trend pivot from history rows.
pub fn compute_matrix(rows: &[HistoryRow]) -> TrendMatrix {
    let mut dates: BTreeSet<NaiveDate> = BTreeSet::new();
    let mut topics: BTreeMap<&'static str, Topic> = BTreeMap::new();
    let mut counts: HashMap<(NaiveDate, Topic), u64> = HashMap::new();

    for row in rows {
        let date = match row.date {
            Some(date) => date,
            None => continue,
        };
        dates.insert(date);
        topics.insert(row.topic.label(), row.topic);
        *counts.entry((date, row.topic)).or_insert(0) += 1;
    }

    let dates: Vec<NaiveDate> = dates.into_iter().collect();
    let rows = topics
        .into_values()
        .map(|topic| TrendRow {
            counts: dates
                .iter()
                .map(|d| counts.get(&(*d, topic)).copied().unwrap_or(0))
                .collect(),
            topic,
        })
        .collect();

    TrendMatrix { dates, rows }
}

/// Flatten the pivot into one JSON object per topic row, keyed by `Topic`
/// plus one ISO date key per column. This is the `/trends` wire shape.
pub fn to_records(matrix: &TrendMatrix) -> Vec<serde_json::Value> {
    matrix
        .rows
        .iter()
        .map(|row| {
            let mut record = serde_json::Map::new();
            record.insert(
                "Topic".to_string(),
                serde_json::Value::from(row.topic.label()),
            );
            for (date, count) in matrix.dates.iter().zip(&row.counts) {
                record.insert(
                    date.format("%Y-%m-%d").to_string(),
                    serde_json::Value::from(*count),
                );
            }
            serde_json::Value::Object(record)
        })
        .collect()
}

/// Render the pivot as an aligned text table for the CLI.
pub fn render_table(matrix: &TrendMatrix) -> String {
    if matrix.rows.is_empty() {
        return String::from("(no trend data)\n");
    }

    let label_width = matrix
        .rows
        .iter()
        .map(|r| r.topic.label().len())
        .chain(std::iter::once("Topic".len()))
        .max()
        .unwrap_or(5);

    let mut out = String::new();
    out.push_str(&format!("{:<width$}", "Topic", width = label_width));
    for date in &matrix.dates {
        out.push_str(&format!("  {:>10}", date.format("%Y-%m-%d")));
    }
    out.push('\n');

    for row in &matrix.rows {
        out.push_str(&format!(
            "{:<width$}",
            row.topic.label(),
            width = label_width
        ));
        for count in &row.counts {
            out.push_str(&format!("  {:>10}", count));
        }
        out.push('\n');
    }
    out
}

// ============ CLI: trends command ============

/// Print the trend pivot, as a table or as the wire-format records.
pub fn run_trends(config: &Config, json: bool) -> Result<()> {
    let history = HistoryStore::load(&config.storage.history_path);
    let matrix = compute_matrix(history.rows());

    if json {
        println!("{}", serde_json::to_string_pretty(&to_records(&matrix))?);
        return Ok(());
    }

    print!("{}", render_table(&matrix));
    Ok(())
}
