//! Daily simulation pipeline: fetch, classify, append, persist.
//!
//! One batch is one attributed date: pull the day's reviews from the raw
//! store, classify each one, append the survivors to history, flush once.
//! [`classify_and_append`] runs the whole sequence for callers that own the
//! stores outright; the HTTP server composes [`classify_batch`] and
//! [`append_batch`] itself so the history lock is never held across model
//! calls. Per-record problems land in the [`BatchReport`]; they never abort
//! the batch.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::{info, warn};

use crate::classifier::{classify_review, create_model, ChatModel};
use crate::config::Config;
use crate::models::{HistoryRow, RawReview, Topic};
use crate::store::{HistoryStore, RawStore};

/// What happened to a single review inside a batch.
#[derive(Debug)]
pub enum RecordOutcome {
    /// The model returned a label that resolved to a known topic.
    Classified(Topic),
    /// The review text was empty; the model was never called.
    SkippedEmpty,
    /// The completion failed or the reply did not resolve to a topic.
    Failed(String),
}

/// Aggregate result of one simulated day, returned to every caller.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Raw reviews matching the attributed date.
    pub fetched: usize,
    /// Rows appended to history.
    pub classified: usize,
    /// Records whose classification failed.
    pub failed: usize,
    /// Records skipped for empty review text.
    pub skipped_empty: usize,
    /// Prior rows removed under the `replace` policy.
    pub replaced: usize,
}

/// Classify a single review. Empty text short-circuits before any model
/// call; all other problems are folded into [`RecordOutcome::Failed`].
pub async fn classify_one(model: &dyn ChatModel, review: &RawReview) -> RecordOutcome {
    if review.review_text.trim().is_empty() {
        return RecordOutcome::SkippedEmpty;
    }
    match classify_review(model, &review.review_text).await {
        Ok(topic) => RecordOutcome::Classified(topic),
        Err(e) => RecordOutcome::Failed(format!("{:#}", e)),
    }
}

/// Classify a day's reviews into history rows.
///
/// Rows carry `date` as their attributed date regardless of any timestamp
/// on the raw record. Order follows the raw store.
pub async fn classify_batch(
    model: &dyn ChatModel,
    date: NaiveDate,
    reviews: &[RawReview],
) -> (Vec<HistoryRow>, BatchReport) {
    let mut report = BatchReport {
        fetched: reviews.len(),
        ..Default::default()
    };
    let mut rows = Vec::new();

    for review in reviews {
        match classify_one(model, review).await {
            RecordOutcome::Classified(topic) => {
                report.classified += 1;
                rows.push(HistoryRow::classified(
                    date,
                    topic,
                    review.review_text.clone(),
                ));
            }
            RecordOutcome::SkippedEmpty => report.skipped_empty += 1,
            RecordOutcome::Failed(reason) => {
                report.failed += 1;
                warn!("classification failed for a review on {}: {}", date, reason);
            }
        }
    }

    (rows, report)
}

/// Append a batch of classified rows and flush the history file.
///
/// With the `replace` policy, rows already attributed to `date` are removed
/// first. An empty batch mutates nothing: no removal, no flush, so a day
/// whose classifications all failed leaves history exactly as it was.
/// Returns the number of rows removed.
pub fn append_batch(
    history: &mut HistoryStore,
    date: NaiveDate,
    rows: Vec<HistoryRow>,
    policy: &str,
) -> Result<usize> {
    if rows.is_empty() {
        return Ok(0);
    }

    let replaced = match policy {
        "replace" => history.remove_date(date),
        _ => 0,
    };
    history.append(rows);
    history.flush()?;
    Ok(replaced)
}

/// Run the full pipeline for one attributed date.
pub async fn classify_and_append(
    raw: &RawStore,
    history: &mut HistoryStore,
    model: &dyn ChatModel,
    date: NaiveDate,
    policy: &str,
) -> Result<BatchReport> {
    let reviews = raw.for_date(date);
    let (rows, mut report) = classify_batch(model, date, &reviews).await;
    report.replaced = append_batch(history, date, rows, policy)?;

    if report.classified > 0 {
        info!(
            "appended {} rows for {} ({} now in history)",
            report.classified,
            date,
            history.len()
        );
    }
    Ok(report)
}

// ============ CLI: simulate command ============

/// Simulate one day from the command line.
pub async fn run_simulate(config: &Config, date_arg: Option<&str>) -> Result<()> {
    let date = match date_arg {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("Invalid date: '{}'. Expected YYYY-MM-DD.", s))?,
        None => config.pipeline.default_date,
    };

    let raw = RawStore::load(&config.storage.raw_path);
    let mut history = HistoryStore::load(&config.storage.history_path);
    let model = create_model(&config.classifier)?;

    println!("simulate {}", date.format("%Y-%m-%d"));
    println!("  model: {}", model.model_name());
    let report = classify_and_append(
        &raw,
        &mut history,
        model.as_ref(),
        date,
        &config.pipeline.resimulate,
    )
    .await?;

    if report.fetched == 0 {
        println!("  no reviews found for {}", date.format("%Y-%m-%d"));
        println!("ok");
        return Ok(());
    }

    println!("  fetched: {}", report.fetched);
    println!("  classified: {}", report.classified);
    if report.skipped_empty > 0 {
        println!("  skipped empty: {}", report.skipped_empty);
    }
    if report.failed > 0 {
        println!("  failed: {}", report.failed);
    }
    if report.replaced > 0 {
        println!("  replaced: {}", report.replaced);
    }
    println!("  history rows: {}", history.len());
    println!("ok");
    Ok(())
}
