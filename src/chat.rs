//! Natural-language Q&A over the classified history.
//!
//! The model sees a plain-text table of the most recent history rows plus
//! the user's question, and its reply is returned verbatim. This layer
//! never fails: an empty history gets a fixed onboarding message and a
//! model error is folded into the reply text, so both the CLI and the
//! HTTP endpoint always have something to show.

use anyhow::Result;
use tracing::warn;

use crate::classifier::{create_model, ChatModel};
use crate::config::Config;
use crate::models::HistoryRow;
use crate::store::HistoryStore;

/// Reply used when there is no classified history to answer from.
pub const NO_DATA_MESSAGE: &str =
    "I haven't processed any data yet. Please simulate a day first.";

/// Render history rows as an aligned plain-text table.
///
/// Newlines inside cells are flattened so each row stays on one line.
pub fn render_context(rows: &[HistoryRow]) -> String {
    let headers = ["Date", "Topic", "Review", "Original_Topic"];
    let cells: Vec<[String; 4]> = rows
        .iter()
        .map(|row| {
            [
                row.date_text.clone(),
                row.topic.label().to_string(),
                row.review.replace(['\r', '\n'], " "),
                row.original_topic.replace(['\r', '\n'], " "),
            ]
        })
        .collect();

    let mut widths = headers.map(str::len);
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    for (i, header) in headers.iter().enumerate() {
        if i > 0 {
            out.push_str("  ");
        }
        if i + 1 == headers.len() {
            out.push_str(header);
        } else {
            out.push_str(&format!("{:<width$}", header, width = widths[i]));
        }
    }
    out.push('\n');

    for row in &cells {
        for (i, cell) in row.iter().enumerate() {
            if i > 0 {
                out.push_str("  ");
            }
            if i + 1 == row.len() {
                out.push_str(cell);
            } else {
                out.push_str(&format!("{:<width$}", cell, width = widths[i]));
            }
        }
        out.push('\n');
    }
    out
}

/// Build the Q&A prompt from rendered context and the user's question.
pub fn chat_prompt(context: &str, query: &str, window: usize) -> String {
    format!(
        "Context (Last {} reviews data):\n{}\n\nUser Query: {}\n\nAnswer based on the data. Cite specific dates if possible.",
        window, context, query
    )
}

/// Answer a question over the history.
///
/// `rows` is the history in storage order, most recent last; only the last
/// `window` rows are rendered into the prompt. Infallible by contract:
/// empty history yields [`NO_DATA_MESSAGE`] and a failed completion is
/// reported inside the reply.
pub async fn answer(
    model: &dyn ChatModel,
    rows: &[HistoryRow],
    window: usize,
    query: &str,
) -> String {
    if rows.is_empty() {
        return NO_DATA_MESSAGE.to_string();
    }

    let recent = &rows[rows.len().saturating_sub(window)..];
    let prompt = chat_prompt(&render_context(recent), query, window);

    match model.complete(&prompt).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!("chat completion failed: {:#}", e);
            format!("Error processing chat: {:#}", e)
        }
    }
}

// ============ CLI: ask command ============

/// Ask one question from the command line and print the reply.
pub async fn run_ask(config: &Config, question: &str) -> Result<()> {
    let history = HistoryStore::load(&config.storage.history_path);
    let model = create_model(&config.classifier)?;

    let reply = answer(
        model.as_ref(),
        history.rows(),
        config.pipeline.chat_context_rows,
        question,
    )
    .await;

    println!("{}", reply);
    Ok(())
}
