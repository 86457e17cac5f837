//! Core data models for the review pipeline.
//!
//! These types represent the raw scraped reviews and the classified history
//! rows that flow through the classification and aggregation pipeline.

use chrono::NaiveDate;

/// The closed six-topic taxonomy reviews are classified into.
///
/// Variants are declared in the order the classification prompt lists them.
/// The canonical display labels returned by [`Topic::label`] are the exact
/// strings stored on disk and rendered in the trend matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    PositiveFeedback,
    DeliveryTimeIssues,
    FoodQualityIssues,
    CustomerServiceIssues,
    OrderAccuracy,
    PriceValue,
}

impl Topic {
    /// All six topics, in prompt order.
    pub const ALL: [Topic; 6] = [
        Topic::PositiveFeedback,
        Topic::DeliveryTimeIssues,
        Topic::FoodQualityIssues,
        Topic::CustomerServiceIssues,
        Topic::OrderAccuracy,
        Topic::PriceValue,
    ];

    /// Canonical display label.
    pub fn label(&self) -> &'static str {
        match self {
            Topic::PositiveFeedback => "Positive Feedback",
            Topic::DeliveryTimeIssues => "Delivery Time Issues",
            Topic::FoodQualityIssues => "Food Quality Issues",
            Topic::CustomerServiceIssues => "Customer Service Issues",
            Topic::OrderAccuracy => "Order Accuracy",
            Topic::PriceValue => "Price/Value",
        }
    }

    /// Resolve a model-produced (or stored) label against the closed set.
    ///
    /// Tolerates surrounding whitespace, quotes, markdown emphasis, and
    /// trailing punctuation, and accepts a label embedded in a short sentence
    /// as long as exactly one topic matches. Anything else resolves to
    /// `None`, including a string that matches two topics. The set is closed:
    /// an unresolvable label is a classification failure, never a seventh
    /// topic.
    pub fn resolve(raw: &str) -> Option<Topic> {
        let cleaned = raw
            .trim()
            .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '*' | '.' | '!' | ':'))
            .trim();
        if cleaned.is_empty() {
            return None;
        }

        let lowered = cleaned.to_lowercase();
        for topic in Topic::ALL {
            if lowered == topic.label().to_lowercase() {
                return Some(topic);
            }
        }

        // No exact match; fall back to containment, but only when unambiguous
        let mut found = None;
        for topic in Topic::ALL {
            if lowered.contains(&topic.label().to_lowercase()) {
                if found.is_some() {
                    return None;
                }
                found = Some(topic);
            }
        }
        found
    }
}

/// Raw scraped review as loaded from the source batch file.
#[derive(Debug, Clone)]
pub struct RawReview {
    pub date: NaiveDate,
    pub review_text: String,
    pub rating: Option<i64>,
    pub user: String,
}

/// Classified row persisted in the history file.
///
/// `date` is `None` for rows loaded from an existing file whose date cell
/// does not parse; such rows stay in the store (and in the chat context) but
/// are excluded from the trend matrix. `date_text` is what gets written back
/// on flush: the ISO date for rows with a parsed date, the original cell
/// otherwise. `original_topic` carries the redundant `Original_Topic` column
/// kept for compatibility with the older history schema; it is preserved
/// verbatim through load and flush.
#[derive(Debug, Clone)]
pub struct HistoryRow {
    pub date: Option<NaiveDate>,
    pub date_text: String,
    pub topic: Topic,
    pub review: String,
    pub original_topic: String,
}

impl HistoryRow {
    /// Row for a freshly classified review attributed to `date`.
    pub fn classified(date: NaiveDate, topic: Topic, review: String) -> Self {
        Self {
            date: Some(date),
            date_text: date.format("%Y-%m-%d").to_string(),
            topic,
            review,
            original_topic: topic.label().to_string(),
        }
    }
}
