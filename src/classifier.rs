//! Chat model abstraction and the review classifier built on it.
//!
//! Defines the [`ChatModel`] trait and concrete implementations:
//! - **[`DisabledModel`]** — returns errors; used when no provider is configured.
//! - **[`MistralModel`]** — calls the Mistral chat-completions API.
//!
//! Classification is one chat completion per review: the prompt lists the
//! closed topic set and the reply is resolved back into a [`Topic`] through
//! the lenient matcher. A reply outside the set is an error, never a new
//! topic.
//!
//! # Provider Selection
//!
//! Use [`create_model`] to instantiate the appropriate model based on the
//! configuration:
//!
//! ```rust,no_run
//! # use review_radar::config::ClassifierConfig;
//! # use review_radar::classifier::create_model;
//! let config = ClassifierConfig::default(); // provider = "disabled"
//! let model = create_model(&config).unwrap();
//! assert_eq!(model.model_name(), "disabled");
//! ```
//!
//! # Failure Policy
//!
//! Every call is made exactly once; there is no retry or backoff. A failed
//! completion is reported for that record and the caller moves on.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::ClassifierConfig;
use crate::models::Topic;

const MISTRAL_CHAT_URL: &str = "https://api.mistral.ai/v1/chat/completions";

/// Trait for chat-completion backends.
///
/// Both pipeline classification and the Q&A endpoint go through this
/// interface, so tests can substitute a scripted model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Returns the model identifier (e.g. `"mistral-large-latest"`).
    fn model_name(&self) -> &str;
    /// Send a single-message chat completion and return the reply text.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Instantiate the chat model named by the configuration.
pub fn create_model(config: &ClassifierConfig) -> Result<Box<dyn ChatModel>> {
    match config.provider.as_str() {
        "mistral" => Ok(Box::new(MistralModel::new(config)?)),
        "disabled" => Ok(Box::new(DisabledModel)),
        other => bail!("Unknown classifier provider: {}", other),
    }
}

// ============ Disabled Model ============

/// A no-op chat model that always returns errors.
///
/// Used when `classifier.provider = "disabled"` in the configuration.
pub struct DisabledModel;

#[async_trait]
impl ChatModel for DisabledModel {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn complete(&self, _prompt: &str) -> Result<String> {
        bail!("Chat model is disabled")
    }
}

// ============ Mistral Model ============

/// Chat model backed by the Mistral chat-completions API.
///
/// Posts to the configured chat-completions URL (default: the public
/// Mistral endpoint). Requires the `MISTRAL_API_KEY` environment variable
/// to be set; the key is never read from the config file.
pub struct MistralModel {
    client: reqwest::Client,
    model: String,
    url: String,
    api_key: String,
}

impl MistralModel {
    /// Create a new Mistral model from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `MISTRAL_API_KEY` is not in the environment.
    pub fn new(config: &ClassifierConfig) -> Result<Self> {
        let api_key = std::env::var("MISTRAL_API_KEY")
            .map_err(|_| anyhow::anyhow!("MISTRAL_API_KEY environment variable not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            model: config.model.clone(),
            url: config
                .url
                .clone()
                .unwrap_or_else(|| MISTRAL_CHAT_URL.to_string()),
            api_key,
        })
    }
}

#[async_trait]
impl ChatModel for MistralModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
        });

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            bail!("Mistral API error {}: {}", status, error_text);
        }

        let json: serde_json::Value = response.json().await?;
        parse_chat_response(&json)
    }
}

/// Extract the reply text from a chat-completions response body.
pub fn parse_chat_response(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid response format: missing message content"))
}

// ============ Review Classification ============

/// Build the classification prompt for one review.
///
/// The topic list is generated from [`Topic::ALL`] so the prompt and the
/// matcher can never drift apart.
pub fn classification_prompt(review_text: &str) -> String {
    let topics = Topic::ALL
        .iter()
        .map(|t| format!("'{}'", t.label()))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Analyze the following customer review.\n\
         Classify it into ONE of these topics:\n\
         [{}].\n\n\
         Review: \"{}\"\n\n\
         Return ONLY the topic name.",
        topics, review_text
    )
}

/// Classify one review into the closed topic set.
///
/// # Errors
///
/// Fails if the completion fails or if the reply does not resolve to
/// exactly one known topic.
pub async fn classify_review(model: &dyn ChatModel, review_text: &str) -> Result<Topic> {
    let reply = model.complete(&classification_prompt(review_text)).await?;
    Topic::resolve(&reply)
        .ok_or_else(|| anyhow::anyhow!("Classifier reply is not a known topic: {:?}", reply))
}
