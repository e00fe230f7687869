//! Metadata extraction: send document text to a chat-completion endpoint and
//! parse the structured JSON answer.
//!
//! The request carries two messages: the extractor persona as `system` and
//! the field instructions plus the raw text as `user` (see [`crate::prompts`]).
//! Exactly one request is made per document. There are no retries: a failed
//! call fails the upload immediately.
//!
//! The reply is passed through as-is. Keys and values are not validated
//! against the requested field list.

use crate::config::{IntakeConfig, API_KEY_ENV};
use crate::error::{ExtractionError, IntakeError};
use crate::output::Metadata;
use crate::pipeline::postprocess::clean_json_output;
use crate::prompts::{extraction_prompt, EXTRACTOR_PERSONA};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Turns document text into structured metadata.
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> Result<Metadata, ExtractionError>;
}

/// [`MetadataExtractor`] that calls an OpenAI-compatible chat-completion API.
#[derive(Debug, Clone)]
pub struct ChatCompletionExtractor {
    client: reqwest::Client,
    api_base: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

impl ChatCompletionExtractor {
    /// Create an extractor for `api_base` with a per-call `timeout`.
    pub fn new(
        api_base: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, IntakeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IntakeError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: api_base.into(),
            model: model.into(),
            api_key,
            timeout,
        })
    }

    /// Create an extractor from the service configuration.
    pub fn from_config(config: &IntakeConfig) -> Result<Self, IntakeError> {
        Self::new(
            config.llm_api_base.clone(),
            config.llm_model.clone(),
            config.api_key.clone(),
            Duration::from_secs(config.api_timeout_secs),
        )
    }

    async fn send(&self, api_key: &str, prompt: &str) -> Result<String, ExtractionError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: EXTRACTOR_PERSONA,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let response = self
            .client
            .post(&self.api_base)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            warn!("LLM endpoint returned HTTP {}", status);
            return Err(ExtractionError::Upstream {
                status: Some(status.as_u16()),
                detail: text,
            });
        }
        Ok(text)
    }

    fn transport_error(&self, e: reqwest::Error) -> ExtractionError {
        let detail = if e.is_timeout() {
            format!("request timed out after {}s", self.timeout.as_secs())
        } else {
            e.to_string()
        };
        ExtractionError::Upstream {
            status: e.status().map(|s| s.as_u16()),
            detail,
        }
    }
}

#[async_trait]
impl MetadataExtractor for ChatCompletionExtractor {
    async fn extract(&self, text: &str) -> Result<Metadata, ExtractionError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ExtractionError::ProviderNotConfigured {
                hint: format!("no API key set; export {API_KEY_ENV}=<key>"),
            })?;

        let prompt = extraction_prompt(text);
        let start = Instant::now();
        let body = self.send(api_key, &prompt).await?;
        debug!(
            "LLM call ({}) answered in {:?}",
            self.model,
            start.elapsed()
        );

        let metadata = parse_completion(&body)?;
        info!("Extracted {} metadata fields", metadata.len());
        Ok(metadata)
    }
}

/// Parse a chat-completion response body into metadata.
///
/// The first choice's message content must be a JSON object once a wrapping
/// code fence is removed.
pub fn parse_completion(body: &str) -> Result<Metadata, ExtractionError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| ExtractionError::MalformedResponse {
            detail: format!("unexpected response body: {e}"),
        })?;

    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ExtractionError::MalformedResponse {
            detail: "response contained no message content".into(),
        })?;

    let cleaned = clean_json_output(&content);
    serde_json::from_str::<Metadata>(&cleaned).map_err(|e| ExtractionError::MalformedResponse {
        detail: format!("model did not return a JSON object ({e})"),
    })
}
