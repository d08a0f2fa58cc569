use crate::config::{Config, GenerationConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Duration;
use tracing::debug;

/// Failure of a single completion call.
///
/// The variants exist for diagnostics; the session controller shows the user
/// one fixed message regardless of which one occurred.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("No API key configured")]
    MissingApiKey,
    #[error("Network error: {0}")]
    Network(String),
    #[error("Request timed out")]
    Timeout,
    #[error("API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },
    #[error("Prompt blocked: {0}")]
    Blocked(String),
    #[error("Malformed response: {0}")]
    Malformed(String),
    #[error("Empty response")]
    EmptyResponse,
    #[error("Completion task failed: {0}")]
    TaskFailed(String),
}

/// Submit prompt text, receive answer text or a failure.
///
/// Implementations must not retry.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

/// Request body for `models/{model}:generateContent`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationParams>,
}

#[derive(Debug, Clone, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Clone, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Google Gemini client for single-shot, non-streaming completions
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    generation: GenerationConfig,
}

impl GeminiClient {
    /// Build a client from configuration. The credential is resolved once here.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key(),
            generation: config.generation.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn build_request<'a>(&self, prompt: &'a str) -> GenerateContentRequest<'a> {
        let generation_config = match (
            self.generation.temperature,
            self.generation.max_output_tokens,
        ) {
            (None, None) => None,
            (temperature, max_output_tokens) => Some(GenerationParams {
                temperature,
                max_output_tokens,
            }),
        };

        GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config,
        }
    }
}

/// Extract the answer text from a `generateContent` response body
fn parse_response(body: &str) -> Result<String, CompletionError> {
    let response: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| CompletionError::Malformed(e.to_string()))?;

    if let Some(reason) = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason)
    {
        return Err(CompletionError::Blocked(reason));
    }

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(CompletionError::EmptyResponse);
    }

    Ok(text)
}

#[async_trait]
impl CompletionClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(CompletionError::MissingApiKey)?;

        debug!(model = %self.model, prompt_chars = prompt.chars().count(), "Gemini API request");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&self.build_request(prompt))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionError::Timeout
                } else {
                    CompletionError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                CompletionError::Timeout
            } else {
                CompletionError::Network(e.to_string())
            }
        })?;

        if !status.is_success() {
            return Err(CompletionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        parse_response(&body)
    }
}
