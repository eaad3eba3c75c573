//! Generative-text API interaction.
//!
//! This module provides the interface the synthesizer uses to talk to the
//! generative model. Every prompt is sent exactly once: there is no retry or
//! backoff, a failed call fails the run.
//!
//! # Architecture
//!
//! - [`AskAsync`]: Core trait defining async LLM interaction
//! - [`GeminiClient`]: Google Gemini `generateContent` implementation,
//!   configured to prefer JSON output with a bounded output-token ceiling
//!
//! Tests substitute their own [`AskAsync`] implementations.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::config::{ConfigError, GeminiSettings, require};
use crate::utils::truncate_for_log;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Errors from a single generative call.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Status { status: u16, message: String },

    #[error("model returned no text (finish reason: {0})")]
    Empty(String),
}

/// Trait for async LLM interaction.
///
/// Implementors of this trait can send text to an LLM and receive a response.
/// This abstraction allows for different LLM backends or test doubles.
pub trait AskAsync {
    /// The type of response returned by the LLM.
    type Response;

    /// Send a prompt to the LLM and receive a response.
    async fn ask(&self, text: &str) -> Result<Self::Response, ApiError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate.
    fn into_text(self) -> Result<String, ApiError> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            return Err(ApiError::Empty("no candidates".into()));
        };
        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(ApiError::Empty(
                candidate.finish_reason.unwrap_or_else(|| "unknown".into()),
            ));
        }
        if candidate.finish_reason.as_deref() == Some("MAX_TOKENS") {
            warn!("Model stopped at the output-token ceiling; JSON is likely truncated");
        }
        Ok(text)
    }
}

/// Google Gemini client.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    max_output_tokens: u32,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("max_output_tokens", &self.max_output_tokens)
            .finish()
    }
}

impl GeminiClient {
    /// Build a client. A missing API key is a fatal configuration error.
    pub fn new(settings: &GeminiSettings) -> Result<Self, ConfigError> {
        let api_key = require(&settings.api_key, "GEMINI_API_KEY")?;
        Ok(Self {
            client: Client::new(),
            api_key,
            model: settings.model.clone(),
            max_output_tokens: settings.max_output_tokens,
        })
    }

    fn endpoint(&self) -> String {
        format!("{GEMINI_BASE_URL}/{}:generateContent", self.model)
    }
}

impl AskAsync for GeminiClient {
    type Response = String;

    #[instrument(level = "info", skip_all, fields(model = %self.model, prompt_chars = text.chars().count()))]
    async fn ask(&self, text: &str) -> Result<Self::Response, ApiError> {
        let t0 = Instant::now();
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                max_output_tokens: self.max_output_tokens,
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                elapsed_ms = t0.elapsed().as_millis(),
                status = status.as_u16(),
                "API call failed"
            );
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: truncate_for_log(&body, 300),
            });
        }

        let text = response.json::<GenerateResponse>().await?.into_text()?;
        info!(
            elapsed_ms = t0.elapsed().as_millis(),
            response_chars = text.chars().count(),
            "API call succeeded"
        );
        Ok(text)
    }
}
