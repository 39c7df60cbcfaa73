//! Remote reasoning engine.
//!
//! The engine is an opaque capability: it takes a media payload, an
//! instruction and an output schema, and returns JSON text or fails. One
//! request, one response, no streaming and no conversation state.
//!
//! [`GeminiEngine`] talks to the Google Generative Language
//! `generateContent` endpoint.

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::EngineConfig;
use crate::scan::MediaMode;

/// Default model for forensic audits.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-3-pro-preview";

/// Default API endpoint.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default reasoning token budget.
pub const DEFAULT_THINKING_BUDGET: u32 = 4096;

/// Errors raised by an engine implementation.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    #[error("engine not configured: {0}")]
    NotConfigured(String),

    #[error("API request failed: {0}")]
    Request(String),

    #[error("API response error: {status} {body}")]
    ApiResponse { status: u16, body: String },

    #[error("failed to parse API response: {0}")]
    ParseResponse(String),
}

/// A single analysis request.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    /// Base64-encoded media.
    pub payload: String,
    pub mime_type: String,
    pub mode: MediaMode,
    /// Mode-specific user instruction.
    pub prompt: String,
    pub system_instruction: String,
    pub response_schema: Value,
}

/// Provider-agnostic interface for the remote reasoning step.
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    /// Run the analysis and return the engine's JSON text verbatim.
    async fn generate(&self, request: &AnalysisRequest) -> Result<String, EngineError>;

    /// Short provider name for logs.
    fn name(&self) -> &str;
}

/// Gemini `generateContent` engine.
pub struct GeminiEngine {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    thinking_budget: u32,
}

impl GeminiEngine {
    /// Create a new engine.
    ///
    /// # Arguments
    /// * `api_key` - Generative Language API key
    pub fn new(api_key: String) -> Result<Self, EngineError> {
        if api_key.trim().is_empty() {
            return Err(EngineError::NotConfigured(
                "Gemini API key must not be empty".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| EngineError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            thinking_budget: DEFAULT_THINKING_BUDGET,
        })
    }

    /// Build an engine from configuration.
    pub fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
        let api_key = config.api_key.clone().unwrap_or_default();
        Ok(Self::new(api_key)?
            .with_base_url(config.base_url.clone())
            .with_model(config.model.clone())
            .with_thinking_budget(config.thinking_budget))
    }

    /// Set a custom base URL (e.g., for proxy or testing).
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    pub fn with_thinking_budget(mut self, budget: u32) -> Self {
        self.thinking_budget = budget;
        self
    }

    fn request_body(&self, request: &AnalysisRequest) -> Value {
        json!({
            "systemInstruction": {
                "parts": [{ "text": request.system_instruction }]
            },
            "contents": [{
                "role": "user",
                "parts": [
                    {
                        "inlineData": {
                            "mimeType": request.mime_type,
                            "data": request.payload,
                        }
                    },
                    { "text": request.prompt }
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": request.response_schema,
                "thinkingConfig": { "thinkingBudget": self.thinking_budget }
            }
        })
    }
}

#[async_trait]
impl ReasoningEngine for GeminiEngine {
    async fn generate(&self, request: &AnalysisRequest) -> Result<String, EngineError> {
        let body = self.request_body(request);
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        tracing::debug!(
            model = %self.model,
            mode = %request.mode,
            mime_type = %request.mime_type,
            payload_len = request.payload.len(),
            "Sending generateContent request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::Request(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable>".to_string());
            return Err(EngineError::ApiResponse {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let resp_body: Value = response
            .json()
            .await
            .map_err(|e| EngineError::ParseResponse(format!("failed to read JSON: {e}")))?;

        extract_gemini_text(&resp_body)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

/// Concatenate the non-thought text parts of the first candidate.
///
/// A candidate without any text part is an error carrying its
/// `finishReason` (e.g. `SAFETY`).
fn extract_gemini_text(response: &Value) -> Result<String, EngineError> {
    let candidates = response
        .get("candidates")
        .and_then(|c| c.as_array())
        .ok_or_else(|| {
            EngineError::ParseResponse("response missing 'candidates' array".to_string())
        })?;

    let Some(first) = candidates.first() else {
        let reason = response
            .get("promptFeedback")
            .and_then(|f| f.get("blockReason"))
            .and_then(|r| r.as_str())
            .unwrap_or("no candidates returned");
        return Err(EngineError::ParseResponse(reason.to_string()));
    };

    let texts: Vec<&str> = first
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .map(|parts| {
            parts
                .iter()
                .filter(|part| !part.get("thought").and_then(|t| t.as_bool()).unwrap_or(false))
                .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
                .collect()
        })
        .unwrap_or_default();

    if texts.is_empty() {
        let reason = first
            .get("finishReason")
            .and_then(|r| r.as_str())
            .unwrap_or("unknown");
        return Err(EngineError::ParseResponse(format!(
            "candidate contained no text (finishReason: {reason})"
        )));
    }

    Ok(texts.concat())
}
