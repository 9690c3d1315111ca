//! Google Gemini `generateContent` provider.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{JoinBenchError, Result};

use super::client::ClientConfig;
use super::provider::{InferenceProvider, ProviderFailure};

/// Gemini REST endpoint root.
const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Output budget per request; answers are one small JSON object.
const MAX_OUTPUT_TOKENS: u32 = 256;

/// Gemini provider over the blocking reqwest client.
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    /// Create a provider for `model` with a per-request `timeout`.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| JoinBenchError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Create from a client configuration; the API key is required.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            JoinBenchError::Config("GEMINI_API_KEY environment variable not set".to_string())
        })?;
        Self::new(api_key, &config.model, config.timeout)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", API_BASE, self.model)
    }
}

impl InferenceProvider for GeminiProvider {
    fn generate(&self, prompt: &str) -> std::result::Result<String, ProviderFailure> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": 0.0,
                "maxOutputTokens": MAX_OUTPUT_TOKENS,
                "responseMimeType": "text/plain"
            }
        });

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .map_err(classify_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().unwrap_or_default();
            return Err(classify_status(status, &error_text));
        }

        let api_response: ApiResponse = response
            .json()
            .map_err(|e| ProviderFailure::Transient(format!("unreadable response body: {}", e)))?;
        Ok(api_response.text())
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

fn classify_send_error(e: reqwest::Error) -> ProviderFailure {
    if e.is_timeout() || e.is_connect() || e.is_request() {
        ProviderFailure::Transient(e.to_string())
    } else {
        ProviderFailure::Rejected(e.to_string())
    }
}

/// Map a non-success HTTP status to a failure class.
pub(crate) fn classify_status(status: StatusCode, body: &str) -> ProviderFailure {
    let message = format!("API error ({}): {}", status, body.trim());
    match status.as_u16() {
        429 => ProviderFailure::Quota {
            retry_after: retry_delay(body),
            message,
        },
        500 | 503 | 504 => ProviderFailure::Transient(message),
        _ => ProviderFailure::Rejected(message),
    }
}

/// Server-suggested delay from a `google.rpc.RetryInfo` error detail.
pub(crate) fn retry_delay(body: &str) -> Option<Duration> {
    let value: Value = serde_json::from_str(body).ok()?;
    let details = value.pointer("/error/details")?.as_array()?;
    details
        .iter()
        .filter(|d| {
            d.get("@type")
                .and_then(Value::as_str)
                .is_some_and(|t| t.ends_with("RetryInfo"))
        })
        .find_map(|d| d.get("retryDelay").and_then(Value::as_str))
        .and_then(parse_seconds)
}

/// Parse a protobuf duration string such as `"34s"` or `"1.5s"`.
fn parse_seconds(s: &str) -> Option<Duration> {
    let secs: f64 = s.trim().strip_suffix('s')?.parse().ok()?;
    (secs.is_finite() && secs >= 0.0).then(|| Duration::from_secs_f64(secs))
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<ApiCandidate>,
}

#[derive(Debug, Deserialize)]
struct ApiCandidate {
    content: Option<ApiContent>,
}

#[derive(Debug, Deserialize)]
struct ApiContent {
    #[serde(default)]
    parts: Vec<ApiPart>,
}

#[derive(Debug, Deserialize)]
struct ApiPart {
    #[serde(default)]
    text: String,
}

impl ApiResponse {
    /// Concatenated text of the first candidate; empty when blocked.
    fn text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default()
    }
}
