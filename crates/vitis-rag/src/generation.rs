//! Text generation against the hosted Gemini API.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use vitis_core::config::LlmSettings;
use vitis_core::error::Error as CoreError;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("API key variable {0} is not set")]
    MissingApiKey(String),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("model endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model returned no text")]
    EmptyResponse,
}

impl GenerationError {
    /// Connection failures, timeouts, rate limits and server errors are worth a retry.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::MissingApiKey(_) | Self::EmptyResponse => false,
        }
    }
}

impl From<GenerationError> for CoreError {
    fn from(e: GenerationError) -> Self { CoreError::GenerationFailure(e.to_string()) }
}

/// Turns a fully rendered prompt into answer text.
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
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

pub(crate) fn build_request(prompt: &str, temperature: Option<f32>) -> GenerateRequest<'_> {
    GenerateRequest {
        contents: vec![Content { role: "user", parts: vec![TextPart { text: prompt }] }],
        generation_config: temperature.map(|temperature| GenerationConfig { temperature }),
    }
}

/// Concatenated text parts of the first candidate.
pub(crate) fn extract_text(resp: GenerateResponse) -> Result<String, GenerationError> {
    let text: String = resp
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() { Err(GenerationError::EmptyResponse) } else { Ok(text) }
}

pub struct GeminiClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    temperature: Option<f32>,
    max_attempts: u32,
    backoff: Duration,
}

impl GeminiClient {
    pub fn new(settings: &LlmSettings, api_key: impl Into<String>) -> Result<Self, GenerationError> {
        let http = reqwest::blocking::Client::builder().timeout(Duration::from_secs(settings.timeout_secs)).build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/models/{}:generateContent", settings.base_url.trim_end_matches('/'), settings.model),
            api_key: api_key.into(),
            temperature: settings.temperature,
            max_attempts: settings.max_attempts.max(1),
            backoff: Duration::from_millis(settings.backoff_ms),
        })
    }

    /// Reads the key from the environment variable named in the settings.
    pub fn from_env(settings: &LlmSettings) -> Result<Self, GenerationError> {
        let key = std::env::var(&settings.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| GenerationError::MissingApiKey(settings.api_key_env.clone()))?;
        Self::new(settings, key)
    }

    fn attempt(&self, prompt: &str) -> Result<String, GenerationError> {
        let resp = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&build_request(prompt, self.temperature))
            .send()?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(GenerationError::Status { status: status.as_u16(), body });
        }
        extract_text(resp.json::<GenerateResponse>()?)
    }
}

impl Generator for GeminiClient {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let mut attempt = 1;
        loop {
            match self.attempt(prompt) {
                Ok(text) => {
                    debug!(attempt, chars = text.len(), "generation succeeded");
                    return Ok(text);
                }
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let delay = self.backoff * 2u32.saturating_pow(attempt - 1);
                    warn!(attempt, error = %e, delay_ms = delay.as_millis(), "generation failed; retrying");
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
