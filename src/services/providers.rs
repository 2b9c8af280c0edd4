// Classification Service Provider
// OpenAI-compatible chat completions transport

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

use super::config_store::{ConfigStore, ProviderConfig};

pub const OPENAI_DEFAULT_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4.1-nano";
pub const PROVIDER_NAME: &str = "openai";

const API_KEY_ENV_VARS: [&str; 2] = ["OPENAI_API_KEY", "REVCHECK_OPENAI_API_KEY"];
const API_URL_ENV_VAR: &str = "OPENAI_API_URL";

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Missing content in response")]
    MissingContent,
    #[error("JSON parse error: {0}")]
    JsonError(String),
    #[error("API key not configured")]
    MissingApiKey,
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

impl ProviderError {
    /// Authentication and quota failures, useful for log triage.
    pub fn is_auth_or_quota(&self) -> bool {
        matches!(
            self,
            Self::ApiError { status, .. } if *status == 401 || *status == 403 || *status == 429
        )
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Option<Vec<ChatChoice>>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessageResponse>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChatResult {
    pub content: String,
    pub latency_ms: i64,
}

pub struct ProviderClient {
    client: Client,
    url: String,
    api_key: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl ProviderClient {
    pub fn new(config: &ProviderConfig, api_key: impl Into<String>) -> Result<Self, ProviderError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        // Configured URL first, then environment, then the public endpoint.
        let url = config
            .base_url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .or_else(|| env::var(API_URL_ENV_VAR).ok().filter(|u| !u.trim().is_empty()))
            .unwrap_or_else(|| OPENAI_DEFAULT_URL.to_string());

        Ok(Self {
            client,
            url,
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One system + user exchange; no retries.
    pub async fn chat(&self, system: &str, user: &str) -> Result<ChatResult, ProviderError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let start = Instant::now();

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let latency_ms = start.elapsed().as_millis() as i64;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let data: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::JsonError(e.to_string()))?;

        let content = extract_content(data).ok_or(ProviderError::MissingContent)?;
        debug!(latency_ms, chars = content.len(), "provider.chat.ok");

        Ok(ChatResult {
            content,
            latency_ms,
        })
    }
}

fn extract_content(data: ChatResponse) -> Option<String> {
    data.choices
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .filter(|c| !c.trim().is_empty())
}

/// Resolve the service credential: explicit value, then environment, then config file.
pub fn get_api_key(explicit: Option<&str>, store: Option<&ConfigStore>) -> Option<String> {
    if let Some(key) = explicit.map(str::trim).filter(|k| !k.is_empty()) {
        return Some(key.to_string());
    }

    for var in API_KEY_ENV_VARS {
        if let Ok(val) = env::var(var) {
            let v = val.trim();
            if !v.is_empty() {
                return Some(v.to_string());
            }
        }
    }

    let store = store?;
    store.get_api_key(PROVIDER_NAME).ok().flatten()
}
