//! AI text parsing helper.
//!
//! # Purpose
//! Proxies free text to a SiliconFlow-compatible chat-completions endpoint
//! with a prompt template, and lists the models the account can use.
//!
//! # Notes
//! - Results are cached per (model, content, final prompt) for an hour.
//!   Expired entries are dropped whenever a new result is stored.
//! - Transport failures, 429 and 5xx responses are retried with doubling
//!   delays; other statuses fail at once.
use crate::model::SiliconFlowConfig;
use dashmap::DashMap;
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

pub const DEFAULT_AI_BASE_URL: &str = "https://api.siliconflow.cn";
const SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";
const CONTENT_PLACEHOLDER: &str = "{content}";
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI helper api key is not configured")]
    NotConfigured,
    #[error("ai request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("ai service returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("ai service returned no content")]
    EmptyResponse,
}

impl AiError {
    fn is_retryable(&self) -> bool {
        match self {
            AiError::Http(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            AiError::Status { status, .. } => *status == 429 || *status >= 500,
            AiError::NotConfigured | AiError::EmptyResponse => false,
        }
    }
}

#[derive(Debug, Clone)]
struct CachedResult {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

#[derive(Debug, Clone)]
pub struct AiHelper {
    http: reqwest::Client,
    base_url: String,
    cache: Arc<DashMap<String, CachedResult>>,
    cache_ttl: Duration,
    max_attempts: u32,
    retry_delay: Duration,
}

impl AiHelper {
    pub fn new(base_url: Option<String>, timeout: Duration) -> Result<Self, AiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.unwrap_or_else(|| DEFAULT_AI_BASE_URL.to_string());
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache: Arc::new(DashMap::new()),
            cache_ttl: DEFAULT_CACHE_TTL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        })
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Run `content` through the prompt and return the model's answer.
    ///
    /// An empty `prompt` falls back to the configured default prompt, and an
    /// empty `model` to the configured model.
    pub async fn parse(
        &self,
        settings: &SiliconFlowConfig,
        content: &str,
        prompt: Option<&str>,
        model: Option<&str>,
    ) -> Result<String, AiError> {
        if settings.api_key.is_empty() {
            return Err(AiError::NotConfigured);
        }
        let model = model
            .filter(|model| !model.is_empty())
            .unwrap_or_else(|| settings.model_or_default());
        let template = prompt
            .filter(|prompt| !prompt.is_empty())
            .unwrap_or(&settings.default_prompt);
        let prompt = build_prompt(template, content);

        let key = cache_key(model, content, &prompt);
        if let Some(hit) = self.cache.get(&key)
            && hit.expires_at > Instant::now()
        {
            tracing::debug!(model, "ai parse served from cache");
            return Ok(hit.value.clone());
        }

        let body = json!({
            "model": model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": prompt},
            ],
            "stream": false,
        });
        let started = Instant::now();
        let result = self.complete_with_retry(&settings.api_key, &body).await;
        metrics::histogram!("tablewatch_ai_request_seconds").record(started.elapsed().as_secs_f64());
        let answer = result?;

        let now = Instant::now();
        self.cache.retain(|_, cached| cached.expires_at > now);
        self.cache.insert(
            key,
            CachedResult {
                value: answer.clone(),
                expires_at: now + self.cache_ttl,
            },
        );
        Ok(answer)
    }

    pub async fn list_models(&self, settings: &SiliconFlowConfig) -> Result<Vec<String>, AiError> {
        if settings.api_key.is_empty() {
            return Err(AiError::NotConfigured);
        }
        let response = self
            .http
            .get(format!("{}/v1/models", self.base_url))
            .bearer_auth(&settings.api_key)
            .send()
            .await?;
        let models: ModelList = ensure_success(response).await?.json().await?;
        Ok(models.data.into_iter().map(|model| model.id).collect())
    }

    async fn complete_with_retry(
        &self,
        api_key: &str,
        body: &serde_json::Value,
    ) -> Result<String, AiError> {
        let mut delay = self.retry_delay;
        let mut attempt = 1;
        loop {
            match self.complete(api_key, body).await {
                Ok(answer) => return Ok(answer),
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    tracing::warn!(attempt, error = %err, ?delay, "ai request failed; retrying");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn complete(&self, api_key: &str, body: &serde_json::Value) -> Result<String, AiError> {
        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await?;
        let completion: CompletionResponse = ensure_success(response).await?.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or(AiError::EmptyResponse)
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, AiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AiError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Substitute `{content}` in the template, or append the content after a blank line.
pub fn build_prompt(template: &str, content: &str) -> String {
    if template.contains(CONTENT_PLACEHOLDER) {
        template.replace(CONTENT_PLACEHOLDER, content)
    } else {
        format!("{template}\n\n{content}")
    }
}

fn cache_key(model: &str, content: &str, prompt: &str) -> String {
    let digest = Sha256::digest(format!("{model}:{content}:{prompt}").as_bytes());
    hex::encode(digest)
}
