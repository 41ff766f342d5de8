use crate::config::GenerationSettings;
use crate::error::GenerationError;
use crate::traits::AnswerGenerator;
use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const MAX_ERROR_DETAIL_CHARS: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Exponential backoff with equal jitter: half the step is fixed, half is random.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        let step = self.initial_backoff.saturating_mul(factor).min(self.max_backoff);
        let half = step / 2;
        let jitter_ms = half.as_millis() as u64;
        if jitter_ms == 0 {
            return step;
        }
        half + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint (Groq by default).
pub struct ChatCompletionsGenerator {
    client: Client,
    endpoint: Url,
    model: String,
    api_key: Option<String>,
    api_key_env: String,
    retry: RetryPolicy,
}

impl ChatCompletionsGenerator {
    pub fn new(settings: &GenerationSettings) -> Result<Self, GenerationError> {
        let endpoint = Url::parse(&format!(
            "{}/chat/completions",
            settings.api_base_url.trim_end_matches('/')
        ))?;
        let client = Client::builder().timeout(settings.request_timeout).build()?;

        Ok(Self {
            client,
            endpoint,
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
            api_key_env: settings.api_key_env.clone(),
            retry: RetryPolicy {
                max_retries: settings.max_retries,
                initial_backoff: settings.initial_backoff,
                max_backoff: Duration::from_secs(10),
            },
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn send_once(&self, api_key: &str, prompt: &str) -> Result<String, GenerationError> {
        let payload = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::BackendResponse {
                status: status.as_u16(),
                details: body.chars().take(MAX_ERROR_DETAIL_CHARS).collect(),
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(GenerationError::EmptyResponse)
    }
}

#[async_trait]
impl AnswerGenerator for ChatCompletionsGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| GenerationError::MissingCredential(self.api_key_env.clone()))?;

        let mut retry = 0;
        loop {
            debug!(model = %self.model, attempt = retry + 1, "sending generation request");
            match self.send_once(api_key, prompt).await {
                Ok(text) => return Ok(text),
                Err(error) if error.is_retryable() && retry < self.retry.max_retries => {
                    retry += 1;
                    let delay = self.retry.delay_for(retry);
                    warn!(
                        %error,
                        retry,
                        max_retries = self.retry.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "generation request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
