//! HTTP model gateway for hosted chat completion APIs.
//!
//! Supports OpenAI and Anthropic, selected via [`ForgeConfig`] and the
//! provider API key environment variables.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{ForgeConfig, LlmProvider};
use crate::error::{GatewayError, GatewayResult};
use crate::gateway::ModelGateway;

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";

const SYSTEM_PROMPT: &str = "You are the generation engine of an application builder. \
Follow the output format in each request exactly and reply with JSON only.";

/// First backoff delay when retry is enabled; doubles per attempt
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Model gateway that calls a hosted LLM API
pub struct LlmAdapter {
    provider: LlmProvider,
    api_key: String,
    model: String,
    endpoint: String,
    max_tokens: u32,
    max_attempts: u32,
    retry_delay: Duration,
    timeout: Duration,
    client: reqwest::Client,
}

impl fmt::Debug for LlmAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmAdapter")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("max_tokens", &self.max_tokens)
            .field("max_attempts", &self.max_attempts)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Response from LLM including usage info
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub model: String,
}

impl LlmAdapter {
    /// Create a new LLM adapter with explicit configuration
    pub fn new(provider: LlmProvider, api_key: String, model: Option<String>) -> Self {
        let defaults = ForgeConfig::default();
        Self {
            provider,
            api_key,
            model: model.unwrap_or_else(|| provider.default_model().to_string()),
            endpoint: match provider {
                LlmProvider::OpenAI => OPENAI_URL.to_string(),
                LlmProvider::Anthropic => ANTHROPIC_URL.to_string(),
            },
            max_tokens: defaults.max_tokens,
            max_attempts: defaults.max_attempts,
            retry_delay: DEFAULT_RETRY_DELAY,
            timeout: defaults.timeout(),
            client: reqwest::Client::new(),
        }
    }

    /// Create an adapter from settings and the process environment
    pub fn from_config(config: &ForgeConfig) -> GatewayResult<Self> {
        Self::from_config_with(config, |key| std::env::var(key).ok())
    }

    /// Create an adapter from settings, reading API keys through `lookup`.
    ///
    /// With no configured provider, OpenAI is tried before Anthropic.
    pub fn from_config_with(
        config: &ForgeConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> GatewayResult<Self> {
        let candidates = match config.provider {
            Some(provider) => vec![provider],
            None => vec![LlmProvider::OpenAI, LlmProvider::Anthropic],
        };

        for provider in &candidates {
            if let Some(api_key) = lookup(provider.api_key_var()).filter(|k| !k.is_empty()) {
                return Ok(Self::new(*provider, api_key, config.model.clone())
                    .with_timeout(config.timeout())
                    .with_max_attempts(config.max_attempts)
                    .with_max_tokens(config.max_tokens));
            }
        }

        let vars: Vec<&str> = candidates.iter().map(|p| p.api_key_var()).collect();
        Err(GatewayError::NotConfigured(format!("set {}", vars.join(" or "))))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Total attempts per call; values above 1 enable retry of transient failures
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Send requests to a different URL speaking the provider's API
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Delay before the first retry
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Get the current provider
    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    /// Get the current model
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Send a single prompt and return the completion
    pub async fn complete(&self, prompt: &str) -> GatewayResult<LlmResponse> {
        let response = match self.provider {
            LlmProvider::OpenAI => self.complete_openai(prompt).await?,
            LlmProvider::Anthropic => self.complete_anthropic(prompt).await?,
        };

        if response.content.trim().is_empty() {
            return Err(GatewayError::EmptyResponse(self.provider.display_name().to_string()));
        }
        Ok(response)
    }

    async fn complete_openai(&self, prompt: &str) -> GatewayResult<LlmResponse> {
        let request = OpenAIRequest {
            model: self.model.clone(),
            messages: vec![
                OpenAIMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                OpenAIMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            max_completion_tokens: Some(self.max_tokens),
        };

        let headers = [("Authorization", format!("Bearer {}", self.api_key))];
        let result: OpenAIResponse = self.post_json(&self.endpoint, &headers, &request).await?;

        let content = result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GatewayError::EmptyResponse("OpenAI".to_string()))?;

        let (input_tokens, output_tokens) = result
            .usage
            .map(|u| (u.prompt_tokens, u.completion_tokens))
            .unwrap_or((0, 0));

        Ok(LlmResponse {
            content,
            input_tokens,
            output_tokens,
            model: self.model.clone(),
        })
    }

    async fn complete_anthropic(&self, prompt: &str) -> GatewayResult<LlmResponse> {
        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: Some(SYSTEM_PROMPT.to_string()),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let headers = [
            ("x-api-key", self.api_key.clone()),
            ("anthropic-version", "2023-06-01".to_string()),
        ];
        let result: AnthropicResponse = self.post_json(&self.endpoint, &headers, &request).await?;

        let content: String = result
            .content
            .iter()
            .filter_map(|c| c.text.as_deref())
            .collect::<Vec<_>>()
            .join("");

        let (input_tokens, output_tokens) = result
            .usage
            .map(|u| (u.input_tokens, u.output_tokens))
            .unwrap_or((0, 0));

        Ok(LlmResponse {
            content,
            input_tokens,
            output_tokens,
            model: self.model.clone(),
        })
    }

    /// POST a JSON body and decode the JSON reply.
    ///
    /// Transient failures (network, timeout, 429, 5xx) are retried with
    /// exponential backoff only when `max_attempts` is above 1.
    async fn post_json<B: Serialize, R: DeserializeOwned>(
        &self,
        url: &str,
        headers: &[(&str, String)],
        body: &B,
    ) -> GatewayResult<R> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.post_once(url, headers, body).await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let delay = self.backoff(attempt);
                    warn!(
                        "{} call failed (attempt {}/{}), retrying in {:?}: {}",
                        self.provider.display_name(),
                        attempt,
                        self.max_attempts,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn post_once<B: Serialize, R: DeserializeOwned>(
        &self,
        url: &str,
        headers: &[(&str, String)],
        body: &B,
    ) -> GatewayResult<R> {
        let provider = self.provider.display_name();

        let mut request = self
            .client
            .post(url)
            .timeout(self.timeout)
            .header("Content-Type", "application/json")
            .json(body);
        for (name, value) in headers {
            request = request.header(*name, value);
        }

        let response = request.send().await.map_err(|e| self.network_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                provider: provider.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        response.json().await.map_err(|e| GatewayError::MalformedResponse {
            provider: provider.to_string(),
            message: e.to_string(),
        })
    }

    /// Delay after failed attempt `attempt`: 1s, 2s, 4s, ... with the default base
    fn backoff(&self, attempt: u32) -> Duration {
        self.retry_delay * (1u32 << (attempt.saturating_sub(1)).min(5))
    }

    fn network_error(&self, err: reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::Timeout(self.timeout.as_secs())
        } else {
            GatewayError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl ModelGateway for LlmAdapter {
    async fn invoke(&self, prompt: &str) -> GatewayResult<String> {
        let response = self.complete(prompt).await?;
        debug!(
            model = %response.model,
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "LLM call completed"
        );
        Ok(response.content)
    }
}

// OpenAI API types
#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

// Anthropic API types
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(default)]
    text: Option<String>,
}
