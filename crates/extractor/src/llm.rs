use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use storeline_core::config::LlmConfig;

#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("completion request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("completion request timed out after {secs}s")]
    Timeout { secs: u64 },
    #[error("completion service answered with status {status}")]
    Rejected { status: u16 },
    #[error("unexpected completion response shape: {0}")]
    UnexpectedResponse(String),
}

/// Seam to the remote text-completion service.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ExtractorError>;
}

/// OpenAI-compatible chat-completions client. Every call is bounded by the
/// configured timeout so one slow upstream request cannot stall a turn
/// beyond it.
pub struct HttpLlmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

impl HttpLlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self, ExtractorError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String, ExtractorError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature: 0.2,
        };

        let mut request = self.http.post(format!("{}/chat/completions", self.base_url)).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| ExtractorError::Timeout { secs: self.timeout.as_secs() })??;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractorError::Rejected { status: status.as_u16() });
        }

        let parsed = response.json::<ChatResponse>().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ExtractorError::UnexpectedResponse("no choices in reply".to_string()))
    }
}
