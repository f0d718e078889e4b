use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Effective settings for one completion call, after merging CLI flags,
/// the config file, and the built-in defaults.
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub system_message: Option<String>,
}

/// Seam between the handlers and the real HTTP client so the session loop
/// and one-shot commands are testable with a stub backend.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<String>;
}

#[derive(Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Clone)]
pub struct OpenAIClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAIClient {
    /// The credential is injected here rather than read from the
    /// environment inside the client; resolution order lives in `Config`.
    pub fn new(api_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: "https://api.openai.com".to_string(),
            api_key: api_key.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_base_url(api_key: &str, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl CompletionBackend for OpenAIClient {
    /// One outbound call per invocation. No retries: a throttling or auth
    /// failure surfaces as a plain `Error::Completion`.
    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<String> {
        if prompt.trim().is_empty() {
            return Err(Error::Completion("prompt must not be empty".into()));
        }

        let mut messages = Vec::new();
        if let Some(system) = &options.system_message {
            messages.push(OpenAIMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(OpenAIMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        });

        let request = OpenAIRequest {
            model: options.model.clone(),
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        };

        tracing::debug!(model = %options.model, "sending completion request");

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Completion(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Completion(format!(
                "OpenAI API error {status}: {text}"
            )));
        }

        let parsed: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| Error::Completion(e.to_string()))?;
        Ok(parsed
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> CompletionOptions {
        CompletionOptions {
            model: "gpt-3.5-turbo".into(),
            max_tokens: 16,
            temperature: 0.0,
            system_message: None,
        }
    }

    #[tokio::test]
    async fn empty_prompt_is_rejected_before_any_request() {
        // Unroutable base URL: reaching the network would fail differently.
        let client = OpenAIClient::with_base_url("sk-test", "http://127.0.0.1:1");
        let err = client.complete("   ", &options()).await.unwrap_err();
        assert!(matches!(err, Error::Completion(_)));
        assert!(err.to_string().contains("empty"));
    }

    #[tokio::test]
    async fn transport_failure_becomes_a_completion_error() {
        let client = OpenAIClient::with_base_url("sk-test", "http://127.0.0.1:1");
        let err = client.complete("hello", &options()).await.unwrap_err();
        assert!(matches!(err, Error::Completion(_)));
    }
}
